// VRF Raffle - Instructions
use crate::error::RaffleError;
use crate::state::RaffleParams;
use arrayref::array_ref;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::mem::size_of;

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Initialize a mock randomness coordinator
    ///
    /// Accounts expected:
    /// 0. `[signer]` The deployer
    /// 1. `[writable]` The coordinator account, owned by this program and uninitialized
    InitializeCoordinator { base_fee: u64, gas_price_link: u64 },

    /// Create a subscription owned by the signer
    ///
    /// Accounts expected:
    /// 0. `[signer]` The subscription owner
    /// 1. `[writable]` The coordinator account
    CreateSubscription,

    /// Add LINK (in juels) to a subscription
    ///
    /// Accounts expected:
    /// 0. `[signer]` The funder
    /// 1. `[writable]` The coordinator account
    FundSubscription { subscription_id: u64, amount: u64 },

    /// Allow a raffle to request randomness against a subscription
    ///
    /// Accounts expected:
    /// 0. `[signer]` The subscription owner
    /// 1. `[writable]` The coordinator account
    /// 2. `[]` The consumer (raffle) account
    AddConsumer { subscription_id: u64 },

    /// Revoke a consumer
    ///
    /// Accounts expected:
    /// 0. `[signer]` The subscription owner
    /// 1. `[writable]` The coordinator account
    /// 2. `[]` The consumer (raffle) account
    RemoveConsumer { subscription_id: u64 },

    /// Initialize a raffle bound to a coordinator
    ///
    /// Accounts expected:
    /// 0. `[signer]` The deployer
    /// 1. `[writable]` The raffle account, owned by this program and uninitialized
    /// 2. `[]` The coordinator account
    InitializeRaffle { params: RaffleParams },

    /// Enter the raffle by paying at least the entrance fee
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle { amount: u64 },

    /// Evaluate the upkeep conditions; sets return data `[1]` or `[0]`
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep,

    /// Start a payout cycle by requesting randomness
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any keeper
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The coordinator account
    PerformUpkeep { perform_data: Vec<u8> },

    /// Deliver the coordinator's words for a pending request
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any caller
    /// 1. `[writable]` The coordinator account
    /// 2. `[writable]` The raffle account that issued the request
    /// 3. `[writable]` The winner picked by the delivered words
    FulfillRandomWords { request_id: u64 },

    /// Same as `FulfillRandomWords` with caller-chosen words
    ///
    /// Accounts expected: as `FulfillRandomWords`
    FulfillRandomWordsWithOverride {
        request_id: u64,
        random_words: Vec<u64>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (base_fee, rest) = Self::unpack_u64(rest)?;
                let (gas_price_link, _) = Self::unpack_u64(rest)?;
                Self::InitializeCoordinator {
                    base_fee,
                    gas_price_link,
                }
            }
            1 => Self::CreateSubscription,
            2 => {
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::FundSubscription {
                    subscription_id,
                    amount,
                }
            }
            3 => {
                let (subscription_id, _) = Self::unpack_u64(rest)?;
                Self::AddConsumer { subscription_id }
            }
            4 => {
                let (subscription_id, _) = Self::unpack_u64(rest)?;
                Self::RemoveConsumer { subscription_id }
            }
            5 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_i64(rest)?;
                let (gas_lane, rest) = Self::unpack_bytes32(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (callback_gas_limit, _) = Self::unpack_u32(rest)?;
                Self::InitializeRaffle {
                    params: RaffleParams {
                        entrance_fee,
                        interval,
                        gas_lane,
                        subscription_id,
                        callback_gas_limit,
                    },
                }
            }
            6 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            7 => Self::CheckUpkeep,
            8 => Self::PerformUpkeep {
                perform_data: rest.to_vec(),
            },
            9 => {
                let (request_id, _) = Self::unpack_u64(rest)?;
                Self::FulfillRandomWords { request_id }
            }
            10 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (count, mut rest) = Self::unpack_u32(rest)?;
                let mut random_words = Vec::with_capacity(count.min(64) as usize);
                for _ in 0..count {
                    let (word, next) = Self::unpack_u64(rest)?;
                    random_words.push(word);
                    rest = next;
                }
                Self::FulfillRandomWordsWithOverride {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(RaffleError::InvalidInstructionData.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::InitializeCoordinator {
                base_fee,
                gas_price_link,
            } => {
                buf.push(0);
                buf.extend_from_slice(&base_fee.to_le_bytes());
                buf.extend_from_slice(&gas_price_link.to_le_bytes());
            }
            Self::CreateSubscription => buf.push(1),
            Self::FundSubscription {
                subscription_id,
                amount,
            } => {
                buf.push(2);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::AddConsumer { subscription_id } => {
                buf.push(3);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
            }
            Self::RemoveConsumer { subscription_id } => {
                buf.push(4);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
            }
            Self::InitializeRaffle { params } => {
                buf.push(5);
                buf.extend_from_slice(&params.entrance_fee.to_le_bytes());
                buf.extend_from_slice(&params.interval.to_le_bytes());
                buf.extend_from_slice(&params.gas_lane);
                buf.extend_from_slice(&params.subscription_id.to_le_bytes());
                buf.extend_from_slice(&params.callback_gas_limit.to_le_bytes());
            }
            Self::EnterRaffle { amount } => {
                buf.push(6);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep => buf.push(7),
            Self::PerformUpkeep { perform_data } => {
                buf.push(8);
                buf.extend_from_slice(perform_data);
            }
            Self::FulfillRandomWords { request_id } => {
                buf.push(9);
                buf.extend_from_slice(&request_id.to_le_bytes());
            }
            Self::FulfillRandomWordsWithOverride {
                request_id,
                random_words,
            } => {
                buf.push(10);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(&(random_words.len() as u32).to_le_bytes());
                for word in random_words {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
            }
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        if input.len() < 8 {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (bytes, rest) = input.split_at(8);
        Ok((u64::from_le_bytes(*array_ref![bytes, 0, 8]), rest))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        let (value, rest) = Self::unpack_u64(input)?;
        Ok((value as i64, rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        if input.len() < 4 {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (bytes, rest) = input.split_at(4);
        Ok((u32::from_le_bytes(*array_ref![bytes, 0, 4]), rest))
    }

    fn unpack_bytes32(input: &[u8]) -> Result<([u8; 32], &[u8]), ProgramError> {
        if input.len() < 32 {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (bytes, rest) = input.split_at(32);
        Ok((*array_ref![bytes, 0, 32], rest))
    }
}

/// Create initialize_coordinator instruction
pub fn initialize_coordinator(
    program_id: &Pubkey,
    deployer: &Pubkey,
    coordinator: &Pubkey,
    base_fee: u64,
    gas_price_link: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*deployer, true),
            AccountMeta::new(*coordinator, false),
        ],
        data: RaffleInstruction::InitializeCoordinator {
            base_fee,
            gas_price_link,
        }
        .pack(),
    }
}

/// Create create_subscription instruction
pub fn create_subscription(program_id: &Pubkey, owner: &Pubkey, coordinator: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(*coordinator, false),
        ],
        data: RaffleInstruction::CreateSubscription.pack(),
    }
}

/// Create fund_subscription instruction
pub fn fund_subscription(
    program_id: &Pubkey,
    funder: &Pubkey,
    coordinator: &Pubkey,
    subscription_id: u64,
    amount: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*funder, true),
            AccountMeta::new(*coordinator, false),
        ],
        data: RaffleInstruction::FundSubscription {
            subscription_id,
            amount,
        }
        .pack(),
    }
}

/// Create add_consumer instruction
pub fn add_consumer(
    program_id: &Pubkey,
    owner: &Pubkey,
    coordinator: &Pubkey,
    consumer: &Pubkey,
    subscription_id: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(*coordinator, false),
            AccountMeta::new_readonly(*consumer, false),
        ],
        data: RaffleInstruction::AddConsumer { subscription_id }.pack(),
    }
}

/// Create remove_consumer instruction
pub fn remove_consumer(
    program_id: &Pubkey,
    owner: &Pubkey,
    coordinator: &Pubkey,
    consumer: &Pubkey,
    subscription_id: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(*coordinator, false),
            AccountMeta::new_readonly(*consumer, false),
        ],
        data: RaffleInstruction::RemoveConsumer { subscription_id }.pack(),
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    deployer: &Pubkey,
    raffle: &Pubkey,
    coordinator: &Pubkey,
    params: RaffleParams,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*deployer, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(*coordinator, false),
        ],
        data: RaffleInstruction::InitializeRaffle { params }.pack(),
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(program_id: &Pubkey, player: &Pubkey, raffle: &Pubkey, amount: u64) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*player, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle { amount }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle, false)],
        data: RaffleInstruction::CheckUpkeep.pack(),
    }
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    keeper: &Pubkey,
    raffle: &Pubkey,
    coordinator: &Pubkey,
    perform_data: Vec<u8>,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*keeper, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new(*coordinator, false),
        ],
        data: RaffleInstruction::PerformUpkeep { perform_data }.pack(),
    }
}

fn fulfillment_accounts(
    caller: &Pubkey,
    coordinator: &Pubkey,
    raffle: &Pubkey,
    winner: &Pubkey,
) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new(*coordinator, false),
        AccountMeta::new(*raffle, false),
        AccountMeta::new(*winner, false),
    ]
}

/// Create fulfill_random_words instruction
pub fn fulfill_random_words(
    program_id: &Pubkey,
    caller: &Pubkey,
    coordinator: &Pubkey,
    raffle: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: fulfillment_accounts(caller, coordinator, raffle, winner),
        data: RaffleInstruction::FulfillRandomWords { request_id }.pack(),
    }
}

/// Create fulfill_random_words_with_override instruction
pub fn fulfill_random_words_with_override(
    program_id: &Pubkey,
    caller: &Pubkey,
    coordinator: &Pubkey,
    raffle: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<u64>,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: fulfillment_accounts(caller, coordinator, raffle, winner),
        data: RaffleInstruction::FulfillRandomWordsWithOverride {
            request_id,
            random_words,
        }
        .pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_raffle_layout() {
        let params = RaffleParams {
            entrance_fee: 10_000_000,
            interval: 30,
            gas_lane: [9u8; 32],
            subscription_id: 1,
            callback_gas_limit: 500_000,
        };
        let packed = RaffleInstruction::InitializeRaffle { params }.pack();

        assert_eq!(packed.len(), 1 + 8 + 8 + 32 + 8 + 4);
        assert_eq!(packed[0], 5);
        assert_eq!(
            RaffleInstruction::unpack(&packed),
            Ok(RaffleInstruction::InitializeRaffle { params })
        );
    }

    #[test]
    fn override_words_carry_their_count() {
        let instruction = RaffleInstruction::FulfillRandomWordsWithOverride {
            request_id: 3,
            random_words: vec![7, u64::MAX],
        };
        let packed = instruction.pack();
        assert_eq!(&packed[9..13], &2u32.to_le_bytes());
        assert_eq!(RaffleInstruction::unpack(&packed), Ok(instruction));
    }

    #[test]
    fn perform_data_is_opaque() {
        let packed = RaffleInstruction::PerformUpkeep {
            perform_data: vec![],
        }
        .pack();
        assert_eq!(packed, vec![8]);
        assert_eq!(
            RaffleInstruction::unpack(&[8, 1, 2]),
            Ok(RaffleInstruction::PerformUpkeep {
                perform_data: vec![1, 2]
            })
        );
    }

    #[test]
    fn rejects_malformed_data() {
        let invalid = Err(ProgramError::Custom(RaffleError::InvalidInstructionData.code()));
        assert_eq!(RaffleInstruction::unpack(&[]), invalid);
        assert_eq!(RaffleInstruction::unpack(&[42]), invalid);
        assert_eq!(RaffleInstruction::unpack(&[6, 1, 2, 3]), invalid);
        // claims two words but carries one
        let mut truncated = vec![10];
        truncated.extend_from_slice(&1u64.to_le_bytes());
        truncated.extend_from_slice(&2u32.to_le_bytes());
        truncated.extend_from_slice(&5u64.to_le_bytes());
        assert_eq!(RaffleInstruction::unpack(&truncated), invalid);
    }

    #[test]
    fn enter_raffle_accounts() {
        let program_id = Pubkey::new_unique();
        let player = Pubkey::new_unique();
        let raffle = Pubkey::new_unique();
        let instruction = enter_raffle(&program_id, &player, &raffle, 10);

        assert_eq!(instruction.accounts[0], AccountMeta::new(player, true));
        assert_eq!(instruction.accounts[1], AccountMeta::new(raffle, false));
        assert_eq!(instruction.accounts[2].pubkey, system_program::id());
        assert_eq!(
            RaffleInstruction::unpack(&instruction.data),
            Ok(RaffleInstruction::EnterRaffle { amount: 10 })
        );
    }
}
