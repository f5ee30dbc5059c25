// VRF Raffle - Instruction Processor
use crate::{
    coordinator::Fulfillment,
    engine::{PrizeVault, RaffleEvent},
    error::RaffleError,
    instruction::RaffleInstruction,
    state::{CoordinatorState, Raffle, RaffleParams},
    utils,
};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, set_return_data},
    program_error::ProgramError,
    program_pack::IsInitialized,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

/// Program state handler.
pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeCoordinator {
                base_fee,
                gas_price_link,
            } => {
                msg!("Instruction: Initialize Coordinator");
                Self::process_initialize_coordinator(program_id, accounts, base_fee, gas_price_link)
            }
            RaffleInstruction::CreateSubscription => {
                msg!("Instruction: Create Subscription");
                Self::process_create_subscription(program_id, accounts)
            }
            RaffleInstruction::FundSubscription {
                subscription_id,
                amount,
            } => {
                msg!("Instruction: Fund Subscription");
                Self::process_fund_subscription(program_id, accounts, subscription_id, amount)
            }
            RaffleInstruction::AddConsumer { subscription_id } => {
                msg!("Instruction: Add Consumer");
                Self::process_update_consumer(program_id, accounts, subscription_id, true)
            }
            RaffleInstruction::RemoveConsumer { subscription_id } => {
                msg!("Instruction: Remove Consumer");
                Self::process_update_consumer(program_id, accounts, subscription_id, false)
            }
            RaffleInstruction::InitializeRaffle { params } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(program_id, accounts, params)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(program_id, accounts, amount)
            }
            RaffleInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            RaffleInstruction::PerformUpkeep { perform_data } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts, &perform_data)
            }
            RaffleInstruction::FulfillRandomWords { request_id } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, None)
            }
            RaffleInstruction::FulfillRandomWordsWithOverride {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words With Override");
                Self::process_fulfill_random_words(program_id, accounts, request_id, Some(random_words))
            }
        }
    }

    fn process_initialize_coordinator(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        base_fee: u64,
        gas_price_link: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let deployer_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        require_signer(deployer_info)?;
        let existing: CoordinatorState = load(coordinator_info, program_id)?;
        if existing.is_initialized() {
            return Err(reject(RaffleError::AlreadyInitialized));
        }

        let coordinator = CoordinatorState::new(base_fee, gas_price_link);
        store(&coordinator, coordinator_info)?;

        msg!(
            "Coordinator initialized: base_fee={} gas_price_link={}",
            base_fee,
            gas_price_link
        );
        Ok(())
    }

    fn process_create_subscription(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        require_signer(owner_info)?;
        let mut coordinator: CoordinatorState = load_initialized(coordinator_info, program_id)?;
        let subscription_id = coordinator
            .create_subscription(*owner_info.key)
            .map_err(reject)?;
        store(&coordinator, coordinator_info)?;

        set_return_data(&subscription_id.to_le_bytes());
        Ok(())
    }

    fn process_fund_subscription(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        subscription_id: u64,
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let funder_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        require_signer(funder_info)?;
        let mut coordinator: CoordinatorState = load_initialized(coordinator_info, program_id)?;
        coordinator
            .fund_subscription(subscription_id, amount)
            .map_err(reject)?;
        store(&coordinator, coordinator_info)
    }

    fn process_update_consumer(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        subscription_id: u64,
        add: bool,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let consumer_info = next_account_info(account_info_iter)?;

        require_signer(owner_info)?;
        let mut coordinator: CoordinatorState = load_initialized(coordinator_info, program_id)?;
        let updated = if add {
            coordinator.add_consumer(subscription_id, owner_info.key, *consumer_info.key)
        } else {
            coordinator.remove_consumer(subscription_id, owner_info.key, consumer_info.key)
        };
        updated.map_err(reject)?;
        store(&coordinator, coordinator_info)
    }

    fn process_initialize_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        params: RaffleParams,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let deployer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        require_signer(deployer_info)?;
        let existing: Raffle = load(raffle_info, program_id)?;
        if existing.is_initialized() {
            return Err(reject(RaffleError::AlreadyInitialized));
        }

        let coordinator: CoordinatorState = load_initialized(coordinator_info, program_id)?;
        if !coordinator.subscriptions.contains_key(&params.subscription_id) {
            return Err(reject(RaffleError::InvalidSubscription));
        }

        let max_players = Raffle::capacity(raffle_info.data_len());
        if max_players == 0 {
            msg!(
                "Raffle account needs at least {} bytes",
                Raffle::space(1)
            );
            return Err(ProgramError::AccountDataTooSmall);
        }
        if params.entrance_fee == 0 || params.interval < 0 {
            msg!("Entrance fee must be positive and interval non-negative");
            return Err(ProgramError::InvalidArgument);
        }

        let now = Clock::get()?.unix_timestamp;
        let raffle = Raffle::new(params, *coordinator_info.key, now, max_players);
        store(&raffle, raffle_info)?;

        msg!(
            "Raffle initialized: entrance_fee={} interval={} coordinator={} max_players={}",
            params.entrance_fee,
            params.interval,
            coordinator_info.key,
            max_players
        );
        Ok(())
    }

    fn process_enter_raffle(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        require_signer(player_info)?;
        let mut raffle: Raffle = load_initialized(raffle_info, program_id)?;
        let event = raffle.enter(*player_info.key, amount).map_err(reject)?;

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, amount),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;
        store(&raffle, raffle_info)?;

        msg!("Entered with {} SOL", utils::lamports_to_sol(amount));
        emit(&event);
        Ok(())
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let raffle: Raffle = load_initialized(raffle_info, program_id)?;
        let now = Clock::get()?.unix_timestamp;
        let check = raffle.check_upkeep(now, prize_pool(raffle_info)?);

        msg!("Upkeep needed: {}", check.upkeep_needed);
        set_return_data(&[check.upkeep_needed as u8]);
        Ok(())
    }

    fn process_perform_upkeep(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        perform_data: &[u8],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let keeper_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        require_signer(keeper_info)?;
        let mut raffle: Raffle = load_initialized(raffle_info, program_id)?;
        if raffle.vrf_coordinator != *coordinator_info.key {
            return Err(reject(RaffleError::CoordinatorMismatch));
        }
        let mut coordinator: CoordinatorState = load_initialized(coordinator_info, program_id)?;

        if !perform_data.is_empty() {
            msg!("Ignoring {} bytes of perform data", perform_data.len());
        }
        let now = Clock::get()?.unix_timestamp;
        let balance = prize_pool(raffle_info)?;
        let event = raffle
            .perform_upkeep(now, balance, &mut coordinator.consumer(*raffle_info.key))
            .map_err(reject)?;

        store(&coordinator, coordinator_info)?;
        store(&raffle, raffle_info)?;
        emit(&event);
        Ok(())
    }

    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        override_words: Option<Vec<u64>>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        require_signer(caller_info)?;
        let mut coordinator: CoordinatorState = load_initialized(coordinator_info, program_id)?;
        let mut raffle: Raffle = load_initialized(raffle_info, program_id)?;
        if raffle.vrf_coordinator != *coordinator_info.key {
            return Err(reject(RaffleError::CoordinatorMismatch));
        }

        let now = Clock::get()?.unix_timestamp;
        let mut vault = LamportVault {
            pool: raffle_info,
            winner: winner_info,
            reserve: Rent::get()?.minimum_balance(raffle_info.data_len()),
        };
        let mut picked = None;
        let Fulfillment {
            request_id,
            payment,
            ..
        } = coordinator
            .fulfill(request_id, raffle_info.key, override_words, |id, words| {
                picked = Some(raffle.fulfill_random_words(id, words, now, &mut vault)?);
                Ok(())
            })
            .map_err(reject)?;

        store(&coordinator, coordinator_info)?;
        store(&raffle, raffle_info)?;
        msg!("Request {} fulfilled, subscription charged {}", request_id, payment);
        if let Some(event) = picked {
            emit(&event);
        }
        Ok(())
    }
}

/// Prize pool held as the raffle account's lamports above its rent reserve
struct LamportVault<'a, 'b> {
    pool: &'a AccountInfo<'b>,
    winner: &'a AccountInfo<'b>,
    reserve: u64,
}

impl PrizeVault for LamportVault<'_, '_> {
    fn balance(&self) -> u64 {
        self.pool.lamports().saturating_sub(self.reserve)
    }

    fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        if self.winner.key != winner || !self.winner.is_writable {
            msg!("Winner account {} does not match {}", self.winner.key, winner);
            return Err(RaffleError::TransferFailed);
        }
        let mut pool = self
            .pool
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::TransferFailed)?;
        let mut to = self
            .winner
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::TransferFailed)?;

        let remaining = (**pool)
            .checked_sub(amount)
            .ok_or(RaffleError::TransferFailed)?;
        let credited = (**to)
            .checked_add(amount)
            .ok_or(RaffleError::TransferFailed)?;
        **pool = remaining;
        **to = credited;
        Ok(())
    }
}

fn require_signer(info: &AccountInfo) -> ProgramResult {
    if !info.is_signer {
        msg!("Account {} must sign the transaction", info.key);
        return Err(ProgramError::MissingRequiredSignature);
    }
    Ok(())
}

/// Log a raffle error and convert it for the runtime
fn reject(err: RaffleError) -> ProgramError {
    msg!("Error: {}", err);
    err.into()
}

fn emit(event: &RaffleEvent) {
    msg!("{}", event);
}

fn prize_pool(raffle_info: &AccountInfo) -> Result<u64, ProgramError> {
    let rent = Rent::get()?;
    Ok(utils::prize_pool(raffle_info.lamports(), &rent, raffle_info.data_len()))
}

fn load<T: BorshDeserialize>(info: &AccountInfo, program_id: &Pubkey) -> Result<T, ProgramError> {
    if info.owner != program_id {
        msg!("Account {} must be owned by this program", info.key);
        return Err(ProgramError::IncorrectProgramId);
    }
    let data = info.try_borrow_data()?;
    let state = T::deserialize(&mut &data[..])?;
    Ok(state)
}

fn load_initialized<T: BorshDeserialize + IsInitialized>(
    info: &AccountInfo,
    program_id: &Pubkey,
) -> Result<T, ProgramError> {
    let state: T = load(info, program_id)?;
    if !state.is_initialized() {
        return Err(reject(RaffleError::NotInitialized));
    }
    Ok(state)
}

fn store<T: BorshSerialize>(state: &T, info: &AccountInfo) -> ProgramResult {
    let mut data = info.try_borrow_mut_data()?;
    state.serialize(&mut &mut data[..])?;
    Ok(())
}
