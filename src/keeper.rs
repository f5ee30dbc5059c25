// VRF Raffle - Upkeep Keeper
use crate::instruction::perform_upkeep;
use crate::state::Raffle;
use solana_program::{clock::UnixTimestamp, instruction::Instruction, pubkey::Pubkey};

/// Off-chain upkeep trigger: polls a raffle and performs upkeep when due
pub struct UpkeepKeeper {
    program_id: Pubkey,
    keeper: Pubkey,
}

impl UpkeepKeeper {
    pub fn new(program_id: Pubkey, keeper: Pubkey) -> Self {
        Self { program_id, keeper }
    }

    /// Instruction to submit if upkeep is needed at `now`
    pub fn poll(
        &self,
        raffle_key: &Pubkey,
        raffle: &Raffle,
        prize_pool: u64,
        now: UnixTimestamp,
    ) -> Option<Instruction> {
        let check = raffle.check_upkeep(now, prize_pool);
        if !check.upkeep_needed {
            return None;
        }
        Some(perform_upkeep(
            &self.program_id,
            &self.keeper,
            raffle_key,
            &raffle.vrf_coordinator,
            check.perform_data,
        ))
    }
}
