// VRF Raffle - Program Library
// A timed lottery paid out with randomness from an asynchronous coordinator

// Core modules
pub mod engine;
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

// Randomness coordinator and deployment support
pub mod config;
pub mod coordinator;
pub mod deploy;
pub mod keeper;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
