// VRF Raffle - Deployment
// Development networks get a freshly deployed mock coordinator with a funded
// subscription. Other networks bind the raffle to a coordinator account this
// program already owns, using the subscription from the network table.
use crate::config::{is_development_chain, network_config, VRF_SUB_FUND_AMOUNT};
use crate::coordinator::{BASE_FEE, GAS_PRICE_LINK};
use crate::error::RaffleError;
use crate::instruction;
use crate::state::{CoordinatorState, Raffle, RaffleParams};
use solana_program::{instruction::Instruction, pubkey::Pubkey, rent::Rent, system_instruction};

/// A fresh coordinator numbers subscriptions from 1
pub const FIRST_SUBSCRIPTION_ID: u64 = 1;

/// Instructions deploying a raffle on `network`.
///
/// `raffle` is a new account and must sign alongside `deployer`. On
/// development networks `coordinator` is created here and must sign too;
/// elsewhere it is an initialized coordinator of this program, and the
/// subscription owner registers the raffle as consumer separately.
pub fn deploy_instructions(
    network: &str,
    program_id: &Pubkey,
    deployer: &Pubkey,
    raffle: &Pubkey,
    coordinator: &Pubkey,
    rent: &Rent,
    max_players: u32,
) -> Result<Vec<Instruction>, RaffleError> {
    let config = network_config(network).ok_or(RaffleError::UnknownNetwork)?;
    let development = is_development_chain(network);
    let mut instructions = Vec::new();

    let subscription_id = if development {
        instructions.push(system_instruction::create_account(
            deployer,
            coordinator,
            rent.minimum_balance(CoordinatorState::SPACE),
            CoordinatorState::SPACE as u64,
            program_id,
        ));
        instructions.push(instruction::initialize_coordinator(
            program_id,
            deployer,
            coordinator,
            BASE_FEE,
            GAS_PRICE_LINK,
        ));
        instructions.push(instruction::create_subscription(
            program_id,
            deployer,
            coordinator,
        ));
        instructions.push(instruction::fund_subscription(
            program_id,
            deployer,
            coordinator,
            FIRST_SUBSCRIPTION_ID,
            VRF_SUB_FUND_AMOUNT,
        ));
        FIRST_SUBSCRIPTION_ID
    } else {
        config.subscription_id.ok_or(RaffleError::InvalidSubscription)?
    };

    let space = Raffle::space(max_players);
    instructions.push(system_instruction::create_account(
        deployer,
        raffle,
        rent.minimum_balance(space),
        space as u64,
        program_id,
    ));
    instructions.push(instruction::initialize_raffle(
        program_id,
        deployer,
        raffle,
        coordinator,
        RaffleParams {
            entrance_fee: config.entrance_fee,
            interval: config.interval,
            gas_lane: config.gas_lane,
            subscription_id,
            callback_gas_limit: config.callback_gas_limit,
        },
    ));

    if development {
        instructions.push(instruction::add_consumer(
            program_id,
            deployer,
            coordinator,
            raffle,
            subscription_id,
        ));
    }

    Ok(instructions)
}
