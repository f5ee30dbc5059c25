// VRF Raffle - Errors
use solana_program::program_error::ProgramError;
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    #[error("Account is already initialized")]
    AlreadyInitialized,

    #[error("Account is not initialized")]
    NotInitialized,

    /// Entries are closed while a winner is being calculated
    #[error("Raffle is not open")]
    NotOpen,

    #[error("Not enough lamports entered: sent {sent}, entrance fee is {required}")]
    InsufficientPayment { sent: u64, required: u64 },

    /// Carries the values the upkeep check was evaluated against
    #[error("Upkeep not needed: balance={balance}, players={num_players}, state={state}")]
    UpkeepNotNeeded {
        balance: u64,
        num_players: u64,
        state: u8,
    },

    #[error("Nonexistent request")]
    NonexistentRequest,

    #[error("Prize transfer failed")]
    TransferFailed,

    #[error("Player index out of range")]
    IndexOutOfRange,

    #[error("Raffle account has no room for more players")]
    RaffleFull,

    #[error("No random words delivered")]
    EmptyRandomWords,

    #[error("Raffle is bound to a different coordinator")]
    CoordinatorMismatch,

    #[error("Invalid subscription")]
    InvalidSubscription,

    #[error("Consumer is not registered on the subscription")]
    InvalidConsumer,

    #[error("Only the subscription owner can perform this action")]
    MustBeSubOwner,

    #[error("Too many consumers")]
    TooManyConsumers,

    #[error("Insufficient subscription balance")]
    InsufficientBalance,

    #[error("Too many random words requested")]
    NumWordsTooBig,

    /// Override words must match the requested word count
    #[error("Invalid random words")]
    InvalidRandomWords,

    #[error("Unknown network")]
    UnknownNetwork,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl RaffleError {
    /// Stable numeric code reported through `ProgramError::Custom`
    pub fn code(&self) -> u32 {
        match self {
            RaffleError::InvalidInstructionData => 0,
            RaffleError::AlreadyInitialized => 1,
            RaffleError::NotInitialized => 2,
            RaffleError::NotOpen => 3,
            RaffleError::InsufficientPayment { .. } => 4,
            RaffleError::UpkeepNotNeeded { .. } => 5,
            RaffleError::NonexistentRequest => 6,
            RaffleError::TransferFailed => 7,
            RaffleError::IndexOutOfRange => 8,
            RaffleError::RaffleFull => 9,
            RaffleError::EmptyRandomWords => 10,
            RaffleError::CoordinatorMismatch => 11,
            RaffleError::InvalidSubscription => 12,
            RaffleError::InvalidConsumer => 13,
            RaffleError::MustBeSubOwner => 14,
            RaffleError::TooManyConsumers => 15,
            RaffleError::InsufficientBalance => 16,
            RaffleError::NumWordsTooBig => 17,
            RaffleError::InvalidRandomWords => 18,
            RaffleError::UnknownNetwork => 19,
            RaffleError::Overflow => 20,
        }
    }
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e.code())
    }
}
