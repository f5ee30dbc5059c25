// VRF Raffle - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_pack::{IsInitialized, Sealed},
    pubkey::Pubkey,
};
use std::collections::BTreeMap;

/// Whether the raffle accepts entries
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Raffle is open for entries
    Open,
    /// Randomness has been requested, waiting for the coordinator callback
    Calculating,
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Calculating => 1,
        }
    }
}

/// Construction parameters of a raffle, fixed for its lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleParams {
    /// Entrance fee in lamports
    pub entrance_fee: u64,
    /// Minimum number of seconds between payout cycles
    pub interval: i64,
    /// Key hash selecting the oracle gas lane
    pub gas_lane: [u8; 32],
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    pub state: RaffleState,
    /// Entrance fee in lamports
    pub entrance_fee: u64,
    /// Minimum number of seconds between payout cycles
    pub interval: i64,
    /// Time of the last payout, or of initialization
    pub last_timestamp: UnixTimestamp,
    /// Winner of the last payout cycle
    pub recent_winner: Option<Pubkey>,
    /// Outstanding randomness request, set only while calculating
    pub pending_request_id: Option<u64>,
    /// Coordinator account this raffle requests randomness from
    pub vrf_coordinator: Pubkey,
    pub gas_lane: [u8; 32],
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    /// Number of players the account has room for
    pub max_players: u32,
    /// Players in entry order
    pub players: Vec<Pubkey>,
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Raffle {
    /// Serialized size with an empty player list
    pub const BASE_LEN: usize =
        1 + 1 + 8 + 8 + 8 + (1 + 32) + (1 + 8) + 32 + 32 + 8 + 4 + 4 + 4;

    /// Create an open raffle with no players
    pub fn new(
        params: RaffleParams,
        vrf_coordinator: Pubkey,
        now: UnixTimestamp,
        max_players: u32,
    ) -> Self {
        Self {
            is_initialized: true,
            state: RaffleState::Open,
            entrance_fee: params.entrance_fee,
            interval: params.interval,
            last_timestamp: now,
            recent_winner: None,
            pending_request_id: None,
            vrf_coordinator,
            gas_lane: params.gas_lane,
            subscription_id: params.subscription_id,
            callback_gas_limit: params.callback_gas_limit,
            max_players,
            players: Vec::new(),
        }
    }

    /// Account size needed to hold `max_players` entries
    pub fn space(max_players: u32) -> usize {
        Self::BASE_LEN + max_players as usize * 32
    }

    /// Number of players an account of `data_len` bytes can hold
    pub fn capacity(data_len: usize) -> u32 {
        let slots = data_len.saturating_sub(Self::BASE_LEN) / 32;
        u32::try_from(slots).unwrap_or(u32::MAX)
    }
}

/// Subscription paying for randomness requests
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Subscription {
    pub owner: Pubkey,
    /// Balance in juels (1e-18 LINK)
    pub balance: u64,
    /// Accounts allowed to request randomness against this subscription
    pub consumers: Vec<Pubkey>,
}

/// Randomness request waiting for fulfillment
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct PendingRequest {
    pub subscription_id: u64,
    /// Account that issued the request and receives the callback
    pub consumer: Pubkey,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// Mock randomness coordinator account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct CoordinatorState {
    pub is_initialized: bool,
    /// Flat premium charged per fulfillment, in juels
    pub base_fee: u64,
    /// Juels charged per unit of callback gas
    pub gas_price_link: u64,
    pub next_subscription_id: u64,
    pub next_request_id: u64,
    pub subscriptions: BTreeMap<u64, Subscription>,
    pub requests: BTreeMap<u64, PendingRequest>,
}

impl Sealed for CoordinatorState {}

impl IsInitialized for CoordinatorState {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl CoordinatorState {
    /// Account size allocated for the coordinator
    pub const SPACE: usize = 10 * 1024;
}
