// VRF Raffle - Raffle Engine
// A payout cycle moves the raffle from `Open` to `Calculating` when upkeep
// is performed and back to `Open` when the coordinator delivers randomness.
// Every operation either fully applies or leaves the raffle untouched.
use crate::error::RaffleError;
use crate::state::{Raffle, RaffleState};
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};
use std::fmt;

/// Block confirmations the coordinator waits before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;
/// Random words requested per payout cycle
pub const NUM_WORDS: u32 = 1;

/// Randomness request sent to the coordinator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RandomWordsRequest {
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// Source of randomness. Answers arrive later through
/// [`Raffle::fulfill_random_words`], keyed by the returned request id.
pub trait RandomnessCoordinator {
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> Result<u64, RaffleError>;
}

/// Holds the prize pool and pays it out
pub trait PrizeVault {
    /// Lamports available for the prize
    fn balance(&self) -> u64;

    /// Move `amount` to `winner`. Must not move anything on failure.
    fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError>;
}

/// Notifications emitted by raffle operations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleEnter { player: Pubkey },
    RequestedRaffleWinner { request_id: u64 },
    WinnerPicked { winner: Pubkey },
}

impl fmt::Display for RaffleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaffleEvent::RaffleEnter { player } => write!(f, "RaffleEnter: player={}", player),
            RaffleEvent::RequestedRaffleWinner { request_id } => {
                write!(f, "RequestedRaffleWinner: request_id={}", request_id)
            }
            RaffleEvent::WinnerPicked { winner } => write!(f, "WinnerPicked: winner={}", winner),
        }
    }
}

/// Result of an upkeep check
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub upkeep_needed: bool,
    /// Passed through to `perform_upkeep`; always empty
    pub perform_data: Vec<u8>,
}

impl Raffle {
    pub fn enter(&mut self, player: Pubkey, amount: u64) -> Result<RaffleEvent, RaffleError> {
        if self.state != RaffleState::Open {
            return Err(RaffleError::NotOpen);
        }
        if amount < self.entrance_fee {
            return Err(RaffleError::InsufficientPayment {
                sent: amount,
                required: self.entrance_fee,
            });
        }
        if self.players.len() >= self.max_players as usize {
            return Err(RaffleError::RaffleFull);
        }

        self.players.push(player);
        Ok(RaffleEvent::RaffleEnter { player })
    }

    /// Whether a payout cycle may start at `now` with `balance` in the pool
    pub fn check_upkeep(&self, now: UnixTimestamp, balance: u64) -> UpkeepCheck {
        let is_open = self.state == RaffleState::Open;
        let time_passed = now.saturating_sub(self.last_timestamp) >= self.interval;
        let has_players = !self.players.is_empty();
        let has_balance = balance > 0;

        UpkeepCheck {
            upkeep_needed: is_open && time_passed && has_players && has_balance,
            perform_data: Vec::new(),
        }
    }

    /// Start a payout cycle by requesting randomness
    pub fn perform_upkeep<C: RandomnessCoordinator>(
        &mut self,
        now: UnixTimestamp,
        balance: u64,
        coordinator: &mut C,
    ) -> Result<RaffleEvent, RaffleError> {
        if !self.check_upkeep(now, balance).upkeep_needed {
            return Err(RaffleError::UpkeepNotNeeded {
                balance,
                num_players: self.players.len() as u64,
                state: self.state.into(),
            });
        }

        let request_id = coordinator.request_random_words(&self.random_words_request())?;
        self.state = RaffleState::Calculating;
        self.pending_request_id = Some(request_id);

        Ok(RaffleEvent::RequestedRaffleWinner { request_id })
    }

    /// Coordinator callback: pick the winner and pay out the whole pool
    pub fn fulfill_random_words<V: PrizeVault>(
        &mut self,
        request_id: u64,
        random_words: &[u64],
        now: UnixTimestamp,
        vault: &mut V,
    ) -> Result<RaffleEvent, RaffleError> {
        if self.pending_request_id != Some(request_id) {
            return Err(RaffleError::NonexistentRequest);
        }
        if random_words.is_empty() {
            return Err(RaffleError::EmptyRandomWords);
        }
        let winner = self
            .winner_for(random_words)
            .ok_or(RaffleError::IndexOutOfRange)?;

        let prize = vault.balance();
        vault.pay(&winner, prize)?;

        self.recent_winner = Some(winner);
        self.players.clear();
        self.state = RaffleState::Open;
        self.pending_request_id = None;
        self.last_timestamp = now;

        Ok(RaffleEvent::WinnerPicked { winner })
    }

    /// Player the first random word selects, if there are players
    pub fn winner_for(&self, random_words: &[u64]) -> Option<Pubkey> {
        let word = *random_words.first()?;
        if self.players.is_empty() {
            return None;
        }
        let index = word % self.players.len() as u64;
        self.players.get(index as usize).copied()
    }

    pub fn player(&self, index: u64) -> Result<&Pubkey, RaffleError> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.players.get(index))
            .ok_or(RaffleError::IndexOutOfRange)
    }

    pub fn number_of_players(&self) -> u64 {
        self.players.len() as u64
    }

    fn random_words_request(&self) -> RandomWordsRequest {
        RandomWordsRequest {
            key_hash: self.gas_lane,
            subscription_id: self.subscription_id,
            request_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit: self.callback_gas_limit,
            num_words: NUM_WORDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RaffleParams;

    const FEE: u64 = 10_000_000;
    const INTERVAL: i64 = 30;
    const START: UnixTimestamp = 1_000;

    #[derive(Default)]
    struct FakeCoordinator {
        next_id: u64,
        requests: Vec<RandomWordsRequest>,
        fail: bool,
    }

    impl RandomnessCoordinator for FakeCoordinator {
        fn request_random_words(&mut self, request: &RandomWordsRequest) -> Result<u64, RaffleError> {
            if self.fail {
                return Err(RaffleError::InvalidConsumer);
            }
            self.next_id += 1;
            self.requests.push(request.clone());
            Ok(self.next_id)
        }
    }

    struct FakeVault {
        pool: u64,
        paid: Vec<(Pubkey, u64)>,
        reject: bool,
    }

    impl FakeVault {
        fn holding(pool: u64) -> Self {
            Self {
                pool,
                paid: Vec::new(),
                reject: false,
            }
        }
    }

    impl PrizeVault for FakeVault {
        fn balance(&self) -> u64 {
            self.pool
        }

        fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError> {
            if self.reject {
                return Err(RaffleError::TransferFailed);
            }
            self.pool -= amount;
            self.paid.push((*winner, amount));
            Ok(())
        }
    }

    fn new_raffle() -> Raffle {
        let params = RaffleParams {
            entrance_fee: FEE,
            interval: INTERVAL,
            gas_lane: [3u8; 32],
            subscription_id: 1,
            callback_gas_limit: 500_000,
        };
        Raffle::new(params, Pubkey::new_unique(), START, 16)
    }

    fn entered(count: usize) -> (Raffle, Vec<Pubkey>) {
        let mut raffle = new_raffle();
        let players: Vec<Pubkey> = (0..count).map(|_| Pubkey::new_unique()).collect();
        for player in &players {
            raffle.enter(*player, FEE).unwrap();
        }
        (raffle, players)
    }

    fn calculating(count: usize) -> (Raffle, Vec<Pubkey>, u64) {
        let (mut raffle, players) = entered(count);
        let mut coordinator = FakeCoordinator::default();
        let event = raffle
            .perform_upkeep(START + INTERVAL + 1, FEE * count as u64, &mut coordinator)
            .unwrap();
        let request_id = match event {
            RaffleEvent::RequestedRaffleWinner { request_id } => request_id,
            other => panic!("unexpected event {:?}", other),
        };
        (raffle, players, request_id)
    }

    #[test]
    fn initializes_open_and_empty() {
        let raffle = new_raffle();
        assert_eq!(raffle.state, RaffleState::Open);
        assert_eq!(raffle.interval, INTERVAL);
        assert_eq!(raffle.last_timestamp, START);
        assert_eq!(raffle.recent_winner, None);
        assert_eq!(raffle.pending_request_id, None);
        assert_eq!(raffle.number_of_players(), 0);
    }

    #[test]
    fn enter_rejects_underpayment_without_recording() {
        let mut raffle = new_raffle();
        for amount in [0, 1, FEE - 1] {
            assert_eq!(
                raffle.enter(Pubkey::new_unique(), amount),
                Err(RaffleError::InsufficientPayment {
                    sent: amount,
                    required: FEE
                })
            );
        }
        assert_eq!(raffle.number_of_players(), 0);
    }

    #[test]
    fn enter_appends_player_and_emits_event() {
        let mut raffle = new_raffle();
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();

        assert_eq!(
            raffle.enter(first, FEE),
            Ok(RaffleEvent::RaffleEnter { player: first })
        );
        raffle.enter(second, FEE * 2).unwrap();

        assert_eq!(raffle.number_of_players(), 2);
        assert_eq!(raffle.player(0), Ok(&first));
        assert_eq!(raffle.player(1), Ok(&second));
    }

    #[test]
    fn enter_while_calculating_is_rejected_for_any_amount() {
        let (mut raffle, _, _) = calculating(1);
        for amount in [0, FEE, FEE * 10] {
            assert_eq!(
                raffle.enter(Pubkey::new_unique(), amount),
                Err(RaffleError::NotOpen)
            );
        }
        assert_eq!(raffle.number_of_players(), 1);
    }

    #[test]
    fn enter_rejects_when_account_is_full() {
        let mut raffle = new_raffle();
        raffle.max_players = 1;
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        assert_eq!(
            raffle.enter(Pubkey::new_unique(), FEE),
            Err(RaffleError::RaffleFull)
        );
    }

    #[test]
    fn player_out_of_range() {
        let (raffle, _) = entered(2);
        assert_eq!(raffle.player(2), Err(RaffleError::IndexOutOfRange));
        assert_eq!(raffle.player(u64::MAX), Err(RaffleError::IndexOutOfRange));
    }

    #[test]
    fn check_upkeep_requires_every_condition() {
        let later = START + INTERVAL + 1;

        let (raffle, _) = entered(1);
        assert!(raffle.check_upkeep(later, FEE).upkeep_needed);
        assert!(raffle.check_upkeep(START + INTERVAL, FEE).upkeep_needed);
        assert!(raffle.check_upkeep(later, FEE).perform_data.is_empty());

        // time not elapsed
        assert!(!raffle.check_upkeep(START + INTERVAL - 5, FEE).upkeep_needed);
        // no balance
        assert!(!raffle.check_upkeep(later, 0).upkeep_needed);
        // no players
        assert!(!new_raffle().check_upkeep(later, FEE).upkeep_needed);
        // not open
        let (raffle, _, _) = calculating(1);
        assert!(!raffle.check_upkeep(later, FEE).upkeep_needed);
    }

    #[test]
    fn check_upkeep_is_false_when_nobody_entered_and_time_passed() {
        let raffle = new_raffle();
        assert!(!raffle.check_upkeep(START + INTERVAL + 1, 0).upkeep_needed);
    }

    #[test]
    fn perform_upkeep_rejects_when_not_needed() {
        let (mut raffle, _) = entered(2);
        let mut coordinator = FakeCoordinator::default();

        assert_eq!(
            raffle.perform_upkeep(START + 1, FEE * 2, &mut coordinator),
            Err(RaffleError::UpkeepNotNeeded {
                balance: FEE * 2,
                num_players: 2,
                state: 0,
            })
        );
        assert_eq!(raffle.state, RaffleState::Open);
        assert!(coordinator.requests.is_empty());
    }

    #[test]
    fn perform_upkeep_requests_randomness_and_locks() {
        let (mut raffle, _) = entered(1);
        let mut coordinator = FakeCoordinator::default();

        let event = raffle
            .perform_upkeep(START + INTERVAL + 1, FEE, &mut coordinator)
            .unwrap();

        assert_eq!(event, RaffleEvent::RequestedRaffleWinner { request_id: 1 });
        assert_eq!(raffle.state, RaffleState::Calculating);
        assert_eq!(raffle.pending_request_id, Some(1));
        assert_eq!(
            coordinator.requests,
            vec![RandomWordsRequest {
                key_hash: [3u8; 32],
                subscription_id: 1,
                request_confirmations: REQUEST_CONFIRMATIONS,
                callback_gas_limit: 500_000,
                num_words: NUM_WORDS,
            }]
        );

        // a second cycle cannot start while the first is outstanding
        assert!(matches!(
            raffle.perform_upkeep(START + INTERVAL * 3, FEE, &mut coordinator),
            Err(RaffleError::UpkeepNotNeeded { state: 1, .. })
        ));
        assert_eq!(coordinator.requests.len(), 1);
    }

    #[test]
    fn failed_request_leaves_raffle_open() {
        let (mut raffle, _) = entered(1);
        let mut coordinator = FakeCoordinator {
            fail: true,
            ..Default::default()
        };

        assert_eq!(
            raffle.perform_upkeep(START + INTERVAL + 1, FEE, &mut coordinator),
            Err(RaffleError::InvalidConsumer)
        );
        assert_eq!(raffle.state, RaffleState::Open);
        assert_eq!(raffle.pending_request_id, None);
    }

    #[test]
    fn fulfill_rejects_unknown_request() {
        for count in [1, 3] {
            let (mut raffle, _, request_id) = calculating(count);
            let before = raffle.clone();
            let mut vault = FakeVault::holding(FEE);

            for unknown in [0, request_id + 1] {
                assert_eq!(
                    raffle.fulfill_random_words(unknown, &[1], START + 100, &mut vault),
                    Err(RaffleError::NonexistentRequest)
                );
            }
            assert_eq!(raffle, before);
            assert!(vault.paid.is_empty());
        }
    }

    #[test]
    fn fulfill_without_pending_request_is_rejected() {
        let (mut raffle, _) = entered(1);
        let mut vault = FakeVault::holding(FEE);
        assert_eq!(
            raffle.fulfill_random_words(1, &[1], START + 100, &mut vault),
            Err(RaffleError::NonexistentRequest)
        );
    }

    #[test]
    fn fulfill_requires_a_word() {
        let (mut raffle, _, request_id) = calculating(2);
        let mut vault = FakeVault::holding(FEE * 2);
        assert_eq!(
            raffle.fulfill_random_words(request_id, &[], START + 100, &mut vault),
            Err(RaffleError::EmptyRandomWords)
        );
        assert_eq!(raffle.state, RaffleState::Calculating);
    }

    #[test]
    fn single_player_wins_whatever_the_word() {
        let (mut raffle, players, request_id) = calculating(1);
        let mut vault = FakeVault::holding(FEE);
        let now = START + INTERVAL + 40;

        let event = raffle
            .fulfill_random_words(request_id, &[7], now, &mut vault)
            .unwrap();

        assert_eq!(event, RaffleEvent::WinnerPicked { winner: players[0] });
        assert_eq!(raffle.recent_winner, Some(players[0]));
        assert_eq!(raffle.state, RaffleState::Open);
        assert_eq!(raffle.pending_request_id, None);
        assert_eq!(raffle.number_of_players(), 0);
        assert_eq!(raffle.last_timestamp, now);
        assert_eq!(vault.paid, vec![(players[0], FEE)]);
        assert_eq!(vault.pool, 0);
    }

    #[test]
    fn winner_index_is_word_modulo_player_count() {
        let (mut raffle, players, request_id) = calculating(4);
        let mut vault = FakeVault::holding(FEE * 4);

        raffle
            .fulfill_random_words(request_id, &[2], START + 100, &mut vault)
            .unwrap();

        assert_eq!(raffle.recent_winner, Some(players[2]));
        assert_eq!(vault.paid, vec![(players[2], FEE * 4)]);

        let (raffle, players, _) = calculating(4);
        assert_eq!(raffle.winner_for(&[u64::MAX]), Some(players[3]));
        assert_eq!(raffle.winner_for(&[9, 0]), Some(players[1]));
    }

    #[test]
    fn failed_payout_rolls_back() {
        let (mut raffle, _, request_id) = calculating(3);
        let before = raffle.clone();
        let mut vault = FakeVault::holding(FEE * 3);
        vault.reject = true;

        assert_eq!(
            raffle.fulfill_random_words(request_id, &[5], START + 100, &mut vault),
            Err(RaffleError::TransferFailed)
        );
        assert_eq!(raffle, before);
        assert_eq!(vault.pool, FEE * 3);
    }

    #[test]
    fn completed_cycle_reopens_for_next_round() {
        let (mut raffle, _, request_id) = calculating(2);
        let mut vault = FakeVault::holding(FEE * 2);
        let paid_at = START + 100;
        raffle
            .fulfill_random_words(request_id, &[1], paid_at, &mut vault)
            .unwrap();

        let next = Pubkey::new_unique();
        raffle.enter(next, FEE).unwrap();
        assert!(!raffle.check_upkeep(paid_at + INTERVAL - 1, FEE).upkeep_needed);
        assert!(raffle.check_upkeep(paid_at + INTERVAL, FEE).upkeep_needed);
    }

    #[test]
    fn events_render_as_log_lines() {
        let event = RaffleEvent::RequestedRaffleWinner { request_id: 12 };
        assert_eq!(event.to_string(), "RequestedRaffleWinner: request_id=12");
    }
}
