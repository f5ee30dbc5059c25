// VRF Raffle - Mock Coordinator
// Keeps the subscription ledger and the table of pending requests, and
// answers a request by invoking the consumer callback with deterministic
// words. Deployed with the raffle on development networks and shared by
// raffles elsewhere.
use crate::engine::{RandomWordsRequest, RandomnessCoordinator};
use crate::error::RaffleError;
use crate::state::{CoordinatorState, PendingRequest, Subscription};
use crate::utils::word_from_hash;
use solana_program::{keccak, msg, pubkey::Pubkey};
use std::collections::BTreeMap;

/// Premium charged per fulfillment: 0.25 LINK
pub const BASE_FEE: u64 = 250_000_000_000_000_000;
/// Juels charged per unit of callback gas
pub const GAS_PRICE_LINK: u64 = 1_000_000_000;
pub const MAX_NUM_WORDS: u32 = 500;
pub const MAX_CONSUMERS: usize = 100;

/// Outcome of a fulfilled request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fulfillment {
    pub request_id: u64,
    /// Juels charged to the subscription
    pub payment: u64,
    pub random_words: Vec<u64>,
}

impl CoordinatorState {
    pub fn new(base_fee: u64, gas_price_link: u64) -> Self {
        Self {
            is_initialized: true,
            base_fee,
            gas_price_link,
            next_subscription_id: 1,
            next_request_id: 1,
            subscriptions: BTreeMap::new(),
            requests: BTreeMap::new(),
        }
    }

    pub fn create_subscription(&mut self, owner: Pubkey) -> Result<u64, RaffleError> {
        let id = self.next_subscription_id;
        self.next_subscription_id = id.checked_add(1).ok_or(RaffleError::Overflow)?;
        self.subscriptions.insert(
            id,
            Subscription {
                owner,
                balance: 0,
                consumers: Vec::new(),
            },
        );
        msg!("SubscriptionCreated: id={} owner={}", id, owner);
        Ok(id)
    }

    /// Anyone may fund a subscription. Returns the new balance.
    pub fn fund_subscription(&mut self, subscription_id: u64, amount: u64) -> Result<u64, RaffleError> {
        let subscription = self.subscription_mut(subscription_id)?;
        let old_balance = subscription.balance;
        subscription.balance = old_balance
            .checked_add(amount)
            .ok_or(RaffleError::Overflow)?;
        msg!(
            "SubscriptionFunded: id={} old_balance={} new_balance={}",
            subscription_id,
            old_balance,
            subscription.balance
        );
        Ok(subscription.balance)
    }

    /// Allow `consumer` to request randomness. Adding twice is a no-op.
    pub fn add_consumer(
        &mut self,
        subscription_id: u64,
        owner: &Pubkey,
        consumer: Pubkey,
    ) -> Result<(), RaffleError> {
        let subscription = self.owned_subscription_mut(subscription_id, owner)?;
        if subscription.consumers.contains(&consumer) {
            return Ok(());
        }
        if subscription.consumers.len() >= MAX_CONSUMERS {
            return Err(RaffleError::TooManyConsumers);
        }
        subscription.consumers.push(consumer);
        msg!("ConsumerAdded: id={} consumer={}", subscription_id, consumer);
        Ok(())
    }

    pub fn remove_consumer(
        &mut self,
        subscription_id: u64,
        owner: &Pubkey,
        consumer: &Pubkey,
    ) -> Result<(), RaffleError> {
        let subscription = self.owned_subscription_mut(subscription_id, owner)?;
        let position = subscription
            .consumers
            .iter()
            .position(|c| c == consumer)
            .ok_or(RaffleError::InvalidConsumer)?;
        subscription.consumers.remove(position);
        msg!("ConsumerRemoved: id={} consumer={}", subscription_id, consumer);
        Ok(())
    }

    pub fn request_random_words(
        &mut self,
        consumer: Pubkey,
        request: &RandomWordsRequest,
    ) -> Result<u64, RaffleError> {
        let subscription = self
            .subscriptions
            .get(&request.subscription_id)
            .ok_or(RaffleError::InvalidSubscription)?;
        if !subscription.consumers.contains(&consumer) {
            return Err(RaffleError::InvalidConsumer);
        }
        if request.num_words > MAX_NUM_WORDS {
            return Err(RaffleError::NumWordsTooBig);
        }

        let request_id = self.next_request_id;
        self.next_request_id = request_id.checked_add(1).ok_or(RaffleError::Overflow)?;
        self.requests.insert(
            request_id,
            PendingRequest {
                subscription_id: request.subscription_id,
                consumer,
                callback_gas_limit: request.callback_gas_limit,
                num_words: request.num_words,
            },
        );
        msg!(
            "RandomWordsRequested: request_id={} subscription={} confirmations={} num_words={} consumer={}",
            request_id,
            request.subscription_id,
            request.request_confirmations,
            request.num_words,
            consumer
        );
        Ok(request_id)
    }

    pub fn pending_request(&self, request_id: u64) -> Result<&PendingRequest, RaffleError> {
        self.requests
            .get(&request_id)
            .ok_or(RaffleError::NonexistentRequest)
    }

    /// Words the coordinator delivers for `request_id` unless overridden
    pub fn random_words(request_id: u64, num_words: u32) -> Vec<u64> {
        (0..num_words)
            .map(|i| {
                let hash = keccak::hashv(&[&request_id.to_le_bytes()[..], &i.to_le_bytes()[..]]);
                word_from_hash(&hash.to_bytes())
            })
            .collect()
    }

    /// Answer a pending request by running the consumer callback.
    ///
    /// The request is removed and the subscription charged only if the
    /// callback succeeds; otherwise it stays pending and can be retried.
    pub fn fulfill<F>(
        &mut self,
        request_id: u64,
        consumer: &Pubkey,
        override_words: Option<Vec<u64>>,
        callback: F,
    ) -> Result<Fulfillment, RaffleError>
    where
        F: FnOnce(u64, &[u64]) -> Result<(), RaffleError>,
    {
        let request = self.pending_request(request_id)?.clone();
        if request.consumer != *consumer {
            return Err(RaffleError::InvalidConsumer);
        }

        let random_words = match override_words {
            Some(words) if words.len() != request.num_words as usize => {
                return Err(RaffleError::InvalidRandomWords)
            }
            Some(words) => words,
            None => Self::random_words(request_id, request.num_words),
        };

        let payment = self
            .gas_price_link
            .checked_mul(u64::from(request.callback_gas_limit))
            .and_then(|gas| gas.checked_add(self.base_fee))
            .ok_or(RaffleError::Overflow)?;
        let balance = self.subscription_mut(request.subscription_id)?.balance;
        if balance < payment {
            return Err(RaffleError::InsufficientBalance);
        }

        callback(request_id, &random_words)?;

        self.requests.remove(&request_id);
        self.subscription_mut(request.subscription_id)?.balance = balance - payment;
        msg!(
            "RandomWordsFulfilled: request_id={} payment={}",
            request_id,
            payment
        );

        Ok(Fulfillment {
            request_id,
            payment,
            random_words,
        })
    }

    /// View of the coordinator as the randomness source of `consumer`
    pub fn consumer(&mut self, consumer: Pubkey) -> ConsumerHandle<'_> {
        ConsumerHandle {
            coordinator: self,
            consumer,
        }
    }

    fn subscription_mut(&mut self, subscription_id: u64) -> Result<&mut Subscription, RaffleError> {
        self.subscriptions
            .get_mut(&subscription_id)
            .ok_or(RaffleError::InvalidSubscription)
    }

    fn owned_subscription_mut(
        &mut self,
        subscription_id: u64,
        owner: &Pubkey,
    ) -> Result<&mut Subscription, RaffleError> {
        let subscription = self.subscription_mut(subscription_id)?;
        if subscription.owner != *owner {
            return Err(RaffleError::MustBeSubOwner);
        }
        Ok(subscription)
    }
}

/// Requests randomness on behalf of one consumer account
pub struct ConsumerHandle<'a> {
    coordinator: &'a mut CoordinatorState,
    consumer: Pubkey,
}

impl RandomnessCoordinator for ConsumerHandle<'_> {
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> Result<u64, RaffleError> {
        self.coordinator.request_random_words(self.consumer, request)
    }
}
