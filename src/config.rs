// VRF Raffle - Network Configuration
use solana_program::native_token::LAMPORTS_PER_SOL;

/// Networks where the mock coordinator is deployed alongside the raffle
pub const DEVELOPMENT_CHAINS: &[&str] = &["localnet", "localhost"];
/// Amount a fresh mock subscription is funded with: 2 LINK
pub const VRF_SUB_FUND_AMOUNT: u64 = 2_000_000_000_000_000_000;
/// Default player capacity of a raffle account
pub const DEFAULT_MAX_PLAYERS: u32 = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: &'static str,
    /// Funded subscription on an already deployed coordinator of this
    /// program; `None` where the mock is deployed with the raffle
    pub subscription_id: Option<u64>,
    pub entrance_fee: u64,
    pub gas_lane: [u8; 32],
    pub callback_gas_limit: u32,
    /// Seconds between payout cycles
    pub interval: i64,
}

/// Look up the parameters of a network by name
pub fn network_config(name: &str) -> Option<NetworkConfig> {
    match name {
        "devnet" => Some(NetworkConfig {
            name: "devnet",
            subscription_id: Some(1),
            entrance_fee: LAMPORTS_PER_SOL / 1_000,
            gas_lane: [
                121, 211, 216, 131, 45, 144, 69, 146, 192, 191, 152, 24, 182, 33, 82, 44, 152,
                139, 184, 176, 192, 92, 220, 59, 21, 174, 161, 182, 232, 219, 12, 21,
            ],
            callback_gas_limit: 500_000,
            interval: 30,
        }),
        "localnet" | "localhost" => Some(NetworkConfig {
            name: "localnet",
            subscription_id: None,
            entrance_fee: LAMPORTS_PER_SOL / 100,
            gas_lane: [
                216, 155, 43, 241, 80, 227, 185, 225, 52, 70, 152, 110, 87, 31, 185, 202, 178, 75,
                19, 206, 160, 164, 62, 162, 10, 96, 73, 168, 92, 200, 7, 204,
            ],
            callback_gas_limit: 500_000,
            interval: 30,
        }),
        _ => None,
    }
}

pub fn is_development_chain(name: &str) -> bool {
    DEVELOPMENT_CHAINS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_chains_create_their_subscription() {
        for name in DEVELOPMENT_CHAINS {
            let config = network_config(name).unwrap();
            assert!(is_development_chain(name));
            assert_eq!(config.subscription_id, None);
        }
    }

    #[test]
    fn devnet_uses_existing_subscription() {
        let config = network_config("devnet").unwrap();
        assert!(!is_development_chain("devnet"));
        assert_eq!(config.subscription_id, Some(1));
        assert_eq!(config.entrance_fee, 1_000_000);
        assert_eq!(config.interval, 30);
    }

    #[test]
    fn local_entrance_fee_is_a_hundredth_of_a_sol() {
        assert_eq!(network_config("localnet").unwrap().entrance_fee, 10_000_000);
    }

    #[test]
    fn unknown_network() {
        assert_eq!(network_config("mainnet"), None);
        assert!(!is_development_chain("mainnet"));
    }
}
