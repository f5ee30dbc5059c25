// VRF Raffle - Utility Functions
use arrayref::array_ref;
use solana_program::{native_token::LAMPORTS_PER_SOL, rent::Rent};

/// Lamports held above the rent-exempt reserve of an account
pub fn prize_pool(lamports: u64, rent: &Rent, data_len: usize) -> u64 {
    lamports.saturating_sub(rent.minimum_balance(data_len))
}

/// Read the first 8 bytes of a hash as a little-endian word
pub fn word_from_hash(hash: &[u8; 32]) -> u64 {
    u64::from_le_bytes(*array_ref![hash, 0, 8])
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_pool_excludes_rent_reserve() {
        let rent = Rent::default();
        let reserve = rent.minimum_balance(200);
        assert_eq!(prize_pool(reserve + 42, &rent, 200), 42);
        assert_eq!(prize_pool(reserve - 1, &rent, 200), 0);
    }

    #[test]
    fn word_uses_leading_bytes() {
        let mut hash = [0xffu8; 32];
        hash[..8].copy_from_slice(&7u64.to_le_bytes());
        assert_eq!(word_from_hash(&hash), 7);
    }

    #[test]
    fn formats_sol() {
        assert_eq!(lamports_to_sol(LAMPORTS_PER_SOL / 100), 0.01);
    }
}
