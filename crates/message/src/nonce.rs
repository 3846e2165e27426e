//! Random nonce generation.

use rand::{Rng, distributions::Alphanumeric, thread_rng};

/// 17 alphanumeric characters hold just over 96 bits of entropy.
const NONCE_LENGTH: usize = 17;

/// Generates a random alphanumeric nonce. Well above the 8 character
/// minimum the format requires, and hard enough to guess within any
/// reasonable validity window.
pub fn generate() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_valid_nonces() {
        for _ in 0..100 {
            let nonce = generate();
            assert_eq!(nonce.len(), NONCE_LENGTH);
            assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn nonces_are_unique() {
        assert_ne!(generate(), generate());
    }
}
