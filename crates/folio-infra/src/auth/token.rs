use rand::RngCore;
use rand::rngs::OsRng;

use folio_core::ports::SessionTokenGenerator;

/// Number of random bytes behind each session token.
const TOKEN_BYTES: usize = 32;

/// Opaque session tokens: random bytes from the OS, hex encoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenGenerator;

impl SessionTokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_hex_and_unique() {
        let generator = RandomTokenGenerator;
        let a = generator.generate();
        let b = generator.generate();

        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
