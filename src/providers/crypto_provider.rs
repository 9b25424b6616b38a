use rand::Rng;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const HEX: &[u8] = b"0123456789abcdef";

/// Random identifiers and tokens
pub struct CryptoProvider;

impl CryptoProvider {
    pub fn new() -> Self {
        Self
    }

    /// Random string of `length` ASCII letters and digits
    pub fn random_string(&self, length: usize) -> String {
        Self::sample(ALPHANUMERIC, length)
    }

    /// Random lowercase hex string of `length` characters
    pub fn random_hash(&self, length: usize) -> String {
        Self::sample(HEX, length)
    }

    fn sample(charset: &[u8], length: usize) -> String {
        let mut rng = rand::rng();
        (0..length)
            .map(|_| charset[rng.random_range(0..charset.len())] as char)
            .collect()
    }
}

impl Default for CryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}
