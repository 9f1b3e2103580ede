mod webhook_signature;

use rand::{distributions::Alphanumeric, Rng};

pub use webhook_signature::{calculate_webhook_hmac, verify_webhook_hmac, HmacVerifier};

/// Normalizes an on-chain address for comparison against the platform custody address.
///
/// EVM-style `0x` addresses are case-insensitive on chain (the mixed case is only a checksum), so they
/// are compared lowercased. Addresses of every other network are compared byte-exact.
pub fn normalize_settlement_address(address: &str) -> String {
    let address = address.trim();
    if address.len() == 42 && address[..2].eq_ignore_ascii_case("0x") {
        address.to_ascii_lowercase()
    } else {
        address.to_string()
    }
}

/// Generates a fresh public payment-link code.
pub fn new_link_code() -> String {
    let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect();
    format!("lnk_{}", suffix.to_ascii_lowercase())
}
