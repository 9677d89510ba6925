//! # Order Numbers
//!
//! Human-readable order numbers shown on the register and the receipt.
//!
//! ```text
//!   ORD-004217
//!   ─┬─ ──┬───
//!    │    └── random suffix, zero-padded to 6 digits
//!    └─────── configurable prefix
//! ```
//!
//! An order number is display-only. Nothing checks it for collisions and it
//! is never sent as a submission key; the server assigns the sale id.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

pub const DEFAULT_ORDER_PREFIX: &str = "ORD-";

const SUFFIX_DIGITS: usize = 6;
const SUFFIX_UPPER: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Builds an order number from the given random source.
    pub fn generate<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> Self {
        let suffix = rng.gen_range(0..SUFFIX_UPPER);
        OrderNumber(format!("{}{:0width$}", prefix, suffix, width = SUFFIX_DIGITS))
    }

    /// Builds an order number from the thread-local generator.
    pub fn random(prefix: &str) -> Self {
        Self::generate(prefix, &mut rand::thread_rng())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let number = OrderNumber::generate("ORD-", &mut rng);
            let suffix = number.as_str().strip_prefix("ORD-").unwrap();
            assert_eq!(suffix.len(), 6);
            assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_seeded_generation_is_repeatable() {
        let a = OrderNumber::generate("RX", &mut StdRng::seed_from_u64(42));
        let b = OrderNumber::generate("RX", &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!(OrderNumber::random("RX").as_str().starts_with("RX"));
    }
}
