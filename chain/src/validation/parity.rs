//! Parity rule for numeric payloads.
//!
//! This is a placeholder policy, not a real consensus mechanism:
//!
//! - if `original_data` is a non-empty run of ASCII digits, the transaction
//!   is accepted only when that integer is even,
//! - any other payload (including a missing one) is accepted, since the
//!   rule has no opinion on it.

use crate::consensus::validator::ConsensusPredicate;
use crate::types::Transaction;

/// Accepts even numeric payloads and every non-numeric one.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParityPredicate;

impl ParityPredicate {
    pub fn new() -> Self {
        Self
    }
}

/// Returns `Some(is_even)` if `data` is a nonnegative decimal literal.
///
/// Parity is read off the last digit, so arbitrarily long literals are
/// handled without overflow.
pub fn numeric_parity(data: &str) -> Option<bool> {
    let last = data.bytes().last()?;
    if !data.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((last - b'0') % 2 == 0)
}

impl ConsensusPredicate for ParityPredicate {
    fn accepts(&self, tx: &Transaction) -> bool {
        match tx.original_data.as_deref().and_then(numeric_parity) {
            Some(is_even) => is_even,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_parity_recognises_decimal_literals() {
        assert_eq!(numeric_parity("0"), Some(true));
        assert_eq!(numeric_parity("4"), Some(true));
        assert_eq!(numeric_parity("3"), Some(false));
        assert_eq!(numeric_parity("007"), Some(false));
        assert_eq!(
            numeric_parity("123456789012345678901234567890123456789012"),
            Some(true)
        );
    }

    #[test]
    fn numeric_parity_rejects_non_literals() {
        assert_eq!(numeric_parity(""), None);
        assert_eq!(numeric_parity("-4"), None);
        assert_eq!(numeric_parity("+4"), None);
        assert_eq!(numeric_parity("4.0"), None);
        assert_eq!(numeric_parity(" 4"), None);
        assert_eq!(numeric_parity("0x10"), None);
        assert_eq!(numeric_parity("٤"), None);
    }

    #[test]
    fn parity_predicate_accepts_even_and_rejects_odd() {
        let p = ParityPredicate::new();

        assert!(p.accepts(&Transaction::new("4")));
        assert!(p.accepts(&Transaction::new("10")));
        assert!(!p.accepts(&Transaction::new("3")));
        assert!(!p.accepts(&Transaction::new("99999")));
    }

    #[test]
    fn parity_predicate_has_no_opinion_on_other_payloads() {
        let p = ParityPredicate::new();

        assert!(p.accepts(&Transaction::new("sender:alice,amount:3")));
        assert!(p.accepts(&Transaction::new("-3")));
        assert!(p.accepts(&Transaction::new("")));
        assert!(p.accepts(&Transaction::default()));
    }
}
