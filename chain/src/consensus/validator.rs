//! Consensus predicates applied after the cryptographic checks pass.

use crate::types::Transaction;

/// Pluggable acceptance rule for transactions.
///
/// Implementations must be deterministic and side-effect free. They only
/// see transactions whose signature (and proof, if attached) already
/// verified.
pub trait ConsensusPredicate: Send {
    fn accepts(&self, tx: &Transaction) -> bool;
}

/// A trivial predicate that accepts every transaction.
///
/// Useful for tests and for isolating the cryptographic checks while a
/// real policy is being developed.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl ConsensusPredicate for AcceptAll {
    fn accepts(&self, _tx: &Transaction) -> bool {
        true
    }
}

/// A predicate that composes two other predicates.
///
/// `CombinedPredicate { first, second }` accepts only if both accept,
/// evaluating `second` only when `first` passed.
#[derive(Clone, Copy, Debug, Default)]
pub struct CombinedPredicate<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> CombinedPredicate<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A, B> ConsensusPredicate for CombinedPredicate<A, B>
where
    A: ConsensusPredicate,
    B: ConsensusPredicate,
{
    fn accepts(&self, tx: &Transaction) -> bool {
        self.first.accepts(tx) && self.second.accepts(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectAll;

    impl ConsensusPredicate for RejectAll {
        fn accepts(&self, _tx: &Transaction) -> bool {
            false
        }
    }

    #[test]
    fn accept_all_accepts_anything() {
        assert!(AcceptAll.accepts(&Transaction::default()));
        assert!(AcceptAll.accepts(&Transaction::new("3")));
    }

    #[test]
    fn combined_requires_both() {
        let tx = Transaction::new("x");

        assert!(CombinedPredicate::new(AcceptAll, AcceptAll).accepts(&tx));
        assert!(!CombinedPredicate::new(AcceptAll, RejectAll).accepts(&tx));
        assert!(!CombinedPredicate::new(RejectAll, AcceptAll).accepts(&tx));
    }

    #[test]
    fn predicate_trait_is_object_safe() {
        let boxed: Box<dyn ConsensusPredicate> = Box::new(AcceptAll);
        assert!(boxed.accepts(&Transaction::default()));
    }
}
