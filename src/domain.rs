//! Core abstract domain trait.

use thiserror::Error;

/// Failures reported by lattice operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The domain cannot compute a least upper bound for its states.
    #[error("join is not supported by {domain}")]
    UnsupportedJoin { domain: &'static str },
}

/// Abstract domain interface.
///
/// An abstract domain is a lattice of abstract states used for approximating
/// sets of concrete program states.
///
/// # Lattice Properties
///
/// Implementations must satisfy:
/// - Reflexivity: `∀a. a ⊑ a`
/// - Transitivity: `∀a,b,c. a ⊑ b ∧ b ⊑ c ⇒ a ⊑ c`
/// - Join is a least upper bound whenever it returns `Ok`
///
/// The trait is object-safe, so heterogeneous domains can be stored as
/// `Box<dyn AbstractDomain<State = S>>` (see [`CompositeDomain`][crate::composite::CompositeDomain]).
pub trait AbstractDomain: Send + Sync {
    /// The type representing abstract states.
    type State;

    /// Partial order: `state1 ⊑ state2` (`state1` is subsumed by `state2`).
    ///
    /// Returns true if `state1` represents a subset of the concrete states
    /// represented by `state2`.
    fn is_less_or_equal(&self, state1: &Self::State, state2: &Self::State) -> bool;

    /// Join (`⊔`): least upper bound.
    ///
    /// Domains that cannot compute a *least* upper bound must return
    /// [`DomainError::UnsupportedJoin`] instead of an over-approximation.
    fn join(&self, state1: &Self::State, state2: &Self::State) -> Result<Self::State, DomainError>;

    /// Check equality of abstract states (mutual subsumption).
    fn is_equal(&self, state1: &Self::State, state2: &Self::State) -> bool {
        self.is_less_or_equal(state1, state2) && self.is_less_or_equal(state2, state1)
    }
}

impl<D> AbstractDomain for Box<D>
where
    D: AbstractDomain + ?Sized,
{
    type State = D::State;

    fn is_less_or_equal(&self, state1: &Self::State, state2: &Self::State) -> bool {
        (**self).is_less_or_equal(state1, state2)
    }

    fn join(&self, state1: &Self::State, state2: &Self::State) -> Result<Self::State, DomainError> {
        (**self).join(state1, state2)
    }

    fn is_equal(&self, state1: &Self::State, state2: &Self::State) -> bool {
        (**self).is_equal(state1, state2)
    }
}
