//! Composite domain: combines an ordered list of independent sub-domains.

use std::fmt;

use crate::domain::{AbstractDomain, DomainError};

/// Element of the composite domain: one component state per sub-domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeState<S> {
    components: Vec<S>,
}

impl<S> CompositeState<S> {
    pub fn new(components: Vec<S>) -> Self {
        Self { components }
    }

    /// Number of component states.
    pub fn arity(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[S] {
        &self.components
    }

    pub fn get(&self, index: usize) -> Option<&S> {
        self.components.get(index)
    }

    pub fn into_components(self) -> Vec<S> {
        self.components
    }
}

impl<S> From<Vec<S>> for CompositeState<S> {
    fn from(components: Vec<S>) -> Self {
        Self::new(components)
    }
}

impl<S> FromIterator<S> for CompositeState<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<S: fmt::Display> fmt::Display for CompositeState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

/// Composite of independent abstract domains.
///
/// Subsumption is decided position by position. Join is deliberately not
/// provided: joining every component independently yields an upper bound,
/// but not necessarily the *least* one, so [`AbstractDomain::join`] always
/// fails with [`DomainError::UnsupportedJoin`]. Analyses over composite
/// states must rely on subsumption (coverage) only.
///
/// # Panics
///
/// Comparing states whose arity differs from each other or from the number
/// of configured sub-domains is a contract violation and panics.
pub struct CompositeDomain<S> {
    domains: Vec<Box<dyn AbstractDomain<State = S>>>,
}

impl<S> CompositeDomain<S> {
    /// Creates a composite over the given sub-domains, in order.
    ///
    /// # Panics
    ///
    /// Panics if `domains` is empty.
    pub fn new(domains: Vec<Box<dyn AbstractDomain<State = S>>>) -> Self {
        assert!(!domains.is_empty(), "Composite domain needs at least one sub-domain");
        Self { domains }
    }

    /// Number of sub-domains.
    pub fn arity(&self) -> usize {
        self.domains.len()
    }

    pub fn domains(&self) -> &[Box<dyn AbstractDomain<State = S>>] {
        &self.domains
    }

    fn check_arity(&self, state1: &CompositeState<S>, state2: &CompositeState<S>) {
        assert_eq!(
            state1.arity(),
            state2.arity(),
            "Composite states of different arity cannot be compared"
        );
        assert_eq!(
            state1.arity(),
            self.arity(),
            "Composite state arity does not match the number of sub-domains"
        );
    }
}

impl<S> fmt::Debug for CompositeDomain<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeDomain")
            .field("arity", &self.arity())
            .finish()
    }
}

impl<S> AbstractDomain for CompositeDomain<S> {
    type State = CompositeState<S>;

    fn is_less_or_equal(&self, state1: &Self::State, state2: &Self::State) -> bool {
        self.check_arity(state1, state2);

        self.domains
            .iter()
            .zip(state1.components.iter().zip(&state2.components))
            .all(|(domain, (c1, c2))| domain.is_less_or_equal(c1, c2))
    }

    fn join(&self, _state1: &Self::State, _state2: &Self::State) -> Result<Self::State, DomainError> {
        Err(DomainError::UnsupportedJoin { domain: "CompositeDomain" })
    }
}
