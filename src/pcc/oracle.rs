use crate::algorithm::AnalysisError;
use crate::domain::AbstractDomain;

/// Oracle validating single steps of a certificate without rebuilding it.
pub trait ProofChecker<S> {
    /// Check that `successors` are exactly the abstract successors of `state`.
    fn are_abstract_successors(&self, state: &S, successors: &[&S]) -> Result<bool, AnalysisError>;

    /// Check that `covered` is subsumed by `covering`.
    fn is_covered_by(&self, covered: &S, covering: &S) -> Result<bool, AnalysisError>;
}

/// Proof checker built from an abstract domain and a successor function.
///
/// Coverage is the domain's partial order. Claimed successors match when
/// every computed successor equals (mutual subsumption) some claimed one and
/// vice versa.
pub struct DomainProofChecker<D, T> {
    domain: D,
    transfer: T,
}

impl<D, T> DomainProofChecker<D, T>
where
    D: AbstractDomain,
    T: Fn(&D::State) -> Result<Vec<D::State>, AnalysisError>,
{
    pub fn new(domain: D, transfer: T) -> Self {
        Self { domain, transfer }
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }
}

impl<D, T> ProofChecker<D::State> for DomainProofChecker<D, T>
where
    D: AbstractDomain,
    T: Fn(&D::State) -> Result<Vec<D::State>, AnalysisError>,
{
    fn are_abstract_successors(&self, state: &D::State, successors: &[&D::State]) -> Result<bool, AnalysisError> {
        let computed = (self.transfer)(state)?;

        let all_claimed = computed
            .iter()
            .all(|c| successors.iter().any(|s| self.domain.is_equal(c, s)));
        let all_computed = successors
            .iter()
            .all(|s| computed.iter().any(|c| self.domain.is_equal(c, s)));

        Ok(all_claimed && all_computed)
    }

    fn is_covered_by(&self, covered: &D::State, covering: &D::State) -> Result<bool, AnalysisError> {
        Ok(self.domain.is_less_or_equal(covered, covering))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::domain::tests::FlatDomain;

    fn double(x: &u8) -> Result<Vec<u8>, AnalysisError> {
        Ok(if *x < 100 { vec![x * 2, x * 2 + 1] } else { vec![] })
    }

    #[test]
    fn test_successors_match_in_any_order() {
        let oracle = DomainProofChecker::new(FlatDomain, double);
        assert!(oracle.are_abstract_successors(&3, &[&7, &6]).unwrap());
        assert!(oracle.are_abstract_successors(&200, &[]).unwrap());
    }

    #[test]
    fn test_successor_mismatch() {
        let oracle = DomainProofChecker::new(FlatDomain, double);
        // Missing one successor.
        assert!(!oracle.are_abstract_successors(&3, &[&6]).unwrap());
        // Extra successor.
        assert!(!oracle.are_abstract_successors(&3, &[&6, &7, &8]).unwrap());
        // Wrong successor.
        assert!(!oracle.are_abstract_successors(&3, &[&6, &9]).unwrap());
    }

    #[test]
    fn test_covering_uses_partial_order() {
        let oracle = DomainProofChecker::new(FlatDomain, double);
        assert!(oracle.is_covered_by(&4, &u8::MAX).unwrap());
        assert!(oracle.is_covered_by(&4, &4).unwrap());
        assert!(!oracle.is_covered_by(&4, &5).unwrap());
    }

    #[test]
    fn test_transfer_errors_propagate() {
        let oracle = DomainProofChecker::new(FlatDomain, |_: &u8| -> Result<Vec<u8>, AnalysisError> {
            Err(AnalysisError::Failed("solver crashed".to_string()))
        });
        assert!(oracle.are_abstract_successors(&1, &[]).is_err());
    }
}
