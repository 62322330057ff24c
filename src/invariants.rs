//! Invariant suppliers and their aggregation across concurrent analyses.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::algorithm::{Algorithm, AlgorithmStatus, AnalysisError};

/// Program location, as provided by the control-flow automaton.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Location(pub u32);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Formula-like values invariants are expressed in.
pub trait Formula: Clone + Send + Sync + 'static {
    /// The trivially true formula.
    fn tautology() -> Self;

    /// Check if the formula is recognizably trivially true.
    fn is_tautology(&self) -> bool;

    /// Logical conjunction.
    fn and(&self, other: &Self) -> Self;
}

/// Conjunction of atoms, the empty conjunction being `true`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conjunction<A: Ord> {
    atoms: BTreeSet<A>,
}

impl<A: Ord> Conjunction<A> {
    pub fn atom(atom: A) -> Self {
        Self {
            atoms: BTreeSet::from([atom]),
        }
    }

    pub fn atoms(&self) -> impl Iterator<Item = &A> {
        self.atoms.iter()
    }

    pub fn implies(&self, other: &Self) -> bool {
        other.atoms.is_subset(&self.atoms)
    }
}

impl<A: Ord> FromIterator<A> for Conjunction<A> {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self {
            atoms: iter.into_iter().collect(),
        }
    }
}

impl<A> Formula for Conjunction<A>
where
    A: Ord + Clone + Send + Sync + 'static,
{
    fn tautology() -> Self {
        Self {
            atoms: BTreeSet::new(),
        }
    }

    fn is_tautology(&self) -> bool {
        self.atoms.is_empty()
    }

    fn and(&self, other: &Self) -> Self {
        Self {
            atoms: self.atoms.union(&other.atoms).cloned().collect(),
        }
    }
}

impl<A: Ord + fmt::Display> fmt::Display for Conjunction<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.atoms.is_empty() {
            return write!(f, "true");
        }
        for (i, a) in self.atoms.iter().enumerate() {
            if i > 0 {
                write!(f, " && ")?;
            }
            write!(f, "{}", a)?;
        }
        Ok(())
    }
}

/// Source of invariants (facts that hold whenever a location is reached).
pub trait InvariantSupplier<F>: Send + Sync {
    fn invariant_for(&self, location: Location, context: &F) -> F;
}

/// Supplier that knows nothing: always `true`.
#[derive(Debug, Copy, Clone, Default)]
pub struct TrivialInvariantSupplier;

impl<F: Formula> InvariantSupplier<F> for TrivialInvariantSupplier {
    fn invariant_for(&self, _location: Location, _context: &F) -> F {
        F::tautology()
    }
}

impl<F, T> InvariantSupplier<F> for T
where
    T: Fn(Location, &F) -> F + Send + Sync,
{
    fn invariant_for(&self, location: Location, context: &F) -> F {
        self(location, context)
    }
}

/// Capability of analyses that can make use of externally supplied invariants.
pub trait InvariantsConsumer<F>: Send + Sync {
    fn set_invariant_supplier(&self, supplier: Arc<dyn InvariantSupplier<F>>);
}

/// Combination of all registered suppliers.
///
/// Suppliers may be registered from any thread while other threads query;
/// a query sees the suppliers registered before it took its snapshot.
pub struct InvariantsAggregator<F> {
    suppliers: RwLock<Vec<Arc<dyn InvariantSupplier<F>>>>,
}

impl<F: Formula> InvariantsAggregator<F> {
    pub fn new() -> Self {
        Self {
            suppliers: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, supplier: Arc<dyn InvariantSupplier<F>>) {
        let mut suppliers = self.suppliers.write();
        suppliers.push(supplier);
        debug!("Registered invariant supplier #{}", suppliers.len());
    }

    pub fn len(&self) -> usize {
        self.suppliers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F: Formula> Default for InvariantsAggregator<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for InvariantsAggregator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvariantsAggregator")
            .field("suppliers", &self.suppliers.read().len())
            .finish()
    }
}

impl<F: Formula> InvariantSupplier<F> for InvariantsAggregator<F> {
    /// Conjunction of all suppliers' invariants, dropping trivially true operands.
    fn invariant_for(&self, location: Location, context: &F) -> F {
        // Suppliers are queried outside the lock so registration is never blocked by them.
        let snapshot: Vec<_> = self.suppliers.read().iter().cloned().collect();

        snapshot
            .iter()
            .map(|s| s.invariant_for(location, context))
            .fold(F::tautology(), |a, b| {
                if a.is_tautology() {
                    b
                } else if b.is_tautology() {
                    a
                } else {
                    a.and(&b)
                }
            })
    }
}

/// Slot holding the most recently published invariants of one analysis.
pub struct PublishedInvariants<F> {
    current: RwLock<Arc<dyn InvariantSupplier<F>>>,
}

impl<F: Formula> PublishedInvariants<F> {
    /// Empty slot, answering `true` until something is published.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(TrivialInvariantSupplier)),
        }
    }

    pub fn publish(&self, supplier: Arc<dyn InvariantSupplier<F>>) {
        *self.current.write() = supplier;
    }
}

impl<F: Formula> Default for PublishedInvariants<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Formula> InvariantSupplier<F> for PublishedInvariants<F> {
    fn invariant_for(&self, location: Location, context: &F) -> F {
        let current = Arc::clone(&self.current.read());
        current.invariant_for(location, context)
    }
}

/// Derives an invariant view from a finished reached set.
pub type InvariantDerivation<R, F> = Arc<dyn Fn(&R) -> Arc<dyn InvariantSupplier<F>> + Send + Sync>;

/// Wraps an algorithm so that every completed run publishes invariants
/// derived from the resulting reached set.
pub struct ReachedSetInvariantGeneration<R, F> {
    algorithm: Box<dyn Algorithm<R>>,
    derive: InvariantDerivation<R, F>,
    published: Arc<PublishedInvariants<F>>,
}

impl<R, F: Formula> ReachedSetInvariantGeneration<R, F> {
    pub fn new(algorithm: Box<dyn Algorithm<R>>, derive: InvariantDerivation<R, F>) -> Self {
        Self {
            algorithm,
            derive,
            published: Arc::new(PublishedInvariants::new()),
        }
    }

    /// The slot this wrapper publishes into, to be registered with an aggregator.
    pub fn published(&self) -> Arc<PublishedInvariants<F>> {
        Arc::clone(&self.published)
    }
}

impl<R, F: Formula> Algorithm<R> for ReachedSetInvariantGeneration<R, F> {
    fn run(&mut self, reached: &mut R) -> Result<AlgorithmStatus, AnalysisError> {
        let status = self.algorithm.run(reached)?;
        self.published.publish((self.derive)(reached));
        debug!("Published invariants of a {} run", status);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use test_log::test;

    use super::*;

    type F = Conjunction<&'static str>;

    fn constant(f: F) -> Arc<dyn InvariantSupplier<F>> {
        Arc::new(move |_: Location, _: &F| f.clone())
    }

    #[test]
    fn test_empty_aggregator_is_true() {
        let aggregator = InvariantsAggregator::<F>::new();
        let inv = aggregator.invariant_for(Location(1), &F::tautology());
        assert!(inv.is_tautology());
        assert!(aggregator.is_empty());
    }

    #[test]
    fn test_trivial_operand_is_dropped() {
        let aggregator = InvariantsAggregator::<F>::new();
        aggregator.register(constant(F::tautology()));
        aggregator.register(constant(F::atom("x > 0")));

        let inv = aggregator.invariant_for(Location(1), &F::tautology());
        assert_eq!(inv, F::atom("x > 0"));
    }

    #[test]
    fn test_conjunction_of_suppliers() {
        let aggregator = InvariantsAggregator::<F>::new();
        aggregator.register(constant(F::atom("x > 0")));
        aggregator.register(Arc::new(TrivialInvariantSupplier));
        aggregator.register(constant(F::atom("y < 5")));

        let inv = aggregator.invariant_for(Location(3), &F::tautology());
        assert_eq!(inv, ["x > 0", "y < 5"].into_iter().collect::<F>());
        assert_eq!(inv.to_string(), "x > 0 && y < 5");
    }

    #[test]
    fn test_location_sensitive_supplier() {
        let aggregator = InvariantsAggregator::<F>::new();
        aggregator.register(Arc::new(|loc: Location, _: &F| {
            if loc == Location(2) {
                F::atom("i <= n")
            } else {
                F::tautology()
            }
        }));

        assert_eq!(aggregator.invariant_for(Location(2), &F::tautology()), F::atom("i <= n"));
        assert!(aggregator.invariant_for(Location(1), &F::tautology()).is_tautology());
    }

    #[test]
    fn test_concurrent_register_and_query() {
        let aggregator = Arc::new(InvariantsAggregator::<F>::new());

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                thread::spawn(move || {
                    for _ in 0..50 {
                        aggregator.register(constant(F::atom("x >= 0")));
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let inv = aggregator.invariant_for(Location(0), &F::tautology());
                        assert!(inv.is_tautology() || inv == F::atom("x >= 0"));
                    }
                })
            })
            .collect();

        for h in writers.into_iter().chain(readers) {
            h.join().unwrap();
        }
        assert_eq!(aggregator.len(), 200);
    }

    struct Counting;

    impl Algorithm<Vec<u32>> for Counting {
        fn run(&mut self, reached: &mut Vec<u32>) -> Result<AlgorithmStatus, AnalysisError> {
            reached.push(reached.len() as u32);
            Ok(AlgorithmStatus::UNSOUND_AND_PRECISE)
        }
    }

    #[test]
    fn test_generation_publishes_after_run() {
        let derive: InvariantDerivation<Vec<u32>, Conjunction<u32>> = Arc::new(|reached: &Vec<u32>| {
            let f: Conjunction<u32> = reached.iter().copied().collect();
            Arc::new(move |_: Location, _: &Conjunction<u32>| f.clone())
                as Arc<dyn InvariantSupplier<Conjunction<u32>>>
        });
        let mut generation = ReachedSetInvariantGeneration::new(Box::new(Counting), derive);
        let published = generation.published();

        assert!(published
            .invariant_for(Location(0), &Conjunction::tautology())
            .is_tautology());

        let mut reached = Vec::new();
        let status = generation.run(&mut reached).unwrap();
        assert_eq!(status, AlgorithmStatus::UNSOUND_AND_PRECISE);
        assert_eq!(
            published.invariant_for(Location(0), &Conjunction::tautology()),
            Conjunction::atom(0)
        );

        generation.run(&mut reached).unwrap();
        assert_eq!(
            published.invariant_for(Location(0), &Conjunction::tautology()),
            [0, 1].into_iter().collect::<Conjunction<u32>>()
        );
    }
}
