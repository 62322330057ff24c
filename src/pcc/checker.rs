use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use thiserror::Error;

use crate::algorithm::AnalysisError;
use crate::arg::{Arg, StateId};
use crate::pcc::oracle::ProofChecker;
use crate::pcc::property::PropertyChecker;
use crate::reached::{DefaultReachedSet, ReachedSet};
use crate::shutdown::{Interrupted, ShutdownNotifier};

/// Reason a certificate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("state {state} violates the property")]
    PropertyViolated { state: StateId },

    #[error("state {state} has other successors than claimed")]
    SuccessorMismatch { state: StateId },

    #[error("covering relation has a cycle through state {state}")]
    CoveringCycle { state: StateId },

    #[error("state {state} is not covered by {covering}")]
    NotCovered { state: StateId, covering: StateId },

    #[error("covering state {covering} of {state} was not found in the reached set")]
    MissingCoveringState { state: StateId, covering: StateId },

    #[error("state {state} has other parents than claimed")]
    ConflictingParents { state: StateId },

    #[error("states {states:?} are claimed successors but some of their parents were never explored")]
    UnexploredParents { states: Vec<StateId> },
}

/// Outcome of a completed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(Violation),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Verdict::Valid => None,
            Verdict::Invalid(v) => Some(v),
        }
    }
}

/// The checker itself could not reach a verdict.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error("proof checking oracle failed: {0}")]
    Oracle(AnalysisError),

    #[error("reached set must initially contain the root of the certificate")]
    EmptyReachedSet,

    #[error("reached set starts at {found}, but the certificate root is {expected}")]
    RootMismatch { expected: StateId, found: StateId },
}

impl From<AnalysisError> for CheckerError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Interrupted(i) => CheckerError::Interrupted(i),
            other => CheckerError::Oracle(other),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckerStatistics {
    pub iterations: usize,
    pub passes: usize,
    pub property_checking_time: Duration,
    pub covering_time: Duration,
    pub successor_time: Duration,
}

impl fmt::Display for CheckerStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of iterations:       {}", self.iterations)?;
        writeln!(f, "Number of passes:           {}", self.passes)?;
        writeln!(f, "Time for property checking: {:?}", self.property_checking_time)?;
        writeln!(f, "Time for covering checks:   {:?}", self.covering_time)?;
        write!(f, "Time for successor checks:  {:?}", self.successor_time)
    }
}

/// Bookkeeping of one check.
#[derive(Default)]
struct Run {
    /// Covered states whose covering state was not reached yet.
    postponed: BTreeSet<StateId>,
    /// Claimed successors some of whose parents are not yet processed.
    waiting_for_unexplored_parents: BTreeSet<StateId>,
    in_waitlist: HashSet<StateId>,
    /// Parents of every admitted state, as seen at admission.
    admitted_parents: HashMap<StateId, Vec<StateId>>,
}

/// Validates an abstract reachability graph against a [`ProofChecker`].
///
/// The graph is re-explored from its root, but instead of computing
/// successors the checker asks the oracle to confirm the claimed ones, and
/// instead of computing coverage it asks the oracle to confirm the claimed
/// covering. Covered states whose covering state is explored later are
/// postponed to a later pass; successors with a merge of several parents
/// are only admitted once all of their parents were processed.
pub struct CertificateChecker<'a, S> {
    oracle: &'a dyn ProofChecker<S>,
    property: Box<dyn PropertyChecker<S> + 'a>,
    shutdown: ShutdownNotifier,
    stats: CheckerStatistics,
}

impl<'a, S> CertificateChecker<'a, S> {
    /// Checker that accepts every state as far as the property is concerned.
    pub fn new(oracle: &'a dyn ProofChecker<S>) -> Self {
        Self {
            oracle,
            property: Box::new(|_: &S| true),
            shutdown: ShutdownNotifier::never(),
            stats: CheckerStatistics::default(),
        }
    }

    pub fn with_property_checker(mut self, property: impl PropertyChecker<S> + 'a) -> Self {
        self.property = Box::new(property);
        self
    }

    pub fn with_shutdown_notifier(mut self, shutdown: ShutdownNotifier) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Statistics of the last check.
    pub fn statistics(&self) -> &CheckerStatistics {
        &self.stats
    }

    /// Check `arg` starting from a fresh reached set holding its root.
    pub fn check_arg<P: Clone>(&mut self, arg: &Arg<S>, initial_precision: P) -> Result<Verdict, CheckerError> {
        let mut reached = DefaultReachedSet::new();
        reached.add(arg.root(), initial_precision);
        self.check(arg, &mut reached)
    }

    /// Check `arg`; `reached` must contain exactly the root, waiting.
    ///
    /// On return `reached` holds every state that was admitted.
    pub fn check<R, P>(&mut self, arg: &Arg<S>, reached: &mut R) -> Result<Verdict, CheckerError>
    where
        R: ReachedSet<State = StateId, Precision = P>,
        P: Clone,
    {
        self.stats = CheckerStatistics::default();

        let root = *reached.first_state().ok_or(CheckerError::EmptyReachedSet)?;
        if root != arg.root() {
            return Err(CheckerError::RootMismatch {
                expected: arg.root(),
                found: root,
            });
        }
        let precision = reached.precision(&root).cloned().ok_or(CheckerError::EmptyReachedSet)?;

        let mut run = Run::default();
        run.in_waitlist.insert(root);
        run.admitted_parents.insert(root, Vec::new());

        let verdict = self.run(arg, reached, &precision, &mut run)?;
        debug!("Certificate check finished: {:?}\n{}", verdict, self.stats);
        Ok(verdict)
    }

    fn run<R, P>(
        &mut self,
        arg: &Arg<S>,
        reached: &mut R,
        precision: &P,
        run: &mut Run,
    ) -> Result<Verdict, CheckerError>
    where
        R: ReachedSet<State = StateId, Precision = P>,
        P: Clone,
    {
        loop {
            self.stats.passes += 1;

            // Covering states of postponed states cannot appear anymore once the
            // waitlist ran dry, so a missing one is final.
            for state in std::mem::take(&mut run.postponed) {
                let Some(covering) = arg.covered_by(state) else {
                    continue;
                };
                if !reached.contains(&covering) {
                    warn!("Covering state {} was not found in reached set", covering);
                    return Ok(Verdict::Invalid(Violation::MissingCoveringState { state, covering }));
                }
                reached.re_add_to_waitlist(state);
            }

            while let Some(state) = reached.pop_from_waitlist() {
                self.shutdown.shutdown_if_necessary()?;

                self.stats.iterations += 1;
                run.in_waitlist.remove(&state);

                debug!("Looking at state {}", state);

                let start = Instant::now();
                let satisfied = self.property.satisfies_property(arg.state(state));
                self.stats.property_checking_time += start.elapsed();
                if !satisfied {
                    warn!("State {} violates the property", state);
                    return Ok(Verdict::Invalid(Violation::PropertyViolated { state }));
                }

                if let Some(covering) = arg.covered_by(state) {
                    trace!("State {} is covered by {}; checking coverage", state, covering);

                    if !reached.contains(&covering) {
                        run.postponed.insert(state);
                        continue;
                    }

                    let start = Instant::now();
                    if !arg.is_covering_cycle_free(state) {
                        self.stats.covering_time += start.elapsed();
                        warn!("Found cycle in covering relation for state {}", state);
                        return Ok(Verdict::Invalid(Violation::CoveringCycle { state }));
                    }
                    let covered = self.oracle.is_covered_by(arg.state(state), arg.state(covering));
                    self.stats.covering_time += start.elapsed();
                    if !covered? {
                        warn!("State {} is not covered by {}", state, covering);
                        return Ok(Verdict::Invalid(Violation::NotCovered { state, covering }));
                    }
                } else if let Some(violation) = self.check_successors(arg, reached, precision, run, state)? {
                    return Ok(Verdict::Invalid(violation));
                }
            }

            if run.postponed.is_empty() {
                break;
            }
        }

        if run.waiting_for_unexplored_parents.is_empty() {
            Ok(Verdict::Valid)
        } else {
            let states: Vec<_> = run.waiting_for_unexplored_parents.iter().copied().collect();
            warn!("States {:?} still wait for unexplored parents", states);
            Ok(Verdict::Invalid(Violation::UnexploredParents { states }))
        }
    }

    fn check_successors<R, P>(
        &mut self,
        arg: &Arg<S>,
        reached: &mut R,
        precision: &P,
        run: &mut Run,
        state: StateId,
    ) -> Result<Option<Violation>, CheckerError>
    where
        R: ReachedSet<State = StateId, Precision = P>,
        P: Clone,
    {
        let successors = arg.children(state);
        trace!("Checking abstract successors {:?}", successors);

        let start = Instant::now();
        let claimed: Vec<&S> = successors.iter().map(|&e| arg.state(e)).collect();
        let confirmed = self.oracle.are_abstract_successors(arg.state(state), &claimed);
        self.stats.successor_time += start.elapsed();
        if !confirmed? {
            warn!("State {} has other successors than {:?}", state, successors);
            return Ok(Some(Violation::SuccessorMismatch { state }));
        }

        for &e in successors {
            let parents = arg.parents(e);
            if !parents.contains(&state) {
                warn!("State {} does not list {} among its parents {:?}", e, state, parents);
                return Ok(Some(Violation::ConflictingParents { state: e }));
            }

            let unexplored_parent = parents
                .iter()
                .any(|p| !reached.contains(p) || run.in_waitlist.contains(p));
            if unexplored_parent {
                run.waiting_for_unexplored_parents.insert(e);
                continue;
            }

            if reached.contains(&e) {
                if run.admitted_parents.get(&e).map(Vec::as_slice) != Some(parents) {
                    warn!("State {} has other parents than {:?}", e, parents);
                    return Ok(Some(Violation::ConflictingParents { state: e }));
                }
                continue;
            }

            run.waiting_for_unexplored_parents.remove(&e);
            reached.add(e, precision.clone());
            run.in_waitlist.insert(e);
            run.admitted_parents.insert(e, parents.to_vec());
        }

        Ok(None)
    }
}
