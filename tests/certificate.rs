//! Checking certificates over a composite interval domain.
//!
//! The analysed program is a counter `x` that is incremented up to 3 and may
//! be reset to 0 at any point; the second component is a constant mode flag.

use reach_rs::algorithm::AnalysisError;
use reach_rs::arg::{Arg, ArgBuilder, StateId};
use reach_rs::composite::{CompositeDomain, CompositeState};
use reach_rs::domain::{AbstractDomain, DomainError};
use reach_rs::pcc::{CertificateChecker, DomainProofChecker, Verdict, Violation};
use reach_rs::reached::{DefaultReachedSet, ReachedSet};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Interval {
    lo: i32,
    hi: i32,
}

fn iv(lo: i32, hi: i32) -> Interval {
    Interval { lo, hi }
}

struct IntervalDomain;

impl AbstractDomain for IntervalDomain {
    type State = Interval;

    fn is_less_or_equal(&self, a: &Interval, b: &Interval) -> bool {
        b.lo <= a.lo && a.hi <= b.hi
    }

    fn join(&self, a: &Interval, b: &Interval) -> Result<Interval, DomainError> {
        Ok(iv(a.lo.min(b.lo), a.hi.max(b.hi)))
    }
}

type State = CompositeState<Interval>;

fn state(x: Interval) -> State {
    CompositeState::new(vec![x, iv(0, 0)])
}

fn transfer(s: &State) -> Result<Vec<State>, AnalysisError> {
    let x = s.get(0).ok_or_else(|| AnalysisError::Failed("missing counter".to_string()))?;
    let step = state(iv(x.lo, (x.hi + 1).min(3)));
    let reset = state(iv(0, 0));
    Ok(vec![step, reset])
}

fn domain() -> CompositeDomain<Interval> {
    CompositeDomain::<Interval>::new(vec![Box::new(IntervalDomain), Box::new(IntervalDomain)])
}

/// Handles of the interesting states of [`certificate`].
struct States {
    reset_of_root: StateId,
    c: StateId,
    d: StateId,
}

/// root=[0,0] -> a=[0,1] -> b=[0,2] -> c=[0,3] -> d=[0,3], plus a reset
/// successor [0,0] of every state. `d` is covered by `d_covering`, the reset
/// successor of the root by `root_reset_covering` and all other resets by the
/// root.
fn certificate(
    a_claim: Interval,
    d_covering: impl Fn(&States, StateId) -> StateId,
    root_reset_covering: impl Fn(StateId, StateId) -> StateId,
) -> (Arg<State>, States) {
    let mut b = ArgBuilder::new(state(iv(0, 0)));
    let root = b.root();

    let a = b.add_child(root, state(a_claim));
    let reset_of_root = b.add_child(root, state(iv(0, 0)));
    let bb = b.add_child(a, state(iv(0, 2)));
    let reset_of_a = b.add_child(a, state(iv(0, 0)));
    let c = b.add_child(bb, state(iv(0, 3)));
    let reset_of_b = b.add_child(bb, state(iv(0, 0)));
    let d = b.add_child(c, state(iv(0, 3)));
    let reset_of_c = b.add_child(c, state(iv(0, 0)));

    for reset in [reset_of_a, reset_of_b, reset_of_c] {
        b.set_covered_by(reset, root);
    }
    b.set_covered_by(reset_of_root, root_reset_covering(root, c));

    let states = States { reset_of_root, c, d };
    b.set_covered_by(d, d_covering(&states, bb));
    (b.build(), states)
}

fn valid_certificate() -> (Arg<State>, States) {
    certificate(iv(0, 1), |s, _| s.c, |root, _| root)
}

#[test]
fn test_valid_certificate() {
    let (arg, _) = valid_certificate();
    let oracle = DomainProofChecker::new(domain(), transfer);

    let mut checker = CertificateChecker::new(&oracle);
    let mut reached = DefaultReachedSet::new();
    reached.add(arg.root(), "initial");
    let verdict = checker.check(&arg, &mut reached).unwrap();

    assert_eq!(verdict, Verdict::Valid);
    assert_eq!(reached.len(), arg.len());
    assert!(reached.iter().all(|(_, p)| *p == "initial"));
    assert_eq!(checker.statistics().passes, 1);
}

#[test]
fn test_wrong_successor_claim() {
    let (arg, _) = certificate(iv(0, 2), |s, _| s.c, |root, _| root);
    let oracle = DomainProofChecker::new(domain(), transfer);

    let verdict = CertificateChecker::new(&oracle).check_arg(&arg, ()).unwrap();
    assert_eq!(
        verdict,
        Verdict::Invalid(Violation::SuccessorMismatch { state: arg.root() })
    );
}

#[test]
fn test_covering_by_smaller_state() {
    // d = [0,3] is not subsumed by b = [0,2].
    let (arg, states) = certificate(iv(0, 1), |_, b| b, |root, _| root);
    let oracle = DomainProofChecker::new(domain(), transfer);

    let verdict = CertificateChecker::new(&oracle).check_arg(&arg, ()).unwrap();
    match verdict {
        Verdict::Invalid(Violation::NotCovered { state, .. }) => assert_eq!(state, states.d),
        other => panic!("unexpected verdict {:?}", other),
    }
}

#[test]
fn test_covering_by_state_explored_later() {
    // The reset successor of the root is looked at long before `c` exists.
    let (arg, _) = certificate(iv(0, 1), |s, _| s.c, |_, c| c);
    let oracle = DomainProofChecker::new(domain(), transfer);

    let mut checker = CertificateChecker::new(&oracle);
    let verdict = checker.check_arg(&arg, ()).unwrap();

    assert_eq!(verdict, Verdict::Valid);
    assert_eq!(checker.statistics().passes, 2);
}

#[test]
fn test_covering_cycle_is_rejected() {
    // The root reset is covered by c; additionally covering c by the root
    // reset closes a cycle.
    let (arg, states) = certificate(iv(0, 1), |s, _| s.c, |_, c| c);
    let mut b = ArgBuilder::new(arg.state(arg.root()).clone());
    let mut map = vec![b.root()];
    for id in arg.ids().skip(1) {
        map.push(b.add_state(arg.state(id).clone()));
    }
    for id in arg.ids() {
        for &child in arg.children(id) {
            b.add_edge(map[id.index()], map[child.index()]);
        }
        if let Some(covering) = arg.covered_by(id) {
            b.set_covered_by(map[id.index()], map[covering.index()]);
        }
    }
    b.set_covered_by(map[states.c.index()], map[states.reset_of_root.index()]);
    let cyclic = b.build();

    let oracle = DomainProofChecker::new(domain(), transfer);
    let verdict = CertificateChecker::new(&oracle).check_arg(&cyclic, ()).unwrap();
    assert!(matches!(verdict, Verdict::Invalid(Violation::CoveringCycle { .. })));
}

#[test]
fn test_property_violation() {
    let (arg, states) = valid_certificate();
    let oracle = DomainProofChecker::new(domain(), transfer);

    let below_three = |s: &State| s.get(0).map_or(false, |x| x.hi < 3);
    let verdict = CertificateChecker::new(&oracle)
        .with_property_checker(below_three)
        .check_arg(&arg, ())
        .unwrap();
    assert_eq!(
        verdict,
        Verdict::Invalid(Violation::PropertyViolated { state: states.c })
    );
}
