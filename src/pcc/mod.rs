//! Proof-carrying code: validating certificates produced by an analysis.

mod checker;
mod oracle;
mod property;

pub use checker::{CertificateChecker, CheckerError, CheckerStatistics, Verdict, Violation};
pub use oracle::{DomainProofChecker, ProofChecker};
pub use property::{
    InIntervalChecker, IntervalBound, IntervalState, NoTargetStateChecker, PropertyChecker, Targetable,
};
