//! # reach-rs: configurable, parallel and certifiable reachability analysis
//!
//! **`reach-rs`** is the core of a software model checker that explores abstract state spaces.
//! It does not ship concrete abstract domains or transfer functions; instead it provides the
//! machinery around them:
//!
//! - **Composite domains**: combining independent sub-domains into one lattice ([`composite`]).
//! - **Certificate checking**: re-validating an abstract reachability graph produced by an earlier
//!   analysis, using only a covering oracle and a successor oracle ([`pcc`]).
//! - **Parallel portfolios**: racing several configured analyses, letting the first sound and
//!   precise one win, and sharing invariants between them while they run ([`portfolio`]).
//!
//! ## Checking a certificate
//!
//! ```rust
//! use reach_rs::arg::ArgBuilder;
//! use reach_rs::domain::{AbstractDomain, DomainError};
//! use reach_rs::pcc::{CertificateChecker, DomainProofChecker};
//!
//! // Counter values, ordered by equality only.
//! struct Exact;
//!
//! impl AbstractDomain for Exact {
//!     type State = u32;
//!
//!     fn is_less_or_equal(&self, a: &u32, b: &u32) -> bool {
//!         a == b
//!     }
//!
//!     fn join(&self, _: &u32, _: &u32) -> Result<u32, DomainError> {
//!         Err(DomainError::UnsupportedJoin { domain: "Exact" })
//!     }
//! }
//!
//! // A counter modulo 3: 0 -> 1 -> 2 -> 0.
//! let oracle = DomainProofChecker::new(Exact, |n: &u32| Ok(vec![(n + 1) % 3]));
//!
//! // The claimed graph: 0 -> 1 -> 2 -> 0', where 0' is covered by the root.
//! let mut builder = ArgBuilder::new(0);
//! let one = builder.add_child(builder.root(), 1);
//! let two = builder.add_child(one, 2);
//! let again = builder.add_child(two, 0);
//! builder.set_covered_by(again, builder.root());
//! let arg = builder.build();
//!
//! let verdict = CertificateChecker::new(&oracle).check_arg(&arg, ()).unwrap();
//! assert!(verdict.is_valid());
//! ```
//!
//! ## Core Components
//!
//! - **[`domain`]** and **[`composite`]**: the abstract-domain contract and its composite.
//! - **[`reached`]** and **[`arg`]**: reached sets with a waitlist, and reachability graphs.
//! - **[`algorithm`]**: the analysis interface and result status.
//! - **[`pcc`]**: the certificate checker.
//! - **[`portfolio`]** and **[`invariants`]**: the parallel portfolio and invariant sharing.
//! - **[`config`]**, **[`shutdown`]** and **[`limits`]**: configuration, cancellation and resource limits.

pub mod algorithm;
pub mod arg;
pub mod composite;
pub mod config;
pub mod domain;
pub mod invariants;
pub mod limits;
pub mod pcc;
pub mod portfolio;
pub mod reached;
pub mod shutdown;
