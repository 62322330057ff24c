//! Analysis algorithms driving a reached set.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::DomainError;
use crate::shutdown::Interrupted;

/// Quality of an analysis result.
///
/// `sound` means no proof obligation was skipped; `precise` means no
/// over-approximation was introduced that could mask a real violation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AlgorithmStatus {
    sound: bool,
    precise: bool,
}

impl AlgorithmStatus {
    pub const SOUND_AND_PRECISE: Self = Self::new(true, true);
    pub const UNSOUND_AND_PRECISE: Self = Self::new(false, true);
    pub const SOUND_AND_IMPRECISE: Self = Self::new(true, false);
    pub const UNSOUND_AND_IMPRECISE: Self = Self::new(false, false);

    pub const fn new(sound: bool, precise: bool) -> Self {
        Self { sound, precise }
    }

    pub fn is_sound(self) -> bool {
        self.sound
    }

    pub fn is_precise(self) -> bool {
        self.precise
    }

    /// Conjunction of both flags, for combining results of sub-algorithms.
    pub fn update(self, other: Self) -> Self {
        Self::new(self.sound && other.sound, self.precise && other.precise)
    }

    pub fn with_sound(self, sound: bool) -> Self {
        Self::new(sound, self.precise)
    }

    pub fn with_precise(self, precise: bool) -> Self {
        Self::new(self.sound, precise)
    }
}

impl fmt::Display for AlgorithmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} and {}",
            if self.sound { "sound" } else { "unsound" },
            if self.precise { "precise" } else { "imprecise" }
        )
    }
}

/// Failures of a single analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The analysis noticed a shutdown request and stopped.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Building the domain or algorithm failed.
    #[error("could not create analysis components: {0}")]
    Construction(String),

    /// Any other internal failure of the analysis.
    #[error("{0}")]
    Failed(String),
}

/// An analysis algorithm: grows a reached set to a fixpoint (or gives up).
pub trait Algorithm<R>: Send {
    fn run(&mut self, reached: &mut R) -> Result<AlgorithmStatus, AnalysisError>;
}

impl<R, A> Algorithm<R> for Box<A>
where
    A: Algorithm<R> + ?Sized,
{
    fn run(&mut self, reached: &mut R) -> Result<AlgorithmStatus, AnalysisError> {
        (**self).run(reached)
    }
}
