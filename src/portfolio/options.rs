use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{ConfigError, Configuration};

/// Comma-separated list of configuration references, one per instance.
pub const CONFIG_FILES_OPTION: &str = "parallelAlgorithm.configFiles";
/// Seconds between two checks of the worker threads.
pub const POLL_INTERVAL_OPTION: &str = "parallelAlgorithm.pollInterval";
/// Cleared in instance configurations so that they do not recurse.
pub const USE_PARALLEL_ANALYSES_OPTION: &str = "analysis.useParallelAnalyses";
/// Re-applied from the base configuration after loading an override file.
pub const SPECIFICATION_OPTION: &str = "specification";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

const TAG_SEPARATOR: &str = "::";
const REACHED_SET_SUPPLIER_TAG: &str = "reached-inv-sup";
const CPA_SUPPLIER_TAG: &str = "cpa-inv-sup";

/// How an instance takes part in invariant sharing.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum InvariantRole {
    #[default]
    None,
    /// Publish invariants derived from the instance's reached set.
    ReachedSetSupplier,
    /// Accepted for compatibility; the instance runs unwrapped.
    CpaSupplier,
}

impl InvariantRole {
    fn tag(self) -> Option<&'static str> {
        match self {
            InvariantRole::None => None,
            InvariantRole::ReachedSetSupplier => Some(REACHED_SET_SUPPLIER_TAG),
            InvariantRole::CpaSupplier => Some(CPA_SUPPLIER_TAG),
        }
    }
}

/// `path` or `path::tag`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConfigReference {
    pub path: PathBuf,
    pub role: InvariantRole,
}

impl FromStr for ConfigReference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidReference {
            reference: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split(TAG_SEPARATOR).map(str::trim).collect();
        let (path, role) = match parts.as_slice() {
            [path] => (*path, InvariantRole::None),
            [path, tag] if *tag == REACHED_SET_SUPPLIER_TAG => (*path, InvariantRole::ReachedSetSupplier),
            [path, tag] if *tag == CPA_SUPPLIER_TAG => (*path, InvariantRole::CpaSupplier),
            [_, tag] => return Err(invalid(&format!("unknown tag `{}`", tag))),
            _ => return Err(invalid("more than one `::` separator")),
        };
        if path.is_empty() {
            return Err(invalid("empty path"));
        }

        Ok(Self {
            path: PathBuf::from(path),
            role,
        })
    }
}

impl fmt::Display for ConfigReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(tag) = self.role.tag() {
            write!(f, "{}{}", TAG_SEPARATOR, tag)?;
        }
        Ok(())
    }
}

/// Options of the parallel algorithm itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioOptions {
    /// Raw references; each is parsed when its instance is built, so that a
    /// malformed one only disables that instance.
    pub references: Vec<String>,
    pub poll_interval: Duration,
}

impl PortfolioOptions {
    pub fn from_configuration(config: &Configuration) -> Result<Self, ConfigError> {
        let references = config.get_list(CONFIG_FILES_OPTION);
        if references.is_empty() {
            return Err(ConfigError::MissingOption {
                key: CONFIG_FILES_OPTION.to_string(),
            });
        }

        let poll_interval = match config.get_parsed::<f64>(POLL_INTERVAL_OPTION)? {
            None => DEFAULT_POLL_INTERVAL,
            Some(seconds) if seconds.is_finite() && seconds > 0.0 => Duration::from_secs_f64(seconds),
            Some(seconds) => {
                return Err(ConfigError::InvalidValue {
                    key: POLL_INTERVAL_OPTION.to_string(),
                    value: seconds.to_string(),
                    reason: "must be a positive number of seconds".to_string(),
                })
            }
        };

        Ok(Self {
            references,
            poll_interval,
        })
    }
}
