//! String-keyed analysis configuration.
//!
//! Options are dotted keys mapped to raw string values
//! (`parallelAlgorithm.configFiles = a.properties, b.properties`). A
//! [`Configuration`] is immutable; derived configurations are assembled with
//! a [`ConfigurationBuilder`].
//!
//! Override files use one `key = value` pair per line. Blank lines and lines
//! starting with `#` or `//` are ignored, `[prefix]` opens a section whose
//! keys are prefixed with `prefix.`, and `#include path` pulls in another
//! file (relative to the including one).

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::trace;
use thiserror::Error;

const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{origin}:{line}: malformed line `{content}`")]
    Malformed {
        origin: String,
        line: usize,
        content: String,
    },

    #[error("include depth exceeded while reading {path}")]
    IncludeDepth { path: PathBuf },

    #[error("invalid value `{value}` for option {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("required option {key} is missing")]
    MissingOption { key: String },

    #[error("{reference} is not a valid configuration reference: {reason}")]
    InvalidReference { reference: String, reason: String },
}

/// Immutable set of options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    options: BTreeMap<String, String>,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Parse an option value, `Ok(None)` if it is absent.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Split a comma-separated option into trimmed, non-empty items.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigurationBuilder {
    options: BTreeMap<String, String>,
}

impl ConfigurationBuilder {
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Copy every option of `config`, overwriting existing values.
    pub fn copy_from(&mut self, config: &Configuration) -> &mut Self {
        for (k, v) in &config.options {
            self.options.insert(k.clone(), v.clone());
        }
        self
    }

    /// Copy a single option of `config`, if present.
    pub fn copy_option_from(&mut self, config: &Configuration, key: &str) -> &mut Self {
        if let Some(value) = config.get(key) {
            self.options.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn clear_option(&mut self, key: &str) -> &mut Self {
        self.options.remove(key);
        self
    }

    /// Load options from a file, overwriting existing values.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, ConfigError> {
        self.load_file(path.as_ref(), 0)?;
        Ok(self)
    }

    /// Load options from text; `origin` only names the source in errors.
    /// `#include` directives are not allowed here.
    pub fn load_from_str(&mut self, origin: &str, text: &str) -> Result<&mut Self, ConfigError> {
        self.load_text(origin, text, None, 0)?;
        Ok(self)
    }

    pub fn build(&self) -> Configuration {
        Configuration {
            options: self.options.clone(),
        }
    }

    fn load_file(&mut self, path: &Path, depth: usize) -> Result<(), ConfigError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(ConfigError::IncludeDepth {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();
        self.load_text(&origin, &text, path.parent(), depth)
    }

    fn load_text(
        &mut self,
        origin: &str,
        text: &str,
        base_dir: Option<&Path>,
        depth: usize,
    ) -> Result<(), ConfigError> {
        let malformed = |line: usize, content: &str| ConfigError::Malformed {
            origin: origin.to_string(),
            line,
            content: content.to_string(),
        };

        let mut prefix = String::new();
        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();

            if let Some(include) = line.strip_prefix("#include") {
                let include = include.trim();
                let Some(dir) = base_dir else {
                    return Err(malformed(line_no, raw));
                };
                if include.is_empty() {
                    return Err(malformed(line_no, raw));
                }
                self.load_file(&dir.join(include), depth + 1)?;
                continue;
            }
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            if let Some(section) = line.strip_prefix('[') {
                let section = section.strip_suffix(']').ok_or_else(|| malformed(line_no, raw))?;
                prefix = section.trim().to_string();
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| malformed(line_no, raw))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed(line_no, raw));
            }
            let key = if prefix.is_empty() {
                key.to_string()
            } else {
                format!("{}.{}", prefix, key)
            };
            trace!("{}: {} = {}", origin, key, value.trim());
            self.options.insert(key, value.trim().to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use test_log::test;

    use super::*;

    #[test]
    fn test_load_from_str() {
        let text = "
            # comment
            // another comment
            analysis.traversal = bfs
            specification=  reach.spc

            [cpa]
            precision = 3
        ";
        let config = Configuration::builder()
            .load_from_str("inline", text)
            .unwrap()
            .build();

        assert_eq!(config.len(), 3);
        assert_eq!(config.get("analysis.traversal"), Some("bfs"));
        assert_eq!(config.get("specification"), Some("reach.spc"));
        assert_eq!(config.get_parsed::<u32>("cpa.precision").unwrap(), Some(3));
    }

    #[test]
    fn test_malformed_line() {
        let err = Configuration::builder()
            .load_from_str("inline", "a = 1\nnot an option\n")
            .unwrap_err();
        match err {
            ConfigError::Malformed { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "not an option");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_builder_copy_and_clear() {
        let base = Configuration::builder()
            .set_option("a", "1")
            .set_option("b", "2")
            .set_option("specification", "spec")
            .build();

        let derived = Configuration::builder()
            .copy_from(&base)
            .clear_option("a")
            .set_option("specification", "other")
            .copy_option_from(&base, "specification")
            .copy_option_from(&base, "missing")
            .build();

        assert!(!derived.has_property("a"));
        assert_eq!(derived.get("b"), Some("2"));
        assert_eq!(derived.get("specification"), Some("spec"));
        assert!(!derived.has_property("missing"));
        // The base is untouched.
        assert_eq!(base.get("a"), Some("1"));
    }

    #[test]
    fn test_get_list_and_parse_errors() {
        let config = Configuration::builder()
            .set_option("files", " a.properties, ,b.properties ")
            .set_option("interval", "soon")
            .build();

        assert_eq!(config.get_list("files"), vec!["a.properties", "b.properties"]);
        assert!(config.get_list("nothing").is_empty());
        assert!(matches!(
            config.get_parsed::<u64>("interval"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(config.get_parsed::<u64>("absent").unwrap(), None);
    }

    #[test]
    fn test_load_from_file_with_include() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("common.properties"), "shared = yes\nvalue = common\n").unwrap();
        fs::write(
            dir.join("main.properties"),
            "#include common.properties\nvalue = main\n",
        )
        .unwrap();

        let config = Configuration::builder()
            .load_from_file(dir.join("main.properties"))
            .unwrap()
            .build();

        assert_eq!(config.get("shared"), Some("yes"));
        assert_eq!(config.get("value"), Some("main"));
    }

    #[test]
    fn test_missing_file() {
        let err = Configuration::builder()
            .load_from_file("/nonexistent/reach-rs/missing.properties")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_include_cycle() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("loop.properties"), "#include loop.properties\n").unwrap();
        let err = Configuration::builder()
            .load_from_file(dir.join("loop.properties"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::IncludeDepth { .. }));
    }
}
