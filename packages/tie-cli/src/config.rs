//! Token file for the `tie` command.
//!
//! A small TOML file, `~/.tie.toml` by default, falling back to `~/.gotie`
//! when only that one exists:
//!
//! ```toml
//! tie_token = "..."
//! pingback_token = "..."   # optional
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tie_client::ClientConfig;

pub const DEFAULT_FILE_NAME: &str = ".tie.toml";

/// File name used by earlier releases; same keys, same format.
pub const LEGACY_FILE_NAME: &str = ".gotie";

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TokenFile {
    pub tie_token: String,
    pub pingback_token: Option<String>,
}

impl TokenFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Client configuration for queries. Requires `tie_token`.
    pub fn client_config(&self) -> Result<ClientConfig> {
        if self.tie_token.is_empty() {
            bail!("tie_token is missing from the configuration file");
        }

        let mut config = ClientConfig::new(&self.tie_token);
        if let Some(token) = self.pingback_token.as_deref().filter(|t| !t.is_empty()) {
            config = config.with_pingback_token(token);
        }
        Ok(config)
    }
}

/// `~/.tie.toml`, or `~/.gotie` when only the legacy file exists.
///
/// Falls back to `.tie.toml` in the working directory when no home
/// directory is known.
pub fn default_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => path_in(&home),
        None => PathBuf::from(DEFAULT_FILE_NAME),
    }
}

fn path_in(dir: &Path) -> PathBuf {
    let preferred = dir.join(DEFAULT_FILE_NAME);
    let legacy = dir.join(LEGACY_FILE_NAME);

    if !preferred.exists() && legacy.exists() {
        tracing::debug!(path = %legacy.display(), "Using legacy configuration file");
        return legacy;
    }
    preferred
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_token_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tie_token = \"abc\"\npingback_token = \"def\"").unwrap();

        let tokens = TokenFile::load(file.path()).unwrap();
        assert_eq!(tokens.tie_token, "abc");
        assert_eq!(tokens.pingback_token.as_deref(), Some("def"));

        let config = tokens.client_config().unwrap();
        assert_eq!(config.auth_token, "abc");
        assert_eq!(config.pingback_token.as_deref(), Some("def"));
    }

    #[test]
    fn test_missing_tie_token_rejected() {
        let tokens: TokenFile = toml::from_str("pingback_token = \"def\"").unwrap();
        assert!(tokens.client_config().is_err());
    }

    #[test]
    fn test_empty_pingback_token_ignored() {
        let tokens: TokenFile = toml::from_str("tie_token = \"abc\"\npingback_token = \"\"").unwrap();
        assert_eq!(tokens.client_config().unwrap().pingback_token, None);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = TokenFile::load(Path::new("/nonexistent/.tie.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/.tie.toml"));
    }

    #[test]
    fn test_default_path_file_name() {
        let path = default_path();
        assert!(path.ends_with(DEFAULT_FILE_NAME) || path.ends_with(LEGACY_FILE_NAME));
    }

    #[test]
    fn test_legacy_file_used_when_preferred_missing() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(path_in(home.path()), home.path().join(DEFAULT_FILE_NAME));

        std::fs::write(home.path().join(LEGACY_FILE_NAME), "tie_token = \"old\"\n").unwrap();
        let path = path_in(home.path());
        assert_eq!(path, home.path().join(LEGACY_FILE_NAME));
        assert_eq!(TokenFile::load(&path).unwrap().tie_token, "old");

        std::fs::write(home.path().join(DEFAULT_FILE_NAME), "tie_token = \"new\"\n").unwrap();
        assert_eq!(path_in(home.path()), home.path().join(DEFAULT_FILE_NAME));
    }
}
