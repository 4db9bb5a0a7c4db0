//! Environment variable loading
//!
//! Values are read under a common prefix, parsed with `FromStr`, and fall back
//! to the supplied default when unset or unparsable.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix shared by every autobuy environment variable
pub const ENV_PREFIX: &str = "AUTOBUY";

/// Loads prefixed environment variables
#[derive(Debug)]
pub struct EnvLoader {
    prefix: String,
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(ENV_PREFIX)
    }
}

impl EnvLoader {
    /// Create a loader for `<prefix>_<SUFFIX>` variables
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    /// Full variable name for `suffix`
    pub fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    /// Raw value, treating an empty string as unset
    pub fn load_raw(&self, suffix: &str) -> Option<String> {
        env::var(self.key(suffix)).ok().filter(|v| !v.trim().is_empty())
    }

    /// Parsed value with default
    pub fn load_parsed<T>(&self, suffix: &str, default: T) -> T
    where
        T: FromStr,
    {
        match self.load_raw(suffix) {
            Some(raw) => match raw.trim().parse() {
                Ok(value) => value,
                Err(_) => {
                    tracing::warn!("Ignoring unparsable {}={:?}", self.key(suffix), raw);
                    default
                }
            },
            None => default,
        }
    }

    /// Boolean flag accepting `1/0`, `true/false`, `yes/no`, `on/off`
    pub fn load_bool(&self, suffix: &str, default: bool) -> bool {
        match self.load_raw(suffix).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
            Some(v) => {
                tracing::warn!("Ignoring non-boolean {}={:?}", self.key(suffix), v);
                default
            }
            None => default,
        }
    }

    /// Path value, resolved against `base` when relative
    pub fn load_path(&self, suffix: &str, base: &Path) -> Option<PathBuf> {
        self.load_raw(suffix).map(|raw| resolve_path(base, Path::new(&raw)))
    }
}

/// Join `path` onto `base` unless it is already absolute
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load `<dir>/.env` into the process environment when present
///
/// Variables already set in the environment take precedence.
pub fn load_dotenv(dir: &Path) {
    let path = dir.join(".env");
    match dotenvy::from_path(&path) {
        Ok(()) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to load {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_load_parsed() {
        let loader = EnvLoader::new("AUTOBUY_TEST");
        env::remove_var("AUTOBUY_TEST_NUMBER");
        assert_eq!(loader.load_parsed("NUMBER", 7u64), 7);

        env::set_var("AUTOBUY_TEST_NUMBER", " 12000 ");
        assert_eq!(loader.load_parsed("NUMBER", 7u64), 12000);

        env::set_var("AUTOBUY_TEST_NUMBER", "lots");
        assert_eq!(loader.load_parsed("NUMBER", 7u64), 7);

        env::remove_var("AUTOBUY_TEST_NUMBER");
    }

    #[test]
    #[serial]
    fn test_empty_value_is_unset() {
        let loader = EnvLoader::new("AUTOBUY_TEST");
        env::set_var("AUTOBUY_TEST_EMPTY", "");
        assert_eq!(loader.load_raw("EMPTY"), None);
        env::remove_var("AUTOBUY_TEST_EMPTY");
    }

    #[test]
    #[serial]
    fn test_load_bool() {
        let loader = EnvLoader::new("AUTOBUY_TEST");
        for (raw, expected) in [("1", true), ("YES", true), ("off", false), ("false", false)] {
            env::set_var("AUTOBUY_TEST_FLAG", raw);
            assert_eq!(loader.load_bool("FLAG", !expected), expected, "value {raw}");
        }
        env::set_var("AUTOBUY_TEST_FLAG", "maybe");
        assert!(loader.load_bool("FLAG", true));
        env::remove_var("AUTOBUY_TEST_FLAG");
    }

    #[test]
    #[serial]
    fn test_load_path_resolves_relative() {
        let loader = EnvLoader::new("AUTOBUY_TEST");
        let base = Path::new("/opt/autobuy");

        env::set_var("AUTOBUY_TEST_DIR", "logs");
        assert_eq!(
            loader.load_path("DIR", base),
            Some(PathBuf::from("/opt/autobuy/logs"))
        );

        env::set_var("AUTOBUY_TEST_DIR", "/var/log/autobuy");
        assert_eq!(
            loader.load_path("DIR", base),
            Some(PathBuf::from("/var/log/autobuy"))
        );

        env::remove_var("AUTOBUY_TEST_DIR");
        assert_eq!(loader.load_path("DIR", base), None);
    }

    #[test]
    #[serial]
    fn test_load_dotenv_does_not_override() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".env"),
            "AUTOBUY_TEST_DOTENV_NEW=from-file\nAUTOBUY_TEST_DOTENV_SET=from-file\n",
        )
        .unwrap();
        env::remove_var("AUTOBUY_TEST_DOTENV_NEW");
        env::set_var("AUTOBUY_TEST_DOTENV_SET", "from-env");

        load_dotenv(temp.path());

        assert_eq!(env::var("AUTOBUY_TEST_DOTENV_NEW").unwrap(), "from-file");
        assert_eq!(env::var("AUTOBUY_TEST_DOTENV_SET").unwrap(), "from-env");

        env::remove_var("AUTOBUY_TEST_DOTENV_NEW");
        env::remove_var("AUTOBUY_TEST_DOTENV_SET");
    }

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let temp = tempfile::TempDir::new().unwrap();
        load_dotenv(temp.path());
    }
}
