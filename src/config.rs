//! Layered settings for the lookup server and the HTTP front door.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML file (`keyhole.toml` unless another path is given; optional)
//! 3. Environment variables: `KEYHOLE_*`, sections split by `__`
//!    (e.g. `KEYHOLE_SERVER__DEGREE=4`, `KEYHOLE_SERVER__SEED_KEYS=1,2,3`)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::btree::{TreeError, MIN_DEGREE};
use crate::error::SettingsError;

pub const DEFAULT_CONFIG_FILE: &str = "keyhole.toml";
pub const ENV_PREFIX: &str = "KEYHOLE";

pub const SAMPLE_KEYS: [i64; 17] = [10, 20, 5, 6, 12, 30, 7, 17, 3, 1, 4, 15, 18, 25, 28, 32, 35];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub front_door: FrontDoorSettings,
}

/// Backend (gRPC) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: String,
    /// Minimum degree `t` of the index.
    pub degree: usize,
    /// Keys loaded before the server reports ready.
    pub seed_keys: Vec<i64>,
    /// Optional file with one integer key per line, loaded after `seed_keys`.
    pub seed_file: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:50051".into(),
            degree: 3,
            seed_keys: SAMPLE_KEYS.to_vec(),
            seed_file: None,
        }
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FrontDoorSettings {
    pub listen: String,
    pub backend: String,
    pub rpc_timeout_ms: u64,
    /// Extra attempts after a transport failure.
    pub retries: u32,
}

impl Default for FrontDoorSettings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".into(),
            backend: "http://127.0.0.1:50051".into(),
            rpc_timeout_ms: 2000,
            retries: 1,
        }
    }
}

impl Settings {
    /// Loads settings from `path` (or [`DEFAULT_CONFIG_FILE`]) and the environment.
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let required = path != Path::new(DEFAULT_CONFIG_FILE);

        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.seed_keys")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.server.degree < MIN_DEGREE {
            return Err(TreeError::DegreeTooSmall(self.server.degree).into());
        }
        self.server.listen_addr()?;
        self.front_door.listen_addr()?;
        Ok(())
    }
}

fn parse_addr(addr: &str) -> Result<SocketAddr, SettingsError> {
    addr.parse().map_err(|source| SettingsError::InvalidAddress {
        addr: addr.to_string(),
        source,
    })
}

impl ServerSettings {
    pub fn listen_addr(&self) -> Result<SocketAddr, SettingsError> {
        parse_addr(&self.listen)
    }

    /// Reads the seed file, if any, into its lines.
    pub fn seed_lines(&self) -> Result<Vec<String>, SettingsError> {
        let Some(path) = &self.seed_file else {
            return Ok(Vec::new());
        };

        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::SeedFile {
            path: path.clone(),
            source,
        })?;

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}

impl FrontDoorSettings {
    pub fn listen_addr(&self) -> Result<SocketAddr, SettingsError> {
        parse_addr(&self.listen)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.server.degree, 3);
        assert_eq!(settings.server.seed_keys, SAMPLE_KEYS.to_vec());
        assert_eq!(settings.front_door.rpc_timeout(), Duration::from_secs(2));
        assert_eq!(settings.front_door.listen_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
            [server]
            listen = "127.0.0.1:6000"
            degree = 5
            seed_keys = [1, 2, 3]

            [front_door]
            retries = 4
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();

        assert_eq!(settings.server.listen, "127.0.0.1:6000");
        assert_eq!(settings.server.degree, 5);
        assert_eq!(settings.server.seed_keys, vec![1, 2, 3]);
        assert_eq!(settings.front_door.retries, 4);
        assert_eq!(settings.front_door.backend, FrontDoorSettings::default().backend);
    }

    #[test]
    fn test_degree_below_minimum_is_rejected() {
        let file = write_config("[server]\ndegree = 1\n");

        let err = Settings::load(Some(file.path())).unwrap_err();

        assert!(matches!(err, SettingsError::Tree(TreeError::DegreeTooSmall(1))));
    }

    #[test]
    fn test_bad_listen_address_is_rejected() {
        let file = write_config("[front_door]\nlisten = \"not an address\"\n");

        let err = Settings::load(Some(file.path())).unwrap_err();

        assert!(matches!(err, SettingsError::InvalidAddress { .. }));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        assert!(Settings::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_seed_lines_skip_blanks() {
        let mut seed = NamedTempFile::new().unwrap();
        writeln!(seed, "4\n\n  9 \n12").unwrap();
        let server = ServerSettings {
            seed_file: Some(seed.path().to_path_buf()),
            ..ServerSettings::default()
        };

        assert_eq!(server.seed_lines().unwrap(), vec!["4", "9", "12"]);
    }

    #[test]
    fn test_seed_lines_without_file() {
        assert!(ServerSettings::default().seed_lines().unwrap().is_empty());
    }
}
