// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session configuration.
//!
//! Configuration is read from an optional `testreplay.toml` file, then
//! overridden by environment variables:
//!
//! | Variable               | Config key   | Meaning                                |
//! |------------------------|--------------|----------------------------------------|
//! | `TESTREPLAY_DIR`       | `output-dir` | output directory; unset disables       |
//! | `TESTREPLAY_DIALECT`   | `dialect`    | replay script dialect (`sh` or `bat`)  |
//! | `TESTREPLAY_WORKER_ID` | `worker-id`  | worker identifier for distributed runs |
//! | `TESTREPLAY_COMMAND`   | `command`    | command the replay script invokes      |
//!
//! Empty environment variables are treated as unset.

use crate::{
    errors::ConfigError,
    identity::WorkerId,
    partition::ReplayPaths,
    script::DialectKind,
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::{collections::BTreeSet, env, io};
use tracing::{debug, warn};

/// The name of the config file looked up by [`SessionConfig::from_dir`].
pub const CONFIG_FILE_NAME: &str = "testreplay.toml";

/// The command replay scripts invoke if none is configured.
pub const DEFAULT_COMMAND: &str = "cargo test -- --exact";

/// Environment variable for the output directory.
pub const DIR_ENV: &str = "TESTREPLAY_DIR";

/// Environment variable for the script dialect.
pub const DIALECT_ENV: &str = "TESTREPLAY_DIALECT";

/// Environment variable for the worker ID.
pub const WORKER_ID_ENV: &str = "TESTREPLAY_WORKER_ID";

/// Environment variable for the replay command.
pub const COMMAND_ENV: &str = "TESTREPLAY_COMMAND";

/// Configuration for one recording session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// The output directory. Recording is disabled if this is `None`.
    pub output_dir: Option<Utf8PathBuf>,

    /// The dialect of the replay script.
    pub dialect: DialectKind,

    /// The worker ID, present only under distributed execution.
    pub worker_id: Option<WorkerId>,

    /// The command the replay script invokes, followed by test identities.
    pub command: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            dialect: DialectKind::default(),
            worker_id: None,
            command: DEFAULT_COMMAND.to_owned(),
        }
    }
}

impl SessionConfig {
    /// Creates a config that records into `output_dir`, with defaults for
    /// everything else.
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_dir: Some(output_dir.into()),
            ..Self::default()
        }
    }

    /// Sets the dialect.
    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the worker ID.
    pub fn with_worker_id(mut self, worker_id: WorkerId) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    /// Sets the replay command.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Builds a config from environment variables alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Loads `testreplay.toml` from `dir` if it exists, then applies
    /// environment overrides.
    pub fn from_dir(dir: &Utf8Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(&dir.join(CONFIG_FILE_NAME))?.unwrap_or_default();
        config.apply_env()?;
        Ok(config)
    }

    /// Loads the config file at `path`. Returns `Ok(None)` if the file does
    /// not exist.
    ///
    /// A relative `output-dir` is resolved against the directory containing
    /// the file. Unknown keys are warned about and otherwise ignored.
    pub fn from_file(path: &Utf8Path) -> Result<Option<Self>, ConfigError> {
        debug!("session config: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("session config: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (deserialized, unknown) =
            DeserializedConfig::from_toml(&contents).map_err(|error| ConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;
        if !unknown.is_empty() {
            let unknown_str = unknown
                .iter()
                .map(|key| format!("`{key}`"))
                .collect::<Vec<_>>()
                .join(", ");
            warn!("in config file {path}, ignoring unknown configuration {unknown_str}");
        }

        let base = path.parent().unwrap_or(Utf8Path::new(""));
        let config = deserialized.resolve(path.as_str(), base)?;
        debug!("session config: loaded from {path}");
        Ok(Some(config))
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(read_env)
    }

    fn apply_overrides(
        &mut self,
        mut lookup: impl FnMut(&'static str) -> Result<Option<String>, ConfigError>,
    ) -> Result<(), ConfigError> {
        if let Some(dir) = lookup(DIR_ENV)? {
            self.output_dir = Some(dir.into());
        }
        if let Some(dialect) = lookup(DIALECT_ENV)? {
            self.dialect = parse_dialect(&dialect, DIALECT_ENV)?;
        }
        if let Some(worker_id) = lookup(WORKER_ID_ENV)? {
            self.worker_id = Some(parse_worker_id(&worker_id, WORKER_ID_ENV)?);
        }
        if let Some(command) = lookup(COMMAND_ENV)? {
            self.command = command;
        }
        Ok(())
    }

    /// Checks that the config is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand {
                origin: "session config".to_owned(),
            });
        }
        Ok(())
    }

    /// Returns true if recording is enabled.
    pub fn is_enabled(&self) -> bool {
        self.output_dir.is_some()
    }

    /// Returns the paths this session writes to, or `None` if recording is
    /// disabled.
    pub fn paths(&self) -> Option<ReplayPaths> {
        self.output_dir
            .as_ref()
            .map(|dir| ReplayPaths::new(dir.clone(), self.worker_id.clone()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedConfig {
    output_dir: Option<Utf8PathBuf>,
    dialect: Option<String>,
    worker_id: Option<String>,
    command: Option<String>,
}

impl DeserializedConfig {
    fn from_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let config: Self = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })?;
        Ok((config, unknown))
    }

    fn resolve(self, origin: &str, base: &Utf8Path) -> Result<SessionConfig, ConfigError> {
        let mut config = SessionConfig {
            output_dir: self.output_dir.map(|dir| base.join(dir)),
            ..SessionConfig::default()
        };
        if let Some(dialect) = self.dialect {
            config.dialect = parse_dialect(&dialect, origin)?;
        }
        if let Some(worker_id) = self.worker_id {
            config.worker_id = Some(parse_worker_id(&worker_id, origin)?);
        }
        if let Some(command) = self.command {
            if command.trim().is_empty() {
                return Err(ConfigError::EmptyCommand {
                    origin: origin.to_owned(),
                });
            }
            config.command = command;
        }
        Ok(config)
    }
}

fn parse_dialect(input: &str, origin: &str) -> Result<DialectKind, ConfigError> {
    input
        .parse()
        .map_err(|error| ConfigError::UnknownDialect {
            origin: origin.to_owned(),
            error,
        })
}

fn parse_worker_id(input: &str, origin: &str) -> Result<WorkerId, ConfigError> {
    WorkerId::new(input).map_err(|error| ConfigError::InvalidWorkerId {
        origin: origin.to_owned(),
        error,
    })
}

fn read_env(name: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::EnvNotUnicode { name }),
    }
}
