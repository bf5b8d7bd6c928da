//! CLI configuration handling.
//!
//! Values come from an optional TOML file; non-empty command-line flags
//! override them.

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use keystone_core::CredentialConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Logging level.
    pub log_level: Option<String>,

    /// Output file for produced artifacts.
    pub outfile: Option<String>,

    /// Credential sources.
    pub signer: SignerConfig,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// `[signer]` table of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Workload attestation agent endpoint.
    pub workload_socket: Option<String>,

    /// Private key path.
    pub key: Option<String>,

    /// Leaf certificate path.
    pub certificate: Option<String>,

    /// Intermediate certificate paths.
    pub intermediates: Vec<String>,

    /// Workload agent timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Signer settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SignerOverrides {
    pub workload_socket: Option<String>,
    pub key: Option<String>,
    pub certificate: Option<String>,
    pub intermediates: Vec<String>,
    pub timeout_secs: Option<u64>,
}

impl CliConfig {
    /// Effective credential configuration after applying flag overrides.
    pub fn credentials(&self, overrides: &SignerOverrides) -> CredentialConfig {
        let file = &self.signer;
        let intermediates = if overrides.intermediates.is_empty() {
            &file.intermediates
        } else {
            &overrides.intermediates
        };

        CredentialConfig::from_flags(
            pick(&overrides.workload_socket, &file.workload_socket),
            pick(&overrides.key, &file.key),
            pick(&overrides.certificate, &file.certificate),
            intermediates,
        )
    }

    /// Effective workload agent timeout.
    pub fn workload_timeout(&self, overrides: &SignerOverrides) -> Duration {
        overrides
            .timeout_secs
            .or(self.signer.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(keystone_core::socket::DEFAULT_TIMEOUT)
    }

    /// Effective output path; empty means standard output.
    pub fn outfile<'a>(&'a self, flag: &'a Option<String>) -> &'a str {
        pick(flag, &self.outfile)
    }

    /// Effective log level.
    pub fn log_level<'a>(&'a self, flag: &'a Option<String>) -> &'a str {
        match pick(flag, &self.log_level) {
            "" => "info",
            level => level,
        }
    }
}

/// First non-empty value, flag before file.
fn pick<'a>(flag: &'a Option<String>, file: &'a Option<String>) -> &'a str {
    flag.as_deref()
        .filter(|v| !v.is_empty())
        .or_else(|| file.as_deref().filter(|v| !v.is_empty()))
        .unwrap_or("")
}

/// Load configuration from an explicit path or the default location.
///
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<CliConfig> {
    let config_path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {:?} does not exist", path);
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(CliConfig::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config from {:?}", config_path))?;
    let mut config: CliConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config from {:?}", config_path))?;

    config.config_path = Some(config_path);
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "keystone")
}
