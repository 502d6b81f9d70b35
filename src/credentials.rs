//! Connection resolution.
//!
//! Builds a [`ConnectionConfig`] from exactly one credential source. An
//! explicit config always wins; otherwise sources are tried in order:
//!
//! 1. `.config.yml` (YAML, keyed by server then account)
//! 2. `.config.sh` (shell-style `export KEY=value` file)
//! 3. the environment snapshot
//!
//! Nothing here reads process-global state. [`CredentialSources::discover`]
//! is the only place that looks at the filesystem around the working
//! directory, and the caller hands it the environment to use.

use crate::config::{find_upwards, ConnectionConfig, SslPolicy};
use crate::error::{ExtractError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// File name of the YAML credentials file.
pub const YAML_CONFIG_FILE: &str = ".config.yml";

/// File name of the shell-sourced credentials file.
pub const SHELL_CONFIG_FILE: &str = ".config.sh";

/// File name of the dotenv file merged into the environment snapshot.
pub const DOTENV_FILE: &str = ".env";

/// Presence of this key (any value) disables TLS.
pub const NO_SSL_KEY: &str = "VERTICA_NO_SSL";

/// Where a resolved configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    Yaml(PathBuf),
    ShellEnv(PathBuf),
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit arguments"),
            Self::Yaml(path) => write!(f, "YAML file {}", path.display()),
            Self::ShellEnv(path) => write!(f, "env file {}", path.display()),
            Self::Environment => write!(f, "environment"),
        }
    }
}

/// Which server section and account to read credentials for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    pub server: String,
    pub account: String,
}

impl Default for CredentialScope {
    fn default() -> Self {
        Self {
            server: "vertica".to_string(),
            account: "user".to_string(),
        }
    }
}

impl CredentialScope {
    fn host_key(&self) -> String {
        format!("{}_host", self.server)
    }

    fn port_key(&self) -> String {
        format!("{}_port", self.server)
    }

    fn database_key(&self) -> String {
        format!("{}_database", self.server)
    }

    fn username_key(&self) -> String {
        format!("{}_{}_username", self.server, self.account)
    }

    fn password_key(&self) -> String {
        format!("{}_{}_password", self.server, self.account)
    }
}

/// Settings applied on top of whichever source wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOverrides {
    pub read_timeout: Option<Duration>,
    pub no_ssl: bool,
}

/// Every credential origin the resolver may consult.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub explicit: Option<ConnectionConfig>,
    pub yaml: Option<PathBuf>,
    pub shell_env: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub overrides: ConnectionOverrides,
}

impl CredentialSources {
    /// Locates `.config.yml` and `.config.sh` by walking up from `cwd`, and
    /// layers `env` over any `.env` file found the same way.
    pub fn discover(cwd: &Path, env: HashMap<String, String>) -> Result<Self> {
        let yaml = find_upwards(cwd, YAML_CONFIG_FILE);
        let shell_env = find_upwards(cwd, SHELL_CONFIG_FILE);

        let mut merged = match find_upwards(cwd, DOTENV_FILE) {
            Some(path) => {
                debug!("Loading {}", path.display());
                read_env_file(&path)?
            }
            None => HashMap::new(),
        };
        // Real environment wins over .env, matching dotenv semantics.
        merged.extend(env);

        Ok(Self {
            explicit: None,
            yaml,
            shell_env,
            env: merged,
            overrides: ConnectionOverrides::default(),
        })
    }

    pub fn with_explicit(mut self, explicit: Option<ConnectionConfig>) -> Self {
        self.explicit = explicit;
        self
    }

    pub fn with_overrides(mut self, overrides: ConnectionOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// A connection config and the source that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub config: ConnectionConfig,
    pub source: CredentialSource,
}

/// Resolves connection parameters from the highest-priority available source.
pub fn resolve(
    sources: &CredentialSources,
    scope: &CredentialScope,
) -> Result<ResolvedCredentials> {
    let (mut config, source) = if let Some(explicit) = &sources.explicit {
        (explicit.clone(), CredentialSource::Explicit)
    } else if let Some(path) = &sources.yaml {
        (from_yaml_file(path, scope)?, CredentialSource::Yaml(path.clone()))
    } else if let Some(path) = &sources.shell_env {
        let mut vars = sources.env.clone();
        vars.extend(read_env_file(path)?);
        (from_env_map(&vars, scope)?, CredentialSource::ShellEnv(path.clone()))
    } else {
        let config = from_env_map(&sources.env, scope)?;
        if config.is_empty() {
            return Err(ExtractError::credentials(format!(
                "no credential source found: no {YAML_CONFIG_FILE}, no {SHELL_CONFIG_FILE}, \
                 and no {}/{} variables set",
                scope.host_key(),
                scope.username_key()
            )));
        }
        (config, CredentialSource::Environment)
    };

    if let Some(timeout) = sources.overrides.read_timeout {
        config.read_timeout = timeout;
    }
    if sources.overrides.no_ssl {
        config.ssl = SslPolicy::Disabled;
    }

    config.validate()?;
    info!("Resolved {} from {}", config.display_string(), source);

    Ok(ResolvedCredentials { config, source })
}

/// One server section of `.config.yml`.
#[derive(Debug, Deserialize)]
struct ServerSection {
    host: Option<String>,
    database: Option<String>,
    port: Option<u16>,
    ssl: Option<bool>,
    /// Remaining keys are account sections.
    #[serde(flatten)]
    accounts: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct AccountSection {
    username: Option<String>,
    password: Option<String>,
}

/// Reads connection parameters for `scope` from a YAML credentials file.
pub fn from_yaml_file(path: &Path, scope: &CredentialScope) -> Result<ConnectionConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ExtractError::config(format!("Failed to read {}: {e}", path.display()))
    })?;
    from_yaml_str(&content, scope).map_err(|e| match e {
        ExtractError::Config(msg) => {
            ExtractError::config(format!("Configuration error in {}:\n  {msg}", path.display()))
        }
        other => other,
    })
}

/// Parses connection parameters for `scope` from YAML text.
pub fn from_yaml_str(content: &str, scope: &CredentialScope) -> Result<ConnectionConfig> {
    let mut servers: HashMap<String, ServerSection> =
        serde_yaml::from_str(content).map_err(|e| ExtractError::config(e.to_string()))?;

    let mut server = servers.remove(&scope.server).ok_or_else(|| {
        ExtractError::credentials(format!("no '{}' section in credentials file", scope.server))
    })?;

    let account: AccountSection = match server.accounts.remove(&scope.account) {
        Some(value) => serde_yaml::from_value(value).map_err(|e| {
            ExtractError::config(format!(
                "invalid account '{}.{}': {e}",
                scope.server, scope.account
            ))
        })?,
        None => {
            return Err(ExtractError::credentials(format!(
                "no '{}.{}' account in credentials file",
                scope.server, scope.account
            )))
        }
    };

    let defaults = ConnectionConfig::default();
    Ok(ConnectionConfig {
        host: server.host,
        port: server.port.unwrap_or(defaults.port),
        database: server.database,
        user: account.username,
        password: account.password,
        ssl: SslPolicy::from_opt_out(server.ssl == Some(false)),
        ..defaults
    })
}

/// Reads connection parameters for `scope` from environment-style variables.
///
/// User and password fall back to the bare `user` and `pw` keys.
pub fn from_env_map(
    vars: &HashMap<String, String>,
    scope: &CredentialScope,
) -> Result<ConnectionConfig> {
    let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

    let port = match get(&scope.port_key()) {
        Some(raw) => raw.parse().map_err(|_| {
            ExtractError::config(format!("invalid {}: '{raw}'", scope.port_key()))
        })?,
        None => ConnectionConfig::default().port,
    };

    Ok(ConnectionConfig {
        host: get(&scope.host_key()),
        port,
        database: get(&scope.database_key()),
        user: get(&scope.username_key()).or_else(|| get("user")),
        password: get(&scope.password_key()).or_else(|| get("pw")),
        ssl: SslPolicy::from_opt_out(vars.contains_key(NO_SSL_KEY)),
        ..Default::default()
    })
}

/// Reads a dotenv or shell-style env file into a map without touching the
/// process environment.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        ExtractError::config(format!("Failed to read {}: {e}", path.display()))
    })?;

    iter.map(|item| {
        item.map_err(|e| ExtractError::config(format!("Invalid line in {}: {e}", path.display())))
    })
    .collect()
}

/// Snapshots environment variables, skipping any name or value that is not
/// valid UTF-8.
pub fn env_snapshot<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                debug!("Skipping non UTF-8 environment variable {key:?}");
                None
            }
        })
        .collect()
}
