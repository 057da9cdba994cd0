use super::types::{ReceiverConfig, DEFAULT_PORT};
use super::verbosity::VerbosityFlags;
use crate::config::{env_var_pattern, expand_env_vars, expand_tilde};
use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid listen address '{addr}': {reason}")]
    ListenAddr { addr: String, reason: String },
}

pub fn load_config(path: &Path) -> Result<ReceiverConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;
    parse_config(&text)
}

/// Load the file if there is one, otherwise start from defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<ReceiverConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ReceiverConfig::default()),
    }
}

pub fn parse_config(text: &str) -> Result<ReceiverConfig, ConfigError> {
    let text = expand_env_vars(text);
    check_unexpanded_vars(&text)?;

    // An empty or comment-only file is a valid config.
    let value: serde_yaml::Value = serde_yaml::from_str(&text)?;
    let mut config = if value.is_null() {
        ReceiverConfig::default()
    } else {
        serde_yaml::from_value(value)?
    };

    expand_paths(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Comment lines are skipped, so documentation may mention `$env{...}`.
fn check_unexpanded_vars(text: &str) -> Result<(), ConfigError> {
    let mut unset: Vec<String> = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(|line| env_var_pattern().captures_iter(line))
        .map(|cap| cap[1].to_string())
        .collect();

    if unset.is_empty() {
        return Ok(());
    }
    unset.sort();
    unset.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unset.join(", ")
    )))
}

fn expand_paths(config: &mut ReceiverConfig) {
    if let Some(path) = config.output.path.as_mut() {
        *path = expand_tilde(path);
    }
}

fn validate_config(config: &ReceiverConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if let Err(e) = parse_listen_addr(&config.listen) {
        errors.push(e.to_string());
    }

    if let Some(path) = &config.output.path {
        if path.as_os_str().is_empty() {
            errors.push("output.path cannot be empty (omit it to write to the console)".to_string());
        } else if path.is_dir() {
            errors.push(format!("output.path '{}' is a directory", path.display()));
        }
    }

    if config.batch.flush_level.is_some() && config.batch.capacity == 0 {
        errors.push("batch.flush_level has no effect without batch.capacity > 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

/// Parses `host:port`, `host`, `:port` or `[v6]:port`. An empty host binds
/// every interface; a missing port means 5005.
pub fn parse_listen_addr(listen: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = |reason: String| ConfigError::ListenAddr {
        addr: listen.to_string(),
        reason,
    };

    if let Ok(addr) = listen.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let (host, port) = match listen.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') || host.starts_with('[') => {
            let port = port
                .parse::<u16>()
                .map_err(|_| invalid(format!("bad port '{}'", port)))?;
            (host.trim_start_matches('[').trim_end_matches(']'), port)
        }
        _ => (listen, DEFAULT_PORT),
    };
    let host = if host.is_empty() { "0.0.0.0" } else { host };

    (host, port)
        .to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("host resolved to no addresses".to_string()))
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub out: Option<PathBuf>,
    pub batches: Option<usize>,
    pub verbosity: VerbosityFlags,
}

impl ConfigOverrides {
    pub fn apply(self, mut config: ReceiverConfig) -> Result<ReceiverConfig, ConfigError> {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(out) = self.out {
            config.output.path = Some(expand_tilde(&out));
        }
        if let Some(batches) = self.batches {
            config.batch.capacity = batches;
        }
        if let Some(level) = self.verbosity.selected() {
            config.output.min_level = level;
        }
        validate_config(&config)?;
        Ok(config)
    }
}
