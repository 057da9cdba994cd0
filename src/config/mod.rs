pub mod generate;
pub mod parse;
pub mod types;
pub mod verbosity;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use parse::{load_config, load_or_default, parse_listen_addr, ConfigError, ConfigOverrides};
pub use types::{BatchConfig, EnvelopeConfig, OutputConfig, ReceiverConfig};
pub use verbosity::VerbosityFlags;

const USER_CONFIG: &str = ".config/clusterlog/config.yml";
const SYSTEM_CONFIG: &str = "/etc/clusterlog/config.yml";

pub(crate) fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

/// Expands `$env{VAR_NAME}` references. Unset variables are left as written
/// so validation can report them.
pub fn expand_env_vars(text: &str) -> String {
    env_var_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Replaces a leading `~` with the home directory when one is known.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return path.to_path_buf();
    };
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// First existing config file among: the explicit path (tilde-expanded),
/// `~/.config/clusterlog/config.yml`, `/etc/clusterlog/config.yml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(USER_CONFIG);
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from(SYSTEM_CONFIG);
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Where `config init` writes when not printing to stdout.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(USER_CONFIG))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_set_and_unset() {
        std::env::set_var("CLUSTERLOG_TEST_DIR", "/scratch/run7");
        let result = expand_env_vars("$env{CLUSTERLOG_TEST_DIR}/out.log and $env{CLUSTERLOG_UNSET_VAR}");
        assert_eq!(result, "/scratch/run7/out.log and $env{CLUSTERLOG_UNSET_VAR}");
        std::env::remove_var("CLUSTERLOG_TEST_DIR");
    }

    #[test]
    fn test_expand_env_vars_leaves_plain_text() {
        assert_eq!(expand_env_vars("listen: ${host}:5005"), "listen: ${host}:5005");
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/logs/a.log")), home.join("logs/a.log"));
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
        assert_eq!(expand_tilde(Path::new("/var/log/a.log")), Path::new("/var/log/a.log"));
        assert_eq!(expand_tilde(Path::new("rel/~x")), Path::new("rel/~x"));
    }

    #[test]
    fn test_explicit_config_path_wins() {
        assert_eq!(
            resolve_config_path(Some(Path::new("/tmp/custom.yml"))),
            Some(PathBuf::from("/tmp/custom.yml"))
        );
    }
}
