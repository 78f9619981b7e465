use std::path::PathBuf;

pub const LOG_ENV: &str = "CAMPUSD_LOG";
pub const WORKSPACE_ENV: &str = "CAMPUSD_WORKSPACE";
pub const DEFAULT_LOG_FILTER: &str = "campusd=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workspace to open before the first request, if any.
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            workspace: non_empty(WORKSPACE_ENV).map(PathBuf::from),
            log_filter: non_empty(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset_or_blank() {
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg.workspace, None);
        assert_eq!(cfg.log_filter, DEFAULT_LOG_FILTER);

        let cfg = Config::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(cfg.workspace, None);
        assert_eq!(cfg.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn reads_both_variables() {
        let env: HashMap<&str, &str> = [
            (WORKSPACE_ENV, "/tmp/campus-ws"),
            (LOG_ENV, "campusd=debug"),
        ]
        .into_iter()
        .collect();
        let cfg = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/campus-ws")));
        assert_eq!(cfg.log_filter, "campusd=debug");
    }
}
