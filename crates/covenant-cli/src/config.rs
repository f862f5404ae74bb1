use chrono::{DateTime, Utc};
use serde::Deserialize;

use covenant_core::batch::FailurePolicy;

use crate::input;

/// Optional settings for `run-tests`, read from a YAML file.
///
/// ```yaml
/// failure_policy: abort
/// tested_at: 2025-02-14T08:30:00Z
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub failure_policy: Option<FailurePolicy>,
    #[serde(default)]
    pub tested_at: Option<DateTime<Utc>>,
}

impl RunConfig {
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(p) => input::file::read_document(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_config() {
        let cfg: RunConfig =
            serde_yaml::from_str("failure_policy: abort\ntested_at: 2025-02-14T08:30:00Z\n").unwrap();
        assert_eq!(cfg.failure_policy, Some(FailurePolicy::Abort));
        assert_eq!(cfg.tested_at.unwrap().to_rfc3339(), "2025-02-14T08:30:00+00:00");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(serde_yaml::from_str::<RunConfig>("warning_band: 20\n").is_err());
    }

    #[test]
    fn test_missing_path_gives_defaults() {
        assert_eq!(RunConfig::load(None).unwrap(), RunConfig::default());
    }
}
