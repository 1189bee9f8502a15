use dripfeed::distribution::{DistributionConfig, EligibilityParams, ErrorClassifier};
use dripfeed::sources::HttpApiConfig;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub distribution: DistributionSection,
    pub classification: ClassificationSection,
    pub api: ApiSection,
    pub trigger: TriggerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionSection {
    pub auto_enabled: bool,
    pub tick_interval_secs: u64,
    pub retry_delay_secs: u64,
    pub min_reserve: u64,
    pub utc_offset_hours: i32,
}

impl Default for DistributionSection {
    fn default() -> Self {
        Self {
            auto_enabled: true,
            tick_interval_secs: 120,
            retry_delay_secs: 900,
            min_reserve: 50,
            utc_offset_hours: 0,
        }
    }
}

/// Extra refusal codes merged onto the built-in tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSection {
    pub permanent: Vec<String>,
    pub temporary: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Name of the environment variable holding the bearer token
    pub token_env: Option<String>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 30000,
            token_env: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSection {
    pub interval_secs: u64,
}

impl Default for TriggerSection {
    fn default() -> Self {
        Self { interval_secs: 3600 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            distribution: DistributionSection::default(),
            classification: ClassificationSection::default(),
            api: ApiSection::default(),
            trigger: TriggerSection::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.distribution.tick_interval_secs == 0 {
            return Err(eyre!("distribution.tick_interval_secs must be greater than zero"));
        }
        if self.trigger.interval_secs == 0 {
            return Err(eyre!("trigger.interval_secs must be greater than zero"));
        }
        if !(-23..=23).contains(&self.distribution.utc_offset_hours) {
            return Err(eyre!(
                "distribution.utc_offset_hours must be between -23 and 23, got {}",
                self.distribution.utc_offset_hours
            ));
        }
        Ok(())
    }

    pub fn distribution_config(&self) -> Result<DistributionConfig> {
        let section = &self.distribution;
        let eligibility = EligibilityParams::default()
            .with_min_reserve(section.min_reserve)
            .with_utc_offset_hours(section.utc_offset_hours)
            .ok_or_else(|| eyre!("Invalid utc_offset_hours: {}", section.utc_offset_hours))?;
        let classifier = ErrorClassifier::new()
            .with_permanent(self.classification.permanent.iter().cloned())
            .with_temporary(self.classification.temporary.iter().cloned());

        Ok(DistributionConfig::default()
            .with_auto_enabled(section.auto_enabled)
            .with_tick_interval(Duration::from_secs(section.tick_interval_secs))
            .with_retry_delay(Duration::from_secs(section.retry_delay_secs))
            .with_eligibility(eligibility)
            .with_classifier(classifier))
    }

    pub fn api_config(&self) -> Result<HttpApiConfig> {
        let mut api = HttpApiConfig::new(&self.api.base_url).with_timeout(Duration::from_millis(self.api.timeout_ms));
        if let Some(var) = &self.api.token_env {
            let token = std::env::var(var).context(format!("API token variable {} is not set", var))?;
            api = api.with_token(token);
        }
        Ok(api)
    }

    pub fn trigger_interval(&self) -> Duration {
        Duration::from_secs(self.trigger.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dripfeed::distribution::FailureClass;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.distribution.auto_enabled);
        assert_eq!(config.distribution.tick_interval_secs, 120);
        assert_eq!(config.distribution.retry_delay_secs, 900);
        assert_eq!(config.distribution.min_reserve, 50);
        assert_eq!(config.trigger_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(
            r#"
distribution:
  tick_interval_secs: 30
  min_reserve: 10
api:
  base_url: "https://pool.example.net"
"#,
        );
        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.distribution.tick_interval_secs, 30);
        assert_eq!(config.distribution.min_reserve, 10);
        assert_eq!(config.distribution.retry_delay_secs, 900);
        assert_eq!(config.api.base_url, "https://pool.example.net");
        assert_eq!(config.api.timeout_ms, 30000);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let path = PathBuf::from("/nonexistent/dripfeed.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_rejects_zero_interval() {
        let file = write_config("distribution:\n  tick_interval_secs: 0\n");
        assert!(Config::load(Some(&file.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_load_rejects_bad_offset() {
        let file = write_config("distribution:\n  utc_offset_hours: 30\n");
        assert!(Config::load(Some(&file.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_distribution_config() {
        let file = write_config(
            r#"
distribution:
  auto_enabled: false
  tick_interval_secs: 60
  retry_delay_secs: 300
  utc_offset_hours: -5
classification:
  permanent: [account_banned]
  temporary: [maintenance, no_data]
"#,
        );
        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        let dist = config.distribution_config().unwrap();

        assert!(!dist.auto_enabled);
        assert_eq!(dist.tick_interval, Duration::from_secs(60));
        assert_eq!(dist.retry_delay, Duration::from_secs(300));
        assert_eq!(dist.eligibility.reference_offset.local_minus_utc(), -5 * 3600);
        assert_eq!(dist.classifier.classify("account_banned"), FailureClass::Permanent);
        assert_eq!(dist.classifier.classify("maintenance"), FailureClass::Temporary);
        assert_eq!(dist.classifier.classify("no_data"), FailureClass::Temporary);
    }

    #[test]
    fn test_api_config_missing_token_var() {
        let mut config = Config::default();
        config.api.token_env = Some("DRIPFEED_TEST_TOKEN_THAT_IS_NOT_SET".to_string());
        assert!(config.api_config().is_err());

        config.api.token_env = None;
        assert!(config.api_config().is_ok());
    }
}
