use std::{path::Path, str::FromStr, time::Duration};
use derive_getters::Getters;
use serde::Deserialize;
use rs_can::CanError;
use crate::can::{DEFAULT_POLL_BATCH_SIZE, DEFAULT_POLL_INTERVAL_MS, MAX_RECEIVE_COUNT, constant::{ZCAN_ENV, ZCAN_PATH_DEFAULT, ZCAN_POLL_BATCH_VAR, ZCAN_POLL_INTERVAL_VAR, ZCAN_VAR}};

/// Where the vendor library lives and how subscriptions poll.
///
/// ```yaml
/// library: /opt/zlgcan/library
/// poll_interval_ms: 10
/// poll_batch_size: 100
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Getters)]
#[serde(default)]
pub struct DriverConfig {
    /// Root folder of the `<os>/<arch>/` library tree.
    library: String,
    #[getter(copy)]
    poll_interval_ms: u64,
    #[getter(copy)]
    poll_batch_size: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            library: ZCAN_PATH_DEFAULT.to_owned(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_batch_size: DEFAULT_POLL_BATCH_SIZE,
        }
    }
}

impl DriverConfig {
    pub fn new(library: impl Into<String>) -> Self {
        Self { library: library.into(), ..Default::default() }
    }

    /// Load `zcan.env` when present, then read `ZCAN_LIBRARY`, `ZCAN_POLL_INTERVAL`
    /// and `ZCAN_POLL_BATCH` from the environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, CanError> {
        if let Err(e) = dotenvy::from_filename(ZCAN_ENV) {
            log::debug!("ZLGCAN - {} not loaded: {}", ZCAN_ENV, e);
        }

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CanError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CanError::DeviceConfigError(format!("{}: {}", path.display(), e)))?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, CanError> {
        let cfg: Self = serde_yaml::from_str(content)
            .map_err(|e| CanError::DeviceConfigError(e.to_string()))?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// Checked by [`DriverConfig::validate`], which loading and subscribing run.
    #[inline]
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    #[inline]
    pub fn with_poll_batch_size(mut self, size: u32) -> Self {
        self.poll_batch_size = size;
        self
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), CanError> {
        if self.poll_batch_size == 0 || self.poll_batch_size > MAX_RECEIVE_COUNT {
            return Err(CanError::DeviceConfigError(
                format!("`poll_batch_size`: {} is out of range 1..={}", self.poll_batch_size, MAX_RECEIVE_COUNT)
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(CanError::DeviceConfigError("`poll_interval_ms` must be greater than 0".into()));
        }

        Ok(())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CanError> {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ZCAN_VAR) {
            cfg.library = v;
        }
        if let Some(v) = lookup(ZCAN_POLL_INTERVAL_VAR) {
            cfg.poll_interval_ms = parse_var(ZCAN_POLL_INTERVAL_VAR, &v)?;
        }
        if let Some(v) = lookup(ZCAN_POLL_BATCH_VAR) {
            cfg.poll_batch_size = parse_var(ZCAN_POLL_BATCH_VAR, &v)?;
        }
        cfg.validate()?;

        Ok(cfg)
    }
}

#[inline]
fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T, CanError> {
    value.trim()
        .parse()
        .map_err(|_| CanError::DeviceConfigError(format!("{}={} is not a valid number", name, value)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;
    use rs_can::CanError;
    use super::DriverConfig;

    #[test]
    fn defaults() {
        let cfg = DriverConfig::default();
        assert_eq!(cfg.library(), "library");
        assert_eq!(cfg.poll_interval(), Duration::from_millis(20));
        assert_eq!(cfg.poll_batch_size(), 50);
    }

    #[test]
    fn from_lookup() -> anyhow::Result<()> {
        let vars: HashMap<&str, &str> = [
            ("ZCAN_LIBRARY", "/opt/zlgcan"),
            ("ZCAN_POLL_INTERVAL", " 5 "),
        ].into();
        let cfg = DriverConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))?;
        assert_eq!(cfg.library(), "/opt/zlgcan");
        assert_eq!(cfg.poll_interval_ms(), 5);
        assert_eq!(cfg.poll_batch_size(), 50);

        let ret = DriverConfig::from_lookup(|k| (k == "ZCAN_POLL_BATCH").then(|| "many".to_string()));
        assert!(matches!(ret, Err(CanError::DeviceConfigError(_))));

        Ok(())
    }

    #[test]
    fn builders_are_validated() {
        assert!(DriverConfig::default().with_poll_interval(1).validate().is_ok());
        assert!(matches!(DriverConfig::default().with_poll_interval(0).validate(), Err(CanError::DeviceConfigError(_))));
        assert!(matches!(DriverConfig::default().with_poll_batch_size(0).validate(), Err(CanError::DeviceConfigError(_))));
    }

    #[test]
    fn from_yaml() -> anyhow::Result<()> {
        let cfg = DriverConfig::from_yaml_str("library: ./lib\npoll_batch_size: 10\n")?;
        assert_eq!(cfg, DriverConfig::new("./lib").with_poll_batch_size(10));

        assert!(DriverConfig::from_yaml_str("poll_batch_size: 0\n").is_err());
        assert!(DriverConfig::from_yaml_str("poll_batch_size: 10001\n").is_err());
        assert!(DriverConfig::from_yaml_str("poll_interval_ms: 0\n").is_err());
        assert!(DriverConfig::from_yaml_file("not-exists.yaml").is_err());

        Ok(())
    }
}
