use std::{env, fmt, fs, io, path};

use pingwatch::{DEFAULT_TARGET, MonitorConfig, ProbeMethod, TimeBasis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::{format_duration, parse_duration};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: path::PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: path::PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    ParseFailed {
        path: path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config directory available, set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub probe: Probe,
    pub output: Output,
}

/// What to probe and how often. Durations use the CLI syntax (`1s`, `15m`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    pub target: String,
    pub method: ProbeMethod,
    pub interval: String,
    pub timeout: Option<String>,
    /// Unset means run until interrupted
    pub duration: Option<String>,
    pub progress: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub log: path::PathBuf,
    pub report: path::PathBuf,
    pub time_basis: TimeBasis,
}

/// `--config pingwatch.conf` reads `pingwatch.toml`
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// `pingwatch/config.toml` under the XDG config home, `~/.config` when unset
pub fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("pingwatch/config.toml"))
}

impl Default for Probe {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self {
            target: DEFAULT_TARGET.into(),
            method: defaults.method,
            interval: format_duration(defaults.probe_interval),
            timeout: None,
            duration: None,
            progress: format_duration(defaults.progress_interval),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self { log: defaults.log_path, report: defaults.report_path, time_basis: defaults.time_basis }
    }
}

fn duration_field(field: &'static str, value: &str) -> Result<std::time::Duration, Error> {
    parse_duration(value).map_err(|reason| Error::InvalidValue { field, reason })
}

impl Config {
    /// Load the probe and output settings, from `optional_path` or the
    /// default location. On first use the file does not exist yet; it is
    /// then written with the built-in defaults (target 8.8.8.8, 1s interval,
    /// unbounded run) so the user has something to edit.
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
            toml::from_str(raw_string.as_str())
                .map_err(|source| Error::ParseFailed { path: config_path, source })
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Write these settings as TOML, creating parent directories
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| Error::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str).map_err(|source| Error::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Resolve the file values into a monitor configuration. Range checks
    /// are left to [`MonitorConfig::validate`].
    pub fn to_monitor_config(&self) -> Result<MonitorConfig, Error> {
        let mut builder = MonitorConfig::builder(self.probe.target.clone())
            .method(self.probe.method)
            .probe_interval(duration_field("probe.interval", &self.probe.interval)?)
            .progress_interval(duration_field("probe.progress", &self.probe.progress)?)
            .log_path(self.output.log.clone())
            .report_path(self.output.report.clone())
            .time_basis(self.output.time_basis);

        if let Some(timeout) = &self.probe.timeout {
            builder = builder.probe_timeout(duration_field("probe.timeout", timeout)?);
        }
        if let Some(duration) = &self.probe.duration {
            builder = builder.max_duration(duration_field("probe.duration", duration)?);
        }

        Ok(builder.build())
    }
}

/// Display adapter printing the effective configuration for `--show-config`
pub struct Effective<'a>(pub &'a MonitorConfig);

impl fmt::Display for Effective<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let config = self.0;

        writeln!(f, "Effective Configuration:")?;
        write_title_1(f, "Probe")?;
        write_1(f, "Target", &config.target_address)?;
        write_1(f, "Method", &config.method)?;
        write_1(f, "Interval", &format_duration(config.probe_interval))?;
        write_1(f, "Timeout", &format_duration(config.effective_timeout()))?;
        match config.max_duration {
            Some(max) => write_1(f, "Duration", &format_duration(max))?,
            None => write_1(f, "Duration", &"until interrupted")?,
        }
        write_1(f, "Progress every", &format_duration(config.progress_interval))?;
        write_title_1(f, "Output")?;
        write_1(f, "Drop log", &config.log_path.display())?;
        write_1(f, "Report", &config.report_path.display())?;
        write_1(f, "Time basis", &config.time_basis)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_is_created_with_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/pingwatch.toml");

        let config = Config::from_config(Some(&path))?;
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::from_config(Some(&path))?;
        assert_eq!(reloaded, config);
        Ok(())
    }

    #[test]
    fn test_non_toml_extension_is_normalized() {
        let path = normalize_toml_path(path::Path::new("/tmp/pingwatch.conf"));
        assert_eq!(path, path::PathBuf::from("/tmp/pingwatch.toml"));
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[probe]\ntarget = \"1.1.1.1\"\nmethod = \"tcp\"\nduration = \"1h30m\"\n\n[output]\ntime_basis = \"utc\"\n",
        )?;

        let config = Config::from_config(Some(&path))?;
        assert_eq!(config.probe.target, "1.1.1.1");
        assert_eq!(config.probe.interval, "1s");

        let monitor = config.to_monitor_config()?;
        assert_eq!(monitor.method, ProbeMethod::Tcp);
        assert_eq!(monitor.max_duration, Some(Duration::from_secs(5400)));
        assert_eq!(monitor.time_basis, TimeBasis::Utc);
        assert_eq!(monitor.probe_interval, Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn test_bad_duration_names_field() {
        let mut config = Config::default();
        config.probe.interval = "soon".to_string();

        let err = config.to_monitor_config().unwrap_err();
        assert!(matches!(err, Error::InvalidValue { field: "probe.interval", .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "[probe\ntarget = ")?;

        assert!(matches!(Config::from_config(Some(&path)), Err(Error::ParseFailed { .. })));
        Ok(())
    }

    #[test]
    fn test_effective_display() {
        let config = MonitorConfig::builder("example.com")
            .probe_interval(Duration::from_secs(10))
            .max_duration(Duration::from_secs(7200))
            .build();
        let shown = Effective(&config).to_string();

        assert!(shown.starts_with("Effective Configuration:"));
        assert!(shown.contains("Target: example.com"));
        assert!(shown.contains("Duration: 2h"));
        assert!(shown.contains("Timeout: 3s"));
    }
}
