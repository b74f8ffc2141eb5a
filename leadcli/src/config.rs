use libwhois_leads::{scheduler::parse_run_at, snapshot, HarvestConfig};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid phone_pattern: {0}")]
    PhonePattern(#[from] regex::Error),
    #[error("Invalid run_at {0:?}, expected HH:MM")]
    RunAt(String),
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub whois: WhoisConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub url_template: String,
    pub marker: String,
    pub max_domains: usize,
    pub timeout_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            url_template: snapshot::DEFAULT_SNAPSHOT_URL.to_string(),
            marker: snapshot::DEFAULT_MARKER.to_string(),
            max_domains: snapshot::DEFAULT_MAX_DOMAINS,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct WhoisConfig {
    pub server: Option<String>,
    pub handle_prefix: String,
    pub phone_pattern: String,
    pub request_interval_ms: u64,
    pub timeout_secs: Option<u64>,
}

impl Default for WhoisConfig {
    fn default() -> Self {
        Self {
            server: None,
            handle_prefix: "CTC".to_string(),
            phone_pattern: r"^\+33\.?0?(6|7)".to_string(),
            request_interval_ms: 1000,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("whois_project2"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub run_at: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            run_at: "04:00".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn into_harvest_config(self) -> Result<HarvestConfig, ConfigError> {
        let phone_filter = regex::Regex::new(&self.whois.phone_pattern)?;
        let run_at = parse_run_at(&self.schedule.run_at)
            .map_err(|_| ConfigError::RunAt(self.schedule.run_at.clone()))?;

        Ok(HarvestConfig {
            url_template: self.snapshot.url_template,
            marker: self.snapshot.marker,
            max_domains: self.snapshot.max_domains,
            download_timeout: Duration::from_secs(self.snapshot.timeout_secs),
            whois_server: self.whois.server.filter(|s| !s.trim().is_empty()),
            whois_timeout: self.whois.timeout_secs.map(Duration::from_secs),
            handle_prefix: self.whois.handle_prefix,
            phone_filter,
            request_interval: Duration::from_millis(self.whois.request_interval_ms),
            output_dir: self.output.dir,
            run_at,
        })
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("leads").join("config.toml"))
}

/// Loads `explicit` if given, else the default config path if it exists,
/// else built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    Config::from_toml(&path, &content)
}

pub fn get_default_config_toml() -> String {
    r##"# AFNIC leads harvester configuration

[snapshot]
# {date} is replaced by the snapshot date as YYYYMMDD
url_template = "https://www.afnic.fr/wp-media/ftp/domaineTLD_Afnic/{date}_CREA_fr.txt"
marker = "#BOF"
max_domains = 50
timeout_secs = 30

[whois]
# Force a single WHOIS server instead of picking one per TLD
# server = "whois.nic.fr"
handle_prefix = "CTC"
phone_pattern = '^\+33\.?0?(6|7)'
request_interval_ms = 1000
# No timeout on WHOIS queries unless set
# timeout_secs = 10

[output]
dir = "whois_project2"

[schedule]
# Local time of the daily run
run_at = "04:00"
"##
    .to_string()
}
