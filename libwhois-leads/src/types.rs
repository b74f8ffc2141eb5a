use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::Serialize;
use std::{collections::BTreeSet, path::PathBuf, time::Duration};

use crate::{output, parse::DEFAULT_PHONE_RE, snapshot};

/// Placeholder written for a field the WHOIS record did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Separator used when a field carries several values.
pub const FIELD_SEPARATOR: &str = " | ";

/// One contactable registrant, as written to the leads file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lead {
    pub domain: String,
    pub titleholder: String,
    pub email: String,
    pub phone: String,
    pub creation_date: String,
    pub expiration_date: String,
}

impl Lead {
    /// Builds a lead from a parsed record, or `None` when the record has no
    /// titleholder name or no qualifying phone number.
    pub fn from_record(record: &WhoisRecord, details: &ContactDetails) -> Option<Self> {
        if !details.is_contactable() {
            return None;
        }

        Some(Self {
            domain: record.domain.clone(),
            titleholder: join(&details.names),
            email: if details.emails.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                join(&details.emails)
            },
            phone: join(&details.phones),
            creation_date: record
                .creation_date
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            expiration_date: record
                .expiration_date
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        })
    }
}

fn join(values: &BTreeSet<String>) -> String {
    values
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

/// Contact fields collected across every kept handle of a WHOIS record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    pub names: BTreeSet<String>,
    pub emails: BTreeSet<String>,
    pub phones: BTreeSet<String>,
}

impl ContactDetails {
    pub fn is_contactable(&self) -> bool {
        !self.names.is_empty() && !self.phones.is_empty()
    }

    pub fn merge(&mut self, other: ContactDetails) {
        self.names.extend(other.names);
        self.emails.extend(other.emails);
        self.phones.extend(other.phones);
    }
}

/// Raw WHOIS answer for one domain plus the dates found in its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisRecord {
    pub domain: String,
    pub raw_text: String,
    pub creation_date: Option<String>,
    pub expiration_date: Option<String>,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub snapshot_date: NaiveDate,
    pub domains_found: usize,
    pub leads: Vec<Lead>,
    pub output: Option<PathBuf>,
}

impl RunReport {
    pub fn empty(snapshot_date: NaiveDate) -> Self {
        Self {
            snapshot_date,
            domains_found: 0,
            leads: Vec::new(),
            output: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Snapshot URL with a `{date}` placeholder (`YYYYMMDD`).
    pub url_template: String,
    /// Line after which the snapshot lists domains.
    pub marker: String,
    pub max_domains: usize,
    pub download_timeout: Duration,
    /// Forces every lookup to this WHOIS server instead of the TLD table.
    pub whois_server: Option<String>,
    /// No timeout is applied to WHOIS queries when `None`.
    pub whois_timeout: Option<Duration>,
    pub handle_prefix: String,
    pub phone_filter: Regex,
    /// Minimum delay between two queries to the same WHOIS server.
    pub request_interval: Duration,
    pub output_dir: PathBuf,
    /// Local wall-clock time of the daily run.
    pub run_at: NaiveTime,
}

impl HarvestConfig {
    pub fn snapshot_url(&self, date: NaiveDate) -> String {
        snapshot::snapshot_url(&self.url_template, date)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.output_dir.join(snapshot::SNAPSHOT_FILE_NAME)
    }

    pub fn leads_path(&self, date: NaiveDate) -> PathBuf {
        self.output_dir.join(output::leads_file_name(date))
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            url_template: snapshot::DEFAULT_SNAPSHOT_URL.to_string(),
            marker: snapshot::DEFAULT_MARKER.to_string(),
            max_domains: snapshot::DEFAULT_MAX_DOMAINS,
            download_timeout: Duration::from_secs(30),
            whois_server: None,
            whois_timeout: None,
            handle_prefix: "CTC".to_string(),
            phone_filter: DEFAULT_PHONE_RE.clone(),
            request_interval: Duration::from_secs(1),
            output_dir: PathBuf::from("whois_project2"),
            run_at: NaiveTime::from_hms_opt(4, 0, 0).unwrap_or_default(),
        }
    }
}
