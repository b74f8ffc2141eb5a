use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_SNAPSHOT_URL: &str =
    "https://www.afnic.fr/wp-media/ftp/domaineTLD_Afnic/{date}_CREA_fr.txt";
pub const DEFAULT_MARKER: &str = "#BOF";
pub const DEFAULT_MAX_DOMAINS: usize = 50;
pub const SNAPSHOT_FILE_NAME: &str = "afnic_domains.txt";

lazy_static! {
    static ref DOMAIN_RE: Regex = Regex::new(r"^[a-z0-9.-]+\.[a-z]{2,}$").expect("valid regex");
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to fetch snapshot: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("Snapshot request returned HTTP {0}")]
    Status(u16),
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot file not found: {}", .0.display())]
    Missing(PathBuf),
}

/// The registry publishes the creations of a given day the morning after.
pub fn snapshot_date_for(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(today)
}

pub fn snapshot_url(template: &str, date: NaiveDate) -> String {
    template.replace("{date}", &date.format("%Y%m%d").to_string())
}

/// Downloads the snapshot at `url` into `dest`, returning the byte count.
///
/// Any file already at `dest` is removed first, so a failed download leaves
/// nothing behind for the extraction stage to pick up.
pub async fn fetch_snapshot(client: &Client, url: &str, dest: &Path) -> Result<usize, SnapshotError> {
    match tokio::fs::remove_file(dest).await {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SnapshotError::Status(status.as_u16()));
    }
    let body = response.bytes().await?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &body).await?;

    Ok(body.len())
}

/// Collects up to `limit` domain lines found after the `marker` line, in file order.
pub fn extract_domains(text: &str, marker: &str, limit: usize) -> Vec<String> {
    let mut domains = Vec::new();
    if limit == 0 {
        return domains;
    }

    let mut collecting = false;
    for line in text.lines() {
        let line = line.trim();
        if line == marker {
            collecting = true;
            continue;
        }
        if collecting && DOMAIN_RE.is_match(line) {
            domains.push(line.to_string());
            if domains.len() >= limit {
                break;
            }
        }
    }

    domains
}

pub async fn read_domains(path: &Path, marker: &str, limit: usize) -> Result<Vec<String>, SnapshotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SnapshotError::Missing(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    Ok(extract_domains(&String::from_utf8_lossy(&bytes), marker, limit))
}
