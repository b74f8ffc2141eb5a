//! Leads file writer.

use chrono::NaiveDate;
use csv::WriterBuilder;
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

use crate::types::Lead;

pub const LEADS_HEADER: [&str; 6] = [
    "domain",
    "titleholder",
    "email",
    "phone",
    "creation_date",
    "expiration_date",
];

const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write leads file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode leads: {0}")]
    Csv(#[from] csv::Error),
}

pub fn leads_file_name(date: NaiveDate) -> String {
    format!("Lead_{}.csv", date.format("%Y%m%d"))
}

/// Writes the header row followed by one row per lead.
pub fn write_leads<W: Write>(writer: W, leads: &[Lead]) -> Result<(), OutputError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    writer.write_record(LEADS_HEADER)?;
    for lead in leads {
        writer.serialize(lead)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes `leads` to `<dir>/Lead_<date>.csv`, creating `dir` if needed.
pub fn save_leads(dir: &Path, date: NaiveDate, leads: &[Lead]) -> Result<PathBuf, OutputError> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(leads_file_name(date));
    let file = File::create(&path)?;
    write_leads(file, leads)?;

    Ok(path)
}

pub fn log_preview(leads: &[Lead]) {
    info!("Preview of the first {} leads:", PREVIEW_ROWS.min(leads.len()));
    for lead in leads.iter().take(PREVIEW_ROWS) {
        info!(
            "  {} | {} | {} | {}",
            lead.domain, lead.titleholder, lead.email, lead.phone
        );
    }
}
