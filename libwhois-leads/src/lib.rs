mod harvester;
mod http;
pub mod output;
pub mod parse;
mod ratelimit;
pub mod scheduler;
pub mod snapshot;
mod types;
pub mod whois;

pub use harvester::Harvester;
pub use output::OutputError;
pub use snapshot::SnapshotError;
pub use types::{ContactDetails, HarvestConfig, Lead, RunReport, WhoisRecord, FIELD_SEPARATOR, NOT_AVAILABLE};
pub use whois::{WhoisClient, WhoisError, WhoisLookup};
