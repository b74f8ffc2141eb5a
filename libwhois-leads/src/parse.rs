//! Contact extraction from free-text WHOIS answers.
//!
//! The parser targets the AFNIC layout: a domain header (`domain:`,
//! `created:`, `Expiry Date:` ...) followed by one block per contact, each
//! opened by a `nic-hdl:` line. Registrant handles created by registrars carry
//! the `CTC` prefix; registrar and technical role handles do not.
//!
//! Only the first `contact:`, `e-mail:` and `phone:` line of each block is
//! read. Values run to the end of the line.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{ContactDetails, WhoisRecord};

lazy_static! {
    static ref HANDLE_RE: Regex = Regex::new(r"nic-hdl:\s+([A-Z0-9-]+)").expect("valid regex");
    static ref NAME_RE: Regex = Regex::new(r"contact:\s+(.*)").expect("valid regex");
    static ref EMAIL_RE: Regex = Regex::new(r"e-mail:\s+(.*)").expect("valid regex");
    static ref PHONE_RE: Regex = Regex::new(r"phone:\s+(.*)").expect("valid regex");
    static ref CREATED_RE: Regex =
        Regex::new(r"(?mi)^[ \t]*(?:created|creation date):[ \t]*(\S.*)$")
            .expect("valid regex");
    static ref EXPIRES_RE: Regex = Regex::new(
        r"(?mi)^[ \t]*(?:expiry date|expiry-date|registry expiry date|expiration date):[ \t]*(\S.*)$"
    )
    .expect("valid regex");
    /// French mobile numbers: `+33.6...`, `+33.7...`, `+33.06...`.
    pub(crate) static ref DEFAULT_PHONE_RE: Regex =
        Regex::new(r"^\+33\.?0?(6|7)").expect("valid regex");
}

const HANDLE_KEY: &str = "nic-hdl:";

/// Every `nic-hdl` identifier in the record, first occurrence order, no repeats.
pub fn parse_handles(raw: &str) -> Vec<String> {
    let mut handles: Vec<String> = Vec::new();
    for caps in HANDLE_RE.captures_iter(raw) {
        let handle = &caps[1];
        if !handles.iter().any(|h| h == handle) {
            handles.push(handle.to_string());
        }
    }
    handles
}

/// The text from `nic-hdl: <handle>` up to the next `nic-hdl:` line, or the
/// end of the record.
///
/// The handle must match exactly: `CTC1` does not select the block of `CTC12`.
pub fn contact_block<'a>(raw: &'a str, handle: &str) -> Option<&'a str> {
    let found = HANDLE_RE
        .captures_iter(raw)
        .find(|caps| &caps[1] == handle)?;
    let whole = found.get(0)?;

    let rest = &raw[whole.end()..];
    let end = rest
        .find(HANDLE_KEY)
        .map_or(raw.len(), |offset| whole.end() + offset);

    Some(&raw[whole.start()..end])
}

fn first_value(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn is_qualifying_phone(phone: &str) -> bool {
    DEFAULT_PHONE_RE.is_match(phone)
}

/// Contact fields of one block. Phones not matching `phone_filter` are dropped.
pub fn parse_block(block: &str, phone_filter: &Regex) -> ContactDetails {
    let mut details = ContactDetails::default();

    if let Some(name) = first_value(&NAME_RE, block) {
        details.names.insert(name);
    }
    if let Some(email) = first_value(&EMAIL_RE, block) {
        details.emails.insert(email);
    }
    if let Some(phone) = first_value(&PHONE_RE, block) {
        if phone_filter.is_match(&phone) {
            details.phones.insert(phone);
        }
    }

    details
}

/// Union of the contact fields of every handle starting with `prefix`.
pub fn parse_contacts(raw: &str, prefix: &str, phone_filter: &Regex) -> ContactDetails {
    let mut details = ContactDetails::default();

    for handle in parse_handles(raw) {
        if !handle.starts_with(prefix) {
            continue;
        }
        if let Some(block) = contact_block(raw, &handle) {
            details.merge(parse_block(block, phone_filter));
        }
    }

    details
}

pub fn parse_record(domain: &str, raw: &str) -> WhoisRecord {
    WhoisRecord {
        domain: domain.to_string(),
        raw_text: raw.to_string(),
        creation_date: first_value(&CREATED_RE, raw),
        expiration_date: first_value(&EXPIRES_RE, raw),
    }
}
