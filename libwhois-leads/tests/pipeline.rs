//! End-to-end pipeline tests: snapshot served over HTTP, WHOIS answers from fixtures.

use chrono::NaiveDate;
use libwhois_leads::{HarvestConfig, Harvester, WhoisError, WhoisLookup};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SNAPSHOT: &str = include_str!("fixtures/20240105_CREA_fr.txt");

const QUALIFYING: &str = "\
domain:      boulangerie-dupont.fr
status:      ACTIVE
holder-c:    CTC101
Expiry Date: 2025-01-05T09:12:00Z
created:     2024-01-05T09:12:00Z

nic-hdl:     CTC101
type:        PERSON
contact:     Jean Dupont
phone:       +33.612345678
e-mail:      jean@boulangerie-dupont.fr
source:      FRNIC

nic-hdl:     GAND1-FRNIC
contact:     Gandi
phone:       +33.170377661
e-mail:      support@gandi.net
";

const NO_PHONE: &str = "\
domain:      atelier-martin.fr
created:     2024-01-05T11:00:00Z

nic-hdl:     CTC202
contact:     Alice Martin
phone:       +33.145678901
e-mail:      alice@atelier-martin.fr
";

/// WHOIS answers keyed by domain; unknown domains fail like a refused connection.
struct FixtureWhois {
    answers: HashMap<&'static str, &'static str>,
}

impl FixtureWhois {
    fn new(answers: &[(&'static str, &'static str)]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
        }
    }
}

impl WhoisLookup for FixtureWhois {
    async fn lookup(&self, domain: &str) -> Result<String, WhoisError> {
        self.answers
            .get(domain)
            .map(|raw| raw.to_string())
            .ok_or_else(|| {
                WhoisError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))
            })
    }
}

fn snapshot_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
}

fn test_config(server: &MockServer, output_dir: &Path) -> HarvestConfig {
    HarvestConfig {
        url_template: format!("{}/{{date}}_CREA_fr.txt", server.uri()),
        download_timeout: Duration::from_secs(5),
        request_interval: Duration::ZERO,
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}

async fn serve_snapshot(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/20240105_CREA_fr.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SNAPSHOT))
        .mount(server)
        .await;
}

#[tokio::test]
async fn writes_only_the_qualifying_domain() {
    let server = MockServer::start().await;
    serve_snapshot(&server).await;
    let tmp = TempDir::new().unwrap();

    let whois = FixtureWhois::new(&[
        ("boulangerie-dupont.fr", QUALIFYING),
        ("atelier-martin.fr", NO_PHONE),
    ]);
    let harvester = Harvester::with_whois(test_config(&server, tmp.path()), whois).unwrap();

    let report = harvester.run_for_date(snapshot_date()).await;

    assert_eq!(report.domains_found, 3);
    assert_eq!(report.leads.len(), 1);
    let output = report.output.expect("leads file should be written");
    assert_eq!(output, tmp.path().join("Lead_20240105.csv"));
    assert!(tmp.path().join("afnic_domains.txt").exists());

    let mut reader = csv::Reader::from_path(&output).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["domain", "titleholder", "email", "phone", "creation_date", "expiration_date"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].iter().collect::<Vec<_>>(),
        vec![
            "boulangerie-dupont.fr",
            "Jean Dupont",
            "jean@boulangerie-dupont.fr",
            "+33.612345678",
            "2024-01-05T09:12:00Z",
            "2025-01-05T09:12:00Z",
        ]
    );
}

#[tokio::test]
async fn download_failure_skips_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();

    let whois = FixtureWhois::new(&[("boulangerie-dupont.fr", QUALIFYING)]);
    let harvester = Harvester::with_whois(test_config(&server, tmp.path()), whois).unwrap();

    let report = harvester.run_for_date(snapshot_date()).await;

    assert_eq!(report.domains_found, 0);
    assert!(report.leads.is_empty());
    assert!(report.output.is_none());
    assert!(!tmp.path().join("Lead_20240105.csv").exists());
}

#[tokio::test]
async fn stale_snapshot_is_not_reused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("afnic_domains.txt"), SNAPSHOT).unwrap();

    let whois = FixtureWhois::new(&[("boulangerie-dupont.fr", QUALIFYING)]);
    let harvester = Harvester::with_whois(test_config(&server, tmp.path()), whois).unwrap();

    let report = harvester.run_for_date(snapshot_date()).await;

    assert_eq!(report.domains_found, 0);
    assert!(!tmp.path().join("afnic_domains.txt").exists());
}

#[tokio::test]
async fn no_leads_writes_no_file() {
    let server = MockServer::start().await;
    serve_snapshot(&server).await;
    let tmp = TempDir::new().unwrap();

    let whois = FixtureWhois::new(&[("atelier-martin.fr", NO_PHONE)]);
    let harvester = Harvester::with_whois(test_config(&server, tmp.path()), whois).unwrap();

    let report = harvester.run_for_date(snapshot_date()).await;

    assert_eq!(report.domains_found, 3);
    assert!(report.output.is_none());
    assert!(!tmp.path().join("Lead_20240105.csv").exists());
}

#[tokio::test]
async fn domain_cap_is_configurable() {
    let server = MockServer::start().await;
    serve_snapshot(&server).await;
    let tmp = TempDir::new().unwrap();

    let config = HarvestConfig {
        max_domains: 2,
        ..test_config(&server, tmp.path())
    };
    let harvester = Harvester::with_whois(config, FixtureWhois::new(&[])).unwrap();

    let report = harvester.run_for_date(snapshot_date()).await;
    assert_eq!(report.domains_found, 2);
}
