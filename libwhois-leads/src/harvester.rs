use crate::{
    http::create_http_client,
    output::{log_preview, save_leads},
    parse::{parse_contacts, parse_record},
    ratelimit::ServerRateLimiters,
    snapshot::{fetch_snapshot, read_domains, snapshot_date_for},
    types::{HarvestConfig, Lead, RunReport},
    whois::{extract_tld, WhoisClient, WhoisError, WhoisLookup},
};
use chrono::{Local, NaiveDate};
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs the snapshot → WHOIS → leads pipeline.
pub struct Harvester<W = WhoisClient> {
    client: Client,
    whois: W,
    rate_limiters: Arc<ServerRateLimiters>,
    config: HarvestConfig,
}

impl Harvester<WhoisClient> {
    pub fn with_config(config: HarvestConfig) -> Result<Self, reqwest::Error> {
        let mut whois = WhoisClient::new().with_timeout(config.whois_timeout);
        if let Some(server) = &config.whois_server {
            whois = whois.with_server(server.clone());
        }
        Self::with_whois(config, whois)
    }
}

impl<W: WhoisLookup> Harvester<W> {
    pub fn with_whois(config: HarvestConfig, whois: W) -> Result<Self, reqwest::Error> {
        let client = create_http_client(config.download_timeout)?;
        Ok(Self {
            client,
            whois,
            rate_limiters: Arc::new(ServerRateLimiters::new(config.request_interval)),
            config,
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Runs the pipeline for yesterday's snapshot.
    pub async fn run(&self) -> RunReport {
        self.run_for_date(snapshot_date_for(Local::now().date_naive()))
            .await
    }

    /// Runs the pipeline for the snapshot published for `date`.
    ///
    /// Every failure is logged and ends the run early with whatever the report
    /// holds at that point; nothing is returned as an error.
    pub async fn run_for_date(&self, date: NaiveDate) -> RunReport {
        let mut report = RunReport::empty(date);
        let snapshot_path = self.config.snapshot_path();

        let url = self.config.snapshot_url(date);
        info!("Downloading AFNIC snapshot: {}", url);
        match fetch_snapshot(&self.client, &url, &snapshot_path).await {
            Ok(bytes) => info!("Snapshot saved to {} ({} bytes)", snapshot_path.display(), bytes),
            Err(e) => error!("Snapshot download failed: {}", e),
        }

        let domains = match read_domains(
            &snapshot_path,
            &self.config.marker,
            self.config.max_domains,
        )
        .await
        {
            Ok(domains) => domains,
            Err(e) => {
                error!("{}", e);
                return report;
            }
        };
        info!(
            "{} domains found (limit {})",
            domains.len(),
            self.config.max_domains
        );
        report.domains_found = domains.len();

        if domains.is_empty() {
            error!("No domain found after {}", self.config.marker);
            return report;
        }

        report.leads = self.collect_leads(&domains).await;
        if report.leads.is_empty() {
            error!("No domain matches the lead criteria");
            return report;
        }

        log_preview(&report.leads);
        match save_leads(&self.config.output_dir, date, &report.leads) {
            Ok(path) => {
                info!("{} leads saved to {}", report.leads.len(), path.display());
                report.output = Some(path);
            }
            Err(e) => error!("{}", e),
        }

        report
    }

    /// Looks up each domain in turn, keeping the ones that yield a lead.
    pub async fn collect_leads(&self, domains: &[String]) -> Vec<Lead> {
        let mut leads = Vec::new();

        for domain in domains {
            match self.lookup_lead(domain).await {
                Ok(Some(lead)) => {
                    info!("{} added", domain);
                    leads.push(lead);
                }
                Ok(None) => warn!("{} skipped (no titleholder or qualifying phone)", domain),
                Err(e) => error!("WHOIS lookup failed for {}: {}", domain, e),
            }
        }

        leads
    }

    pub async fn lookup_lead(&self, domain: &str) -> Result<Option<Lead>, WhoisError> {
        let server = match self.whois.server_for(domain) {
            Some(server) => server,
            None => extract_tld(domain)?,
        };
        self.rate_limiters.acquire(&server).await;

        info!("WHOIS lookup for {}", domain);
        let raw = self.whois.lookup(domain).await?;

        let record = parse_record(domain, &raw);
        let details = parse_contacts(
            &record.raw_text,
            &self.config.handle_prefix,
            &self.config.phone_filter,
        );

        Ok(Lead::from_record(&record, &details))
    }
}
