use std::{future::Future, time::Duration};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const WHOIS_PORT: u16 = 43;

#[derive(Debug, Error)]
pub enum WhoisError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
    #[error("No WHOIS server for .{0}")]
    NoServer(String),
    #[error("WHOIS error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WHOIS timeout after {0:?}")]
    Timeout(Duration),
    #[error("Empty WHOIS response for {0}")]
    EmptyResponse(String),
}

/// Source of raw WHOIS text for a domain.
pub trait WhoisLookup {
    fn lookup(&self, domain: &str) -> impl Future<Output = Result<String, WhoisError>> + Send;

    /// Server answering for `domain`, used to space out queries per server.
    fn server_for(&self, domain: &str) -> Option<String> {
        whois_server_for(domain).map(str::to_string)
    }
}

pub fn extract_tld(domain: &str) -> Result<String, WhoisError> {
    domain
        .rsplit('.')
        .next()
        .filter(|s| !s.is_empty() && domain.contains('.'))
        .map(|s| s.to_lowercase())
        .ok_or_else(|| WhoisError::InvalidDomain(domain.to_string()))
}

pub fn whois_server_for(domain: &str) -> Option<&'static str> {
    let tld = extract_tld(domain).ok()?;

    let server = match tld.as_str() {
        // AFNIC also runs the overseas territories
        "fr" | "re" | "pm" | "tf" | "wf" | "yt" => "whois.nic.fr",
        "com" | "net" => "whois.verisign-grs.com",
        "org" => "whois.pir.org",
        "io" => "whois.nic.io",
        "dev" | "app" => "whois.nic.google",
        "ai" => "whois.nic.ai",
        "co" => "whois.nic.co",
        "me" => "whois.nic.me",
        "eu" => "whois.eu",
        "be" => "whois.dns.be",
        _ => return None,
    };
    Some(server)
}

/// Plain WHOIS (RFC 3912) client.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    server: Option<String>,
    port: u16,
    timeout: Option<Duration>,
}

impl WhoisClient {
    pub fn new() -> Self {
        Self {
            server: None,
            port: WHOIS_PORT,
            timeout: None,
        }
    }

    /// Sends every query to `server` instead of picking one from the TLD.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn query(&self, server: &str, domain: &str) -> Result<String, WhoisError> {
        let mut stream = TcpStream::connect((server, self.port)).await?;
        stream.write_all(format!("{}\r\n", domain).as_bytes()).await?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;

        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoisLookup for WhoisClient {
    async fn lookup(&self, domain: &str) -> Result<String, WhoisError> {
        let server = match self.server_for(domain) {
            Some(server) => server,
            None => return Err(WhoisError::NoServer(extract_tld(domain)?)),
        };
        debug!(domain, server = %server, "querying WHOIS");

        let response = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.query(&server, domain))
                .await
                .map_err(|_| WhoisError::Timeout(timeout))??,
            None => self.query(&server, domain).await?,
        };

        if response.trim().is_empty() {
            return Err(WhoisError::EmptyResponse(domain.to_string()));
        }
        Ok(response)
    }

    fn server_for(&self, domain: &str) -> Option<String> {
        self.server
            .clone()
            .or_else(|| whois_server_for(domain).map(str::to_string))
    }
}
