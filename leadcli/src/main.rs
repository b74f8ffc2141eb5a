mod config;

use chrono::NaiveDate;
use clap::Parser;
use libwhois_leads::{scheduler::run_daily, HarvestConfig, Harvester, RunReport, WhoisLookup};
use std::{
    io::{self, Write},
    path::PathBuf,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{config_path, get_default_config_toml, load_config};

#[derive(Parser, Debug)]
#[command(name = "leads")]
#[command(about = "Harvest contactable registrants from the AFNIC daily creation list", long_about = None)]
struct Args {
    /// Run the pipeline once and exit instead of staying up for the daily run
    #[arg(long)]
    once: bool,

    /// Snapshot date to process (YYYYMMDD); implies a single run
    #[arg(long, value_parser = parse_snapshot_date)]
    date: Option<NaiveDate>,

    /// Directory for the snapshot and the leads files
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Also print each lead to stdout as NDJSON (one JSON object per line)
    #[arg(long, short = 'j')]
    ndjson: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the default config to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Write the default config to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

/// What the process does once configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// One run for the given snapshot date.
    Date(NaiveDate),
    /// One run for yesterday's snapshot.
    Once,
    /// One run now, then one every day at the configured time.
    Daily,
}

impl Args {
    fn mode(&self) -> Mode {
        match (self.date, self.once) {
            (Some(date), _) => Mode::Date(date),
            (None, true) => Mode::Once,
            (None, false) => Mode::Daily,
        }
    }
}

fn parse_snapshot_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|e| format!("expected YYYYMMDD ({})", e))
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn print_ndjson(report: &RunReport) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    for lead in &report.leads {
        if let Ok(json) = serde_json::to_string(lead) {
            writeln!(stdout, "{}", json)?;
        }
    }
    stdout.flush()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = Args::parse();

    if args.print_default_config {
        println!("{}", get_default_config_toml());
        return Ok(());
    }

    if args.write_default_config {
        if let Some(path) = config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, get_default_config_toml())?;
            println!("Default config written to: {}", path.display());
        } else {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
        return Ok(());
    }

    init_logging(args.verbose);

    let mut harvest_config = load_config(args.config.as_deref())?.into_harvest_config()?;
    if let Some(dir) = args.output_dir.take() {
        harvest_config.output_dir = dir;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args, harvest_config))
}

async fn run(args: Args, config: HarvestConfig) -> Result<(), Box<dyn std::error::Error>> {
    let harvester = Harvester::with_config(config)?;

    let ndjson = args.ndjson;
    let on_report = |report: &RunReport| {
        info!(
            "Run for {} finished: {} domains, {} leads",
            report.snapshot_date.format("%Y%m%d"),
            report.domains_found,
            report.leads.len()
        );
        if ndjson {
            if let Err(e) = print_ndjson(report) {
                error!("Failed to write NDJSON: {}", e);
            }
        }
    };

    execute(&harvester, args.mode(), on_report).await;
    Ok(())
}

async fn execute<W, F>(harvester: &Harvester<W>, mode: Mode, mut on_report: F)
where
    W: WhoisLookup,
    F: FnMut(&RunReport),
{
    match mode {
        Mode::Date(date) => on_report(&harvester.run_for_date(date).await),
        Mode::Once => on_report(&harvester.run().await),
        Mode::Daily => {
            on_report(&harvester.run().await);

            let run_at = harvester.config().run_at;
            info!(
                "Harvester scheduled to run every day at {}",
                run_at.format("%H:%M")
            );
            run_daily(harvester, run_at, on_report).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libwhois_leads::WhoisError;

    #[test]
    fn snapshot_date_flag() {
        assert_eq!(
            parse_snapshot_date("20240229").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_snapshot_date("2024-02-29").is_err());
        assert!(parse_snapshot_date("20230229").is_err());
    }

    #[test]
    fn mode_selection() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(
            Args::parse_from(["leads", "--date", "20240105"]).mode(),
            Mode::Date(date)
        );
        assert_eq!(
            Args::parse_from(["leads", "--once", "--date", "20240105"]).mode(),
            Mode::Date(date)
        );
        assert_eq!(Args::parse_from(["leads", "--once"]).mode(), Mode::Once);
        assert_eq!(Args::parse_from(["leads"]).mode(), Mode::Daily);
    }

    struct NoWhois;

    impl WhoisLookup for NoWhois {
        async fn lookup(&self, domain: &str) -> Result<String, WhoisError> {
            Err(WhoisError::EmptyResponse(domain.to_string()))
        }
    }

    fn offline_harvester(dir: &std::path::Path) -> Harvester<NoWhois> {
        let config = HarvestConfig {
            url_template: "http://127.0.0.1:9/{date}_CREA_fr.txt".to_string(),
            download_timeout: std::time::Duration::from_secs(2),
            output_dir: dir.to_path_buf(),
            ..Default::default()
        };
        Harvester::with_whois(config, NoWhois).unwrap()
    }

    #[tokio::test]
    async fn dated_mode_runs_once_for_that_date() {
        let dir = tempfile::TempDir::new().unwrap();
        let harvester = offline_harvester(dir.path());
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let mut seen = Vec::new();

        execute(&harvester, Mode::Date(date), |report: &RunReport| {
            seen.push(report.snapshot_date)
        })
        .await;

        assert_eq!(seen, vec![date]);
    }

    #[tokio::test]
    async fn once_mode_runs_once_for_yesterday() {
        let dir = tempfile::TempDir::new().unwrap();
        let harvester = offline_harvester(dir.path());
        let mut seen = Vec::new();

        execute(&harvester, Mode::Once, |report: &RunReport| {
            seen.push(report.snapshot_date)
        })
        .await;

        assert_eq!(seen.len(), 1);
        assert!(seen[0] < chrono::Local::now().date_naive());
    }

    #[test]
    fn args_parse() {
        let args = Args::parse_from(["leads", "--once", "-vv", "-o", "out", "--date", "20240105"]);
        assert!(args.once);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(!args.ndjson);
    }

    #[test]
    fn no_flags_is_standing_service() {
        let args = Args::parse_from(["leads"]);
        assert!(!args.once);
        assert!(args.date.is_none());
        assert_eq!(args.verbose, 0);
    }
}
