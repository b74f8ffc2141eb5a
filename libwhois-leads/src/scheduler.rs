use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime, TimeZone};
use std::{future::Future, time::Duration};
use tracing::{info, warn};

use crate::{harvester::Harvester, types::RunReport, whois::WhoisLookup};

/// Longest single sleep; the wall clock is re-read after each one so that
/// suspend or clock changes do not push a run back by a full day.
const MAX_SLEEP: Duration = Duration::from_secs(15 * 60);

pub fn parse_run_at(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
}

/// First occurrence of `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Resolves a local wall-clock time, skipping forward over a DST gap.
fn to_local(naive: NaiveDateTime) -> DateTime<Local> {
    let mut candidate = naive;
    loop {
        if let Some(resolved) = Local.from_local_datetime(&candidate).earliest() {
            return resolved;
        }
        candidate += ChronoDuration::minutes(30);
    }
}

fn remaining(until: DateTime<Local>) -> Duration {
    (until - Local::now()).to_std().unwrap_or(Duration::ZERO)
}

/// Runs the pipeline every day at `at` (local time) until Ctrl-C.
///
/// Missed runs are not caught up; `on_report` sees each finished run.
pub async fn run_daily<W, F>(harvester: &Harvester<W>, at: NaiveTime, on_report: F)
where
    W: WhoisLookup,
    F: FnMut(&RunReport),
{
    run_daily_until(harvester, at, on_report, shutdown_signal()).await
}

/// Same as [`run_daily`], stopping as soon as `shutdown` completes, whether
/// the scheduler is waiting or a run is in progress.
pub async fn run_daily_until<W, F, S>(
    harvester: &Harvester<W>,
    at: NaiveTime,
    mut on_report: F,
    shutdown: S,
) where
    W: WhoisLookup,
    F: FnMut(&RunReport),
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let next = to_local(next_run_after(Local::now().naive_local(), at));
        info!("Next run scheduled for {}", next.format("%Y-%m-%d %H:%M"));

        let scheduled_run = async {
            loop {
                let wait = remaining(next);
                if wait.is_zero() {
                    break;
                }
                tokio::time::sleep(wait.min(MAX_SLEEP)).await;
            }
            harvester.run().await
        };

        tokio::select! {
            report = scheduled_run => on_report(&report),
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping scheduler");
                return;
            }
        }
    }
}

/// Resolves on Ctrl-C. The handler is installed once and stays in place for
/// the whole life of the scheduler.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
