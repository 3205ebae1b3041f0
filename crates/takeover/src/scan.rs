use crate::config::Config;
use crate::fingerprint::{load_fingerprints, Fingerprint};
use crate::matcher::{match_fingerprints, MatchMode};
use crate::model::{write_report, Match, ScanReport};
use crate::probe::{HttpProber, ProbeError, Prober};
use crate::targets::{is_valid_url, probe_url, read_targets};
use crate::{Error, Result};
use futures::StreamExt;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, instrument, warn};

// region:        --- Models

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub concurrency: usize,
    pub scheme: &'static str,
    pub match_mode: MatchMode,
    pub accept_any_status: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            scheme: "http",
            match_mode: MatchMode::Any,
            accept_any_status: false,
        }
    }
}

impl From<&Config> for ScanOptions {
    fn from(config: &Config) -> Self {
        Self {
            concurrency: config.concurrency(),
            scheme: config.scheme(),
            match_mode: config.match_mode,
            accept_any_status: config.accept_any_status,
        }
    }
}

/// What a worker sends back to the collector for one target.
#[derive(Debug)]
enum Outcome {
    Skipped,
    Failed,
    Probed(Vec<Match>),
}

// endregion:     --- Models

// region:        --- Process

/// Runs a full scan described by `config`: load, probe, then write the report.
#[tokio::main]
#[instrument(name = "process", level = "info", skip_all)]
pub async fn process(config: &Config) -> Result<ScanReport> {
    // fatal errors come first, before anything is sent
    let catalog: Arc<[Fingerprint]> = load_fingerprints(&config.fingerprints)?.into();
    let targets = read_targets(&config.targets)?;

    let prober = HttpProber::with_options(config.timeout, config.accept_invalid_certs)?;
    let mut report = scan(&prober, targets, catalog, ScanOptions::from(config)).await;

    if config.vulnerable_only {
        report.retain_vulnerable();
    }

    let output_error = |source: io::Error| Error::OutputWrite {
        path: config.output.clone(),
        source,
    };
    let mut sink: Box<dyn Write> = match &config.output {
        Some(path) => Box::new(File::create(path).map_err(output_error)?),
        None => Box::new(io::stdout().lock()),
    };
    write_report(&report, Some(&mut *sink), config.format).map_err(|err| match err {
        Error::File(source) => output_error(source),
        other => other,
    })?;

    Ok(report)
}

// endregion:     --- Process

// region:        --- Scan

/// Probes every target with at most `options.concurrency` requests in flight.
///
/// Per-target failures are logged and counted, they never fail the scan.
#[instrument(name = "scan", level = "info", skip_all)]
pub async fn scan<P>(
    prober: &P,
    targets: Vec<String>,
    catalog: Arc<[Fingerprint]>,
    options: ScanOptions,
) -> ScanReport
where
    P: Prober + ?Sized,
{
    let concurrency = options.concurrency.max(1);
    info!(
        "{} targets, {} fingerprints, {} workers",
        targets.len(),
        catalog.len(),
        concurrency
    );

    // targets queue, fed by a single producer
    let (targets_tx, targets_rx) = mpsc::channel::<String>(concurrency);
    // outcomes channel, drained by the collector below
    let (outcomes_tx, mut outcomes_rx) = mpsc::channel::<Outcome>(concurrency);

    tokio::spawn(async move {
        for target in targets {
            if targets_tx.send(target).await.is_err() {
                break;
            }
        }
    });

    let workers = ReceiverStream::new(targets_rx).for_each_concurrent(concurrency, move |target| {
        let outcomes_tx = outcomes_tx.clone();
        let catalog = Arc::clone(&catalog);
        async move {
            let outcome = scan_target(prober, &target, &catalog, options).await;
            let _ = outcomes_tx.send(outcome).await;
        }
    });

    let collector = async {
        let mut report = ScanReport::default();
        while let Some(outcome) = outcomes_rx.recv().await {
            match outcome {
                Outcome::Skipped => report.skipped += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Probed(matches) => {
                    report.probed += 1;
                    for m in &matches {
                        info!("{:12} - {} ({})", "MATCH", m.target, m.service);
                    }
                    report.matches.extend(matches);
                }
            }
        }
        report
    };

    // the workers future owns the last sender, the collector ends when it completes
    let ((), report) = tokio::join!(workers, collector);

    info!(
        "{} probed, {} skipped, {} failed, {} matches",
        report.probed,
        report.skipped,
        report.failed,
        report.matches.len()
    );
    report
}

async fn scan_target<P>(
    prober: &P,
    target: &str,
    catalog: &[Fingerprint],
    options: ScanOptions,
) -> Outcome
where
    P: Prober + ?Sized,
{
    let url = probe_url(target, options.scheme);
    if !is_valid_url(&url) {
        warn!("{}: {}", target, ProbeError::InvalidUrl(url));
        return Outcome::Skipped;
    }

    let result = match prober.probe(target, &url).await {
        Ok(result) if options.accept_any_status || result.is_success_or_redirect() => result,
        Ok(result) => {
            warn!("{}: {}", target, ProbeError::Status(result.status));
            return Outcome::Failed;
        }
        Err(err) => {
            warn!("{}: {}", target, err);
            return Outcome::Failed;
        }
    };

    let matches = match_fingerprints(&result, catalog, options.match_mode);
    debug!("{}: {} matches", result.url, matches.len());
    Outcome::Probed(matches)
}

// endregion:     --- Scan
