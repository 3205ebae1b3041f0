mod config;
mod error;
mod fingerprint;
mod matcher;
mod model;
mod probe;
mod scan;
mod targets;
mod utils;

pub use error::{Error, Result};

use clap::{value_parser, Arg, ArgAction, Command};
use config::{fingerprints_path, Config, DEFAULT_FINGERPRINTS_PATH};
use scan::process;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use utils::{ensure_dir, log::init_tracing_subscriber};

// log files land here with --logs
const LOGS_DIR: &str = "output/takeover";

fn main() -> Result<()> {
    let cli = cli().get_matches();

    match cli.subcommand() {
        Some(("fingerprints", args)) => {
            let fingerprints = fingerprint::load_fingerprints(&fingerprints_path(args))?;
            fingerprint::display_all(&fingerprints);
        }
        Some(("scan", args)) => {
            let config = Config::from_scan_args(args)?;

            // create filename
            let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
            let filename = format!("{}", timestamp);
            if config.save_logs {
                ensure_dir(LOGS_DIR.as_ref())?;
            }
            init_tracing_subscriber(config.save_logs, LOGS_DIR.as_ref(), &filename);

            info!(
                "Scanning {} (run_{})",
                config.targets.display(),
                timestamp
            );
            let report = process(&config).map_err(|err| {
                error!("{}", err);
                err
            })?;
            info!("{} matches reported", report.matches.len());
        }

        // fallback if a cmd is not handled (should not possible)
        _ => {
            error!("{:12} - Command not handled, exit program", "CLI ERROR");
            return Err(Error::CliUsage("Command not handled".into()));
        }
    }

    Ok(())
}

fn fingerprints_arg() -> Arg {
    Arg::new("fingerprints")
        .short('f')
        .long("fingerprints")
        .help("Fingerprint catalog (JSON)")
        .value_name("FILE")
        .default_value(DEFAULT_FINGERPRINTS_PATH)
}

fn cli() -> Command {
    Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .subcommand(
            Command::new("fingerprints")
                .about("List the services of the fingerprint catalog")
                .arg(fingerprints_arg()),
        )
        .subcommand(
            Command::new("scan")
                .about("Probe subdomains for takeover fingerprints")
                .arg(
                    Arg::new("targets")
                        .help("File with one subdomain per line")
                        .value_name("TARGETS")
                        .required(true)
                        .index(1),
                )
                .arg(fingerprints_arg())
                .arg(
                    Arg::new("concurrency")
                        .short('c')
                        .long("concurrency")
                        .help("Requests in flight, values below 1 mean 1")
                        .value_name("N")
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64))
                        .default_value("20"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Report file, stdout when unset")
                        .value_name("OUTPUT"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .help("Report format")
                        .value_name("FORMAT")
                        .value_parser(["txt", "json"])
                        .default_value("txt"),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .help("Per request timeout in seconds")
                        .value_name("SECS")
                        .value_parser(value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    Arg::new("https")
                        .long("https")
                        .action(ArgAction::SetTrue)
                        .help("Probe targets without a scheme over https"),
                )
                .arg(
                    Arg::new("insecure")
                        .short('k')
                        .long("insecure")
                        .action(ArgAction::SetTrue)
                        .help("Accept invalid TLS certificates on https probes"),
                )
                .arg(
                    Arg::new("match-mode")
                        .long("match-mode")
                        .help("Combine body, status and cname conditions with any/all")
                        .value_name("MODE")
                        .value_parser(["any", "all"])
                        .default_value("any"),
                )
                .arg(
                    Arg::new("all-status")
                        .long("all-status")
                        .action(ArgAction::SetTrue)
                        .help("Match responses of any status, not only 2xx/3xx"),
                )
                .arg(
                    Arg::new("vulnerable-only")
                        .long("vulnerable-only")
                        .action(ArgAction::SetTrue)
                        .help("Only report services flagged as vulnerable"),
                )
                .arg(
                    Arg::new("logs")
                        .short('s')
                        .long("logs")
                        .action(ArgAction::SetTrue)
                        .help("Save logs into a .log file"),
                ),
        )
        .arg_required_else_help(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchMode;
    use crate::model::OutputFormat;
    use std::path::PathBuf;
    use std::time::Duration;

    fn scan_config(args: &[&str]) -> Config {
        let matches = cli()
            .try_get_matches_from(args.iter().copied())
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        Config::from_scan_args(args).unwrap()
    }

    #[test]
    fn scan_defaults() {
        let config = scan_config(&["takeover", "scan", "subdomains.txt"]);

        assert_eq!(config.targets, PathBuf::from("subdomains.txt"));
        assert_eq!(config.fingerprints, PathBuf::from(DEFAULT_FINGERPRINTS_PATH));
        assert_eq!(config.concurrency(), 20);
        assert_eq!(config.output, None);
        assert_eq!(config.format, OutputFormat::Txt);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.match_mode, MatchMode::Any);
        assert!(!config.https && !config.accept_any_status && !config.vulnerable_only);
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn scan_flags() {
        let config = scan_config(&[
            "takeover",
            "scan",
            "subdomains.txt",
            "-f",
            "catalog.json",
            "-c",
            "-3",
            "-o",
            "report.json",
            "--format",
            "json",
            "-t",
            "2",
            "--https",
            "-k",
            "--match-mode",
            "all",
            "--all-status",
            "--vulnerable-only",
        ]);

        assert_eq!(config.fingerprints, PathBuf::from("catalog.json"));
        assert_eq!(config.concurrency, -3);
        assert_eq!(config.concurrency(), 1);
        assert_eq!(config.output, Some(PathBuf::from("report.json")));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.scheme(), "https");
        assert_eq!(config.match_mode, MatchMode::All);
        assert!(config.accept_any_status && config.vulnerable_only);
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn rejects_unknown_format() {
        let res = cli().try_get_matches_from(["takeover", "scan", "t.txt", "--format", "xml"]);
        assert!(res.is_err());
    }
}
