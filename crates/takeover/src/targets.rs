use crate::{Error, Result};
use lazy_regex::regex_is_match;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;
use url::Url;

/// Reads one target per line, skipping blank lines. Order and duplicates are kept.
pub fn read_targets(path: &Path) -> Result<Vec<String>> {
    let to_error = |source| Error::TargetLoad {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(to_error)?;
    let mut targets = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(to_error)?;
        let target = line.trim();
        if !target.is_empty() {
            targets.push(target.to_string());
        }
    }

    info!("{:12} - {}", "TARGETS", targets.len());
    Ok(targets)
}

pub fn is_valid_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|host| !host.is_empty()),
        Err(_) => false,
    }
}

/// Builds the URL to probe, `scheme` is only applied to targets without one.
pub fn probe_url(target: &str, scheme: &str) -> String {
    if regex_is_match!(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://", target) {
        target.to_string()
    } else {
        format!("{}://{}", scheme, target)
    }
}
