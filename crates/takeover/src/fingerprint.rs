use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

// region:        --- Models

/// One entry of the fingerprint catalog.
///
/// The JSON layout follows the `fingerprints.json` file published by the
/// "can-i-take-over-xyz" project, keys the scanner has no use for are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub service: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cname: Vec<String>,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub http_status: Option<u16>,
    #[serde(default)]
    pub vulnerable: bool,
    #[serde(default)]
    pub nxdomain: bool,
}

impl Fingerprint {
    /// A rule without a body pattern is inactive and never matches.
    pub fn is_active(&self) -> bool {
        !self.fingerprint.is_empty()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> core::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(cname)) => vec![cname],
        Some(OneOrMany::Many(cnames)) => cnames,
    })
}

// endregion:     --- Models

// region:        --- Loading

#[instrument(name = "fingerprints", level = "info", skip_all, fields(path = %path.display()))]
pub fn load_fingerprints(path: &Path) -> Result<Vec<Fingerprint>> {
    let content = fs::read_to_string(path).map_err(|err| Error::CatalogLoad {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    let fingerprints = parse_fingerprints(&content).map_err(|reason| Error::CatalogLoad {
        path: path.to_path_buf(),
        reason,
    })?;

    let active = fingerprints.iter().filter(|fp| fp.is_active()).count();
    info!("{} fingerprints loaded ({} active)", fingerprints.len(), active);

    Ok(fingerprints)
}

fn parse_fingerprints(content: &str) -> core::result::Result<Vec<Fingerprint>, String> {
    let fingerprints: Vec<Fingerprint> =
        serde_json::from_str(content).map_err(|err| err.to_string())?;

    if let Some(index) = fingerprints
        .iter()
        .position(|fp| fp.service.trim().is_empty())
    {
        return Err(format!("entry {} has an empty service name", index));
    }

    for fp in fingerprints.iter().filter(|fp| !fp.is_active()) {
        debug!("Inactive rule: {}", fp.service);
    }

    Ok(fingerprints)
}

/// Prints the catalog, one service per line.
pub fn display_all(fingerprints: &[Fingerprint]) {
    println!("\nFingerprints ({})", fingerprints.len());
    for fp in fingerprints {
        let state = match (fp.is_active(), fp.vulnerable) {
            (false, _) => "inactive",
            (true, true) => "vulnerable",
            (true, false) => "not vulnerable",
        };
        println!("- {:35}{}", fp.service, state);
    }
}

// endregion:     --- Loading

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"[
        {
            "cicd_pass": true,
            "cname": ["s3.amazonaws.com"],
            "discussion": "[Issue #36](https://example.invalid/36)",
            "documentation": "",
            "fingerprint": "NoSuchBucket",
            "http_status": 404,
            "nxdomain": false,
            "service": "AWS/S3",
            "status": "Vulnerable",
            "vulnerable": true
        },
        {
            "cname": "herokuapp.com",
            "fingerprint": "No such app",
            "service": "Heroku",
            "vulnerable": true
        },
        {
            "service": "Akamai",
            "http_status": null
        }
    ]"#;

    #[test]
    fn parses_catalog_shapes() {
        let fps = parse_fingerprints(CATALOG).unwrap();

        assert_eq!(fps.len(), 3);
        assert_eq!(fps[0].cname, vec!["s3.amazonaws.com".to_string()]);
        assert_eq!(fps[0].http_status, Some(404));
        assert_eq!(fps[1].cname, vec!["herokuapp.com".to_string()]);
        assert_eq!(fps[1].http_status, None);
        assert!(fps[2].cname.is_empty());
        assert!(!fps[2].is_active());
        assert!(!fps[2].vulnerable);
    }

    #[test]
    fn parses_shipped_catalog() {
        let fps = parse_fingerprints(include_str!("../data/fingerprints.json")).unwrap();

        assert!(fps.iter().any(|fp| fp.service == "AWS/S3" && fp.vulnerable));
        assert!(fps.iter().any(|fp| fp.nxdomain));
        assert!(fps.iter().any(|fp| !fp.is_active()));
    }

    #[test]
    fn shipped_patterns_are_literal() {
        let fps = parse_fingerprints(include_str!("../data/fingerprints.json")).unwrap();

        for fp in fps.iter().filter(|fp| fp.is_active()) {
            assert!(
                !fp.fingerprint.contains('\\') && !fp.fingerprint.contains("&#124;"),
                "{} carries a regex pattern",
                fp.service
            );
        }
        assert_eq!(fps.iter().filter(|fp| fp.service == "Ghost").count(), 2);
    }

    #[test]
    fn rejects_empty_service() {
        let err = parse_fingerprints(r#"[{"service": "", "fingerprint": "x"}]"#).unwrap_err();
        assert!(err.contains("entry 0"));
    }

    #[test]
    fn empty_catalog_is_legal() {
        assert!(parse_fingerprints("[]").unwrap().is_empty());
    }

    #[test]
    fn loads_test_data() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"[{"service": "TestService", "fingerprint": "NoSuchBucket"}]"#)
            .unwrap();

        let fps = load_fingerprints(file.path()).unwrap();
        assert_eq!(fps.len(), 1);
        assert_eq!(fps[0].service, "TestService");
    }

    #[test]
    fn missing_or_malformed_file_is_a_catalog_error() {
        let err = load_fingerprints(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, Error::CatalogLoad { .. }));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = load_fingerprints(file.path()).unwrap_err();
        assert!(matches!(err, Error::CatalogLoad { .. }));
    }
}
