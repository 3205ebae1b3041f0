use crate::fingerprint::Fingerprint;
use crate::model::Match;
use crate::probe::ProbeResult;
use tracing::trace;

/// How the body, status and cname conditions of a rule combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// A body or cname hit is enough, the status only narrows in `All`.
    #[default]
    Any,
    /// Every specified condition must hold.
    All,
}

impl MatchMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "any" => Some(MatchMode::Any),
            "all" => Some(MatchMode::All),
            _ => None,
        }
    }
}

/// Returns a `Match` for every fingerprint of `catalog` found in `result`, in catalog order.
pub fn match_fingerprints(
    result: &ProbeResult,
    catalog: &[Fingerprint],
    mode: MatchMode,
) -> Vec<Match> {
    catalog
        .iter()
        .filter(|fp| is_match(result, fp, mode))
        .inspect(|fp| trace!("{} matched {}", result.target, fp.service))
        .map(|fp| Match {
            target: result.target.clone(),
            service: fp.service.clone(),
            vulnerable: fp.vulnerable,
            nxdomain: fp.nxdomain,
        })
        .collect()
}

fn is_match(result: &ProbeResult, fp: &Fingerprint, mode: MatchMode) -> bool {
    // an empty pattern would be a substring of every body
    if !fp.is_active() {
        return false;
    }
    // an answer means the name resolved, so nxdomain rules can't apply
    if fp.nxdomain {
        return false;
    }

    let body = result.body.contains(fp.fingerprint.as_str());
    let cname = cname_condition(result, fp);

    match mode {
        MatchMode::Any => body || cname == Some(true),
        MatchMode::All => {
            let status = fp.http_status.map(|expected| expected == result.status);
            [Some(body), status, cname].into_iter().flatten().all(|hit| hit)
        }
    }
}

/// `None` when the rule has no usable cname pattern.
fn cname_condition(result: &ProbeResult, fp: &Fingerprint) -> Option<bool> {
    let mut patterns = fp.cname.iter().filter(|pattern| !pattern.is_empty()).peekable();
    patterns.peek()?;

    Some(patterns.any(|pattern| {
        result
            .host_aliases
            .iter()
            .any(|alias| alias.contains(pattern.as_str()))
    }))
}
