use derive_more::From;
use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    CliUsage(String),

    // -- Fatal, raised before any probe is sent
    CatalogLoad {
        path: PathBuf,
        reason: String,
    },
    TargetLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    // -- Fatal, raised after the scan completed
    OutputWrite {
        path: Option<PathBuf>,
        source: std::io::Error,
    },

    #[from]
    SystemTime(std::time::SystemTimeError),

    #[from]
    File(std::io::Error),

    #[from]
    Reqwest(reqwest::Error),

    #[from]
    Json(serde_json::Error),

    #[from]
    Fmt(std::fmt::Error),

    #[from]
    TimeFormat(time::error::Format),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        match self {
            Error::CatalogLoad { path, reason } => {
                write!(fmt, "cannot load fingerprints from {}: {reason}", path.display())
            }
            Error::TargetLoad { path, source } => {
                write!(fmt, "cannot read targets from {}: {source}", path.display())
            }
            Error::OutputWrite {
                path: Some(path),
                source,
            } => write!(fmt, "cannot write report to {}: {source}", path.display()),
            Error::OutputWrite { path: None, source } => {
                write!(fmt, "cannot write report to stdout: {source}")
            }
            _ => write!(fmt, "{self:?}"),
        }
    }
}

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
