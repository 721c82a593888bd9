#![forbid(unsafe_code)]

pub mod checker;
pub mod config;
pub mod error;
pub mod playlist;
pub mod probe;

pub use checker::{
    CheckOptions, CheckResult, EndpointProber, PlaylistChecker, Report, StreamRequest,
    StreamStatus, Summary,
};
pub use config::CheckerConfig;
pub use error::CheckError;
pub use playlist::{Entry, PlaylistInput, PlaylistResolver};
pub use probe::{FailureKind, HttpProbeClient, ProbeAttempt, ProbeClient, ProbeMethod, ProbeOutcome};
