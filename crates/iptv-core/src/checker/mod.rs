pub mod engine;
pub mod prober;
pub mod report;
pub mod scheduler;
pub mod status;

pub use engine::{CheckOptions, PlaylistChecker, StreamRequest};
pub use prober::EndpointProber;
pub use report::{to_report, CheckResult, Report, Summary};
pub use scheduler::{run_all, Progress};
pub use status::{classify_failure, classify_status, StreamStatus};
