pub mod executor;
pub mod fingerprint;
pub mod recovery;

pub use fingerprint::{DiffThresholds, PageFingerprint};
