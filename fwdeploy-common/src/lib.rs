//! fwdeploy Common Types
//!
//! Shared types used by the deployment hooks and anything that reads their reports.

pub mod asset;
pub mod lifecycle;
pub mod target;

pub use asset::{AssetFile, CompressionRun, FileDisposition, GZIP_SUFFIX};
pub use lifecycle::{BuildTarget, HookPoint, UnknownName};
pub use target::{DeploymentTarget, PollOutcome, UploadProtocol, DEFAULT_HOST, READINESS_PORT};
