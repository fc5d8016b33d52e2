//! fwdeploy hooks
//!
//! Build-pipeline hooks for firmware asset deployment: a readiness gate that
//! waits for an OTA-updated device to come back, and an idempotent gzip pass
//! over the static assets packaged into the filesystem image.

pub mod compress;
pub mod config;
pub mod error;
pub mod hooks;
pub mod output;
pub mod readiness;
pub mod targets;

pub use crate::compress::AssetCompressor;
pub use crate::config::{Config, HookContext};
pub use error::{CompressError, Error, ProbeError, Result};
pub use hooks::{ActionResult, HookAction, HookRegistry, HookReport, HookRunner};
pub use readiness::{GateReport, Probe, ProbeTiming, ReadinessGate, TcpProbe};
pub use targets::{Alias, Plan, TargetPlan, UPLOAD_ALL};
