//! Lifecycle points and orchestrator targets the hooks attach to.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A point in the orchestrator's lifecycle where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookPoint {
    /// Before the filesystem image is packaged.
    BeforePackage,
    /// After the primary upload, before the filesystem upload.
    BeforeSecondaryDeploy,
}

impl HookPoint {
    pub const ALL: [HookPoint; 2] = [HookPoint::BeforePackage, HookPoint::BeforeSecondaryDeploy];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::BeforePackage => "before-package",
            HookPoint::BeforeSecondaryDeploy => "before-secondary-deploy",
        }
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HookPoint {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookPoint::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// Orchestrator targets known to the hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    /// Primary firmware upload.
    Upload,
    /// Filesystem image upload.
    UploadFs,
    /// Filesystem image build.
    BuildFs,
}

impl BuildTarget {
    pub const ALL: [BuildTarget; 3] = [BuildTarget::Upload, BuildTarget::UploadFs, BuildTarget::BuildFs];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::Upload => "upload",
            BuildTarget::UploadFs => "uploadfs",
            BuildTarget::BuildFs => "buildfs",
        }
    }
}

impl std::fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// A hook point or target name that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownName(pub String);

impl std::fmt::Display for UnknownName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown name: {}", self.0)
    }
}

impl std::error::Error for UnknownName {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_point_names() {
        for point in HookPoint::ALL {
            assert_eq!(point.as_str().parse::<HookPoint>().unwrap(), point);
            let json = serde_json::to_string(&point).unwrap();
            assert_eq!(json, format!("\"{}\"", point.as_str()));
        }
        assert!("after-everything".parse::<HookPoint>().is_err());
    }

    #[test]
    fn test_build_target_names() {
        assert_eq!("uploadfs".parse::<BuildTarget>().unwrap(), BuildTarget::UploadFs);
        assert_eq!(BuildTarget::BuildFs.to_string(), "buildfs");
        assert_eq!(serde_json::to_string(&BuildTarget::UploadFs).unwrap(), "\"uploadfs\"");

        let err = "flash".parse::<BuildTarget>().unwrap_err();
        assert_eq!(err.to_string(), "unknown name: flash");
    }
}
