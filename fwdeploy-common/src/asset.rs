//! Asset compression types.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Suffix appended to a source file name to form its compressed sibling.
pub const GZIP_SUFFIX: &str = ".gz";

/// One candidate file under the asset root.
///
/// Lives for a single evaluation; staleness is derived from the filesystem
/// on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub source_path: PathBuf,
    pub compressed_path: PathBuf,
    pub source_mtime: SystemTime,
    pub compressed_mtime: Option<SystemTime>,
}

impl AssetFile {
    /// Sibling path with [`GZIP_SUFFIX`] appended to the full file name.
    pub fn compressed_path_for(source: &Path) -> PathBuf {
        let mut name = OsString::from(source.as_os_str());
        name.push(GZIP_SUFFIX);
        PathBuf::from(name)
    }

    /// A sibling at least as new as its source does not need rewriting.
    pub fn is_fresh(&self) -> bool {
        self.compressed_mtime
            .is_some_and(|compressed| compressed >= self.source_mtime)
    }
}

/// What a run did with a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileDisposition {
    Ineligible,
    UpToDate,
    Compressed,
    Failed,
}

/// Per-invocation summary of a compression run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionRun {
    pub files_examined: usize,
    pub files_compressed: usize,
    #[serde(default)]
    pub files_up_to_date: usize,
    #[serde(default)]
    pub files_failed: usize,
}

impl CompressionRun {
    pub fn record(&mut self, disposition: FileDisposition) {
        self.files_examined += 1;
        match disposition {
            FileDisposition::Ineligible => {}
            FileDisposition::UpToDate => self.files_up_to_date += 1,
            FileDisposition::Compressed => self.files_compressed += 1,
            FileDisposition::Failed => self.files_failed += 1,
        }
    }

    /// True when the run wrote nothing to disk.
    pub fn is_unchanged(&self) -> bool {
        self.files_compressed == 0
    }
}
