//! Static asset compression.
//!
//! Walks the asset root and writes a `.gz` sibling next to every text-like
//! file whose sibling is missing or older than the source. The siblings are
//! the only state: a second run over an unchanged tree writes nothing.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::{Compression, GzBuilder};
use fwdeploy_common::{AssetFile, CompressionRun, FileDisposition, GZIP_SUFFIX};

use crate::config::HookContext;
use crate::error::CompressError;

/// Extensions worth compressing, lowercase and without the dot.
pub const TEXT_EXTENSIONS: [&str; 8] = ["html", "htm", "css", "js", "json", "svg", "txt", "map"];

/// True for files with an allow-listed extension that are not already gzip artifacts.
pub fn is_text_asset(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    if name.to_string_lossy().ends_with(GZIP_SUFFIX) {
        return false;
    }
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

/// Compresses eligible files under one asset root.
#[derive(Debug, Clone)]
pub struct AssetCompressor {
    root: PathBuf,
    disabled: bool,
}

impl AssetCompressor {
    pub fn new(root: impl Into<PathBuf>, disabled: bool) -> Self {
        Self {
            root: root.into(),
            disabled,
        }
    }

    pub fn from_context(ctx: &HookContext) -> Self {
        Self::new(ctx.asset_root.clone(), ctx.disable_gzip)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_candidate(&self, path: &Path) -> bool {
        !self.disabled && is_text_asset(path)
    }

    /// Run one pass over the asset root. Never fails as a whole.
    pub fn run(&self) -> CompressionRun {
        let mut run = CompressionRun::default();

        if self.disabled {
            tracing::info!("Compression disabled, skipping {}", self.root.display());
            return run;
        }
        if !self.root.is_dir() {
            tracing::info!(path = %self.root.display(), "No data dir: {}", self.root.display());
            return run;
        }

        let mut files = Vec::new();
        collect_files(&self.root, &mut files);

        for path in files {
            run.record(self.process(&path));
        }

        tracing::info!(
            examined = run.files_examined,
            up_to_date = run.files_up_to_date,
            failed = run.files_failed,
            "Done. {} file(s) compressed.",
            run.files_compressed
        );
        run
    }

    fn process(&self, path: &Path) -> FileDisposition {
        if !self.is_candidate(path) {
            return FileDisposition::Ineligible;
        }
        match compress_if_stale(path) {
            Ok(true) => FileDisposition::Compressed,
            Ok(false) => FileDisposition::UpToDate,
            Err(e) => {
                tracing::warn!(
                    path = %e.path().display(),
                    error = %e,
                    "Failed to compress {}",
                    path.display()
                );
                FileDisposition::Failed
            }
        }
    }
}

/// Stat a source file and its compressed sibling.
pub fn evaluate(source: &Path) -> Result<AssetFile, CompressError> {
    let stat_err = |source_err: io::Error| CompressError::Stat {
        path: source.to_path_buf(),
        source: source_err,
    };
    let source_mtime = fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(stat_err)?;

    let compressed_path = AssetFile::compressed_path_for(source);
    // An unreadable sibling is treated as absent and gets rewritten.
    let compressed_mtime = fs::metadata(&compressed_path)
        .and_then(|m| m.modified())
        .ok();

    Ok(AssetFile {
        source_path: source.to_path_buf(),
        compressed_path,
        source_mtime,
        compressed_mtime,
    })
}

/// Compress `source` unless its sibling is already fresh.
///
/// Returns whether a sibling was written.
pub fn compress_if_stale(source: &Path) -> Result<bool, CompressError> {
    let asset = evaluate(source)?;
    if asset.is_fresh() {
        tracing::debug!(path = %source.display(), "Up to date");
        return Ok(false);
    }

    write_compressed(&asset)?;
    tracing::info!(
        "Compressed: {} -> {}",
        asset.source_path.display(),
        asset.compressed_path.display()
    );
    Ok(true)
}

fn write_compressed(asset: &AssetFile) -> Result<(), CompressError> {
    let data = fs::read(&asset.source_path).map_err(|e| CompressError::Read {
        path: asset.source_path.clone(),
        source: e,
    })?;

    let write_err = |e: io::Error| CompressError::Write {
        path: asset.compressed_path.clone(),
        source: e,
    };

    if let Some(parent) = asset.compressed_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let name = asset
        .source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = File::create(&asset.compressed_path).map_err(write_err)?;
    if let Err(e) = encode(file, &name, &data) {
        // A truncated sibling would look fresh on the next run.
        let _ = fs::remove_file(&asset.compressed_path);
        return Err(write_err(e));
    }
    Ok(())
}

/// Gzip `data` at level 9 with a zeroed header timestamp.
fn encode(file: File, name: &str, data: &[u8]) -> io::Result<()> {
    let mut encoder = GzBuilder::new()
        .filename(name)
        .mtime(0)
        .write(file, Compression::best());
    encoder.write_all(data)?;
    encoder.finish()?;
    Ok(())
}

/// Depth-first collection of every non-directory entry under `dir`.
///
/// Symlinked directories are listed by the walk but not followed.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Cannot read directory");
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Bad directory entry");
                continue;
            }
        };
        let path = entry.path();
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => collect_files(&path, out),
            Ok(ft) if ft.is_symlink() && path.is_dir() => {}
            Ok(_) => out.push(path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot stat entry");
            }
        }
    }
}
