//! Compression of rotated files into `.gz` or `.zip` artifacts.
//!
//! The artifact is written to a staging file in the same directory and moved
//! into place only once it is complete. The source is removed last, so a
//! failure at any step leaves the source as it was.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flate2::Compression;
use flate2::write::GzEncoder;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Zip,
}

impl CompressionFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CompressionFormat::Gzip => "gz",
            CompressionFormat::Zip => "zip",
        }
    }

    /// `<path>.gz` or `<path>.zip`.
    pub fn artifact_path(&self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(self.extension());
        PathBuf::from(name)
    }
}

impl FromStr for CompressionFormat {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "gzip" => Ok(CompressionFormat::Gzip),
            "zip" => Ok(CompressionFormat::Zip),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionFormat::Gzip => write!(f, "gzip"),
            CompressionFormat::Zip => write!(f, "zip"),
        }
    }
}

/// Compress `path` according to the format tag and remove the original.
///
/// Returns the path of the artifact.
pub fn compress(path: &Path, tag: &str) -> Result<PathBuf> {
    let format = tag.parse::<CompressionFormat>()?;
    compress_with(path, format)
}

pub fn compress_with(path: &Path, format: CompressionFormat) -> Result<PathBuf> {
    let dest = format.artifact_path(path);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut input = File::open(path).map_err(|e| Error::compression(path, e))?;
    let metadata = input.metadata().map_err(|e| Error::compression(path, e))?;

    let staging = tempfile::Builder::new()
        .prefix(".logrotor-")
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|e| Error::compression(&dest, e))?;

    let written = match format {
        CompressionFormat::Gzip => write_gzip(&mut input, staging.as_file()),
        CompressionFormat::Zip => {
            let entry_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            write_zip(&mut input, staging.as_file(), entry_name, metadata.len())
        }
    };
    written.map_err(|e| Error::compression(path, e))?;

    staging
        .as_file()
        .sync_all()
        .map_err(|e| Error::compression(&dest, e))?;
    if let Err(e) = fs::set_permissions(staging.path(), metadata.permissions()) {
        tracing::debug!(path = %dest.display(), error = %e, "Could not copy permissions to artifact");
    }
    staging
        .persist(&dest)
        .map_err(|e| Error::compression(&dest, e.error))?;

    drop(input);
    fs::remove_file(path).map_err(|e| Error::io(path, e))?;

    Ok(dest)
}

fn write_gzip(input: &mut File, output: &File) -> io::Result<()> {
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(input, &mut encoder)?;
    encoder.finish()?.flush()
}

fn write_zip<W: Write + Seek>(
    input: &mut File,
    output: W,
    entry_name: String,
    size: u64,
) -> io::Result<()> {
    let mut archive = ZipWriter::new(output);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .large_file(size >= u64::from(u32::MAX));

    archive
        .start_file(entry_name, options)
        .map_err(io::Error::other)?;
    io::copy(input, &mut archive)?;
    archive.finish().map_err(io::Error::other)?.flush()
}
