use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod codec;
mod cursor;
pub mod gma;
mod schema;
pub mod stagedef;
pub mod tpl;

use codec::Direction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertSettings {
    pub input_path: PathBuf,
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to open {path:?}: {source}")]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create {path:?}: {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("input truncated: {len:#X} byte(s) at {offset:#X} run past the end of a {file_len:#X}-byte file")]
    TruncatedInput {
        offset: usize,
        len: usize,
        file_len: usize,
    },
    #[error("unexpected tag {tag:#04X} at {offset:#X}")]
    UnexpectedTag { tag: u32, offset: usize },
    #[error("unsupported format variant: {detail}")]
    UnsupportedFormatVariant { detail: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("report error: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// The converted bytes of one file plus what the walk saw on the way.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub direction: Direction,
    pub bytes: Vec<u8>,
    /// Records copied per table, keyed by table name.
    pub tables: BTreeMap<&'static str, u64>,
    pub bytes_visited: usize,
    /// Source bytes no copier touched; they pass through verbatim.
    pub bytes_untouched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Tpl,
    Gma,
    RawLz,
}

impl FileKind {
    /// Picks the converter from the last three characters of the file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        let chars: Vec<char> = name.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(3)..].iter().collect();
        match tail.as_str() {
            "tpl" => Some(FileKind::Tpl),
            "gma" => Some(FileKind::Gma),
            "raw" => Some(FileKind::RawLz),
            _ => None,
        }
    }
}

pub fn convert_bytes(kind: FileKind, data: &[u8]) -> Result<Conversion> {
    match kind {
        FileKind::Tpl => tpl::convert(data),
        FileKind::Gma => gma::convert(data),
        FileKind::RawLz => stagedef::convert(data),
    }
}

/// The input path with the target game's suffix appended.
pub fn output_path(input: &Path, direction: Direction) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(direction.output_suffix());
    PathBuf::from(name)
}

/// Summary of one converted file, written as JSON on request.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub kind: FileKind,
    pub direction: Direction,
    pub tables: BTreeMap<&'static str, u64>,
    pub bytes_transcoded: usize,
    pub bytes_passed_through: usize,
}

/// Converts the file at `input` and writes the result next to it.
///
/// Returns `None` when the file name does not name a supported format.
pub fn convert_file(input: &Path) -> Result<Option<ConversionReport>> {
    let Some(kind) = FileKind::from_path(input) else {
        info!("{} is not a tpl, gma or raw file, nothing to do", input.display());
        return Ok(None);
    };

    let data = fs::read(input).map_err(|source| ConvertError::FileOpen {
        path: input.to_path_buf(),
        source,
    })?;
    let conversion = convert_bytes(kind, &data)?;

    let output = output_path(input, conversion.direction);
    fs::write(&output, &conversion.bytes).map_err(|source| ConvertError::FileCreate {
        path: output.clone(),
        source,
    })?;
    info!(
        "converted {} ({:?}) to {}",
        input.display(),
        conversion.direction,
        output.display()
    );

    Ok(Some(ConversionReport {
        input: input.to_path_buf(),
        output,
        kind,
        direction: conversion.direction,
        tables: conversion.tables,
        bytes_transcoded: conversion.bytes_visited,
        bytes_passed_through: conversion.bytes_untouched,
    }))
}

pub fn run(settings: &ConvertSettings) -> Result<()> {
    let report = convert_file(&settings.input_path)?;

    if let (Some(report), Some(path)) = (report, settings.report_path.as_ref()) {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).map_err(|source| ConvertError::FileCreate {
            path: path.clone(),
            source,
        })?;
        info!("wrote report to {}", path.display());
    }
    Ok(())
}
