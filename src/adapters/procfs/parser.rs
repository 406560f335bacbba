use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::domain::IoCounters;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing field: {0}")]
    MissingField(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Read a single-value attribute file, trimmed; `None` if absent or unreadable
pub fn read_text(path: &Path) -> Option<String> {
    let content = fs::read(path).ok()?;
    Some(String::from_utf8_lossy(&content).trim().to_string())
}

pub fn read_u64(path: &Path) -> Option<u64> {
    read_text(path)?.parse().ok()
}

/// Parse a block device `stat` file.
///
/// Format: read_ios read_merges read_sectors read_ticks write_ios
/// write_merges write_sectors write_ticks in_flight io_ticks time_in_queue ...
pub fn parse_block_stat(content: &str) -> ParseResult<IoCounters> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 8 {
        return Err(ParseError::Parse("Incomplete block stat".to_string()));
    }

    let field = |idx: usize, name: &str| -> ParseResult<u64> {
        parts[idx]
            .parse::<u64>()
            .map_err(|e| ParseError::Parse(format!("{}: {}", name, e)))
    };

    Ok(IoCounters::new(
        field(2, "read_sectors")?,
        field(3, "read_ticks")?,
        field(6, "write_sectors")?,
        field(7, "write_ticks")?,
    ))
}

/// One record of /proc/self/mountinfo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub major_minor: String,
    pub mount_point: String,
    pub options: Vec<String>,
    pub filesystem: String,
    pub source: String,
}

/// Parse one mountinfo line.
///
/// Format: id parent major:minor root mount_point options [optional...] - fstype source super_options
pub fn parse_mountinfo_line(line: &str) -> ParseResult<MountInfo> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 6 {
        return Err(ParseError::Parse("Incomplete mountinfo line".to_string()));
    }

    let dash = parts
        .iter()
        .position(|p| *p == "-")
        .ok_or_else(|| ParseError::MissingField("separator".to_string()))?;
    if dash < 6 {
        return Err(ParseError::Parse("Separator before mount options".to_string()));
    }
    let filesystem = parts
        .get(dash + 1)
        .ok_or_else(|| ParseError::MissingField("fstype".to_string()))?;
    let source = parts.get(dash + 2).copied().unwrap_or("");

    Ok(MountInfo {
        major_minor: parts[2].to_string(),
        mount_point: unescape_octal(parts[4]),
        options: parts[5].split(',').map(str::to_string).collect(),
        filesystem: filesystem.to_string(),
        source: unescape_octal(source),
    })
}

/// Parse /proc/self/mountinfo, skipping malformed lines
pub fn parse_mountinfo(content: &str) -> Vec<MountInfo> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| parse_mountinfo_line(l).ok())
        .collect()
}

/// Undo the kernel's octal escaping of whitespace and backslashes (`\040`)
pub fn unescape_octal(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits.iter().fold(0u32, |acc, d| acc * 8 + (d - b'0') as u32);
                if let Ok(b) = u8::try_from(value) {
                    out.push(b);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a udev database record (`/run/udev/data/b<major>:<minor>`).
///
/// Property lines look like `E:ID_FS_TYPE=ext4`; other record types are ignored.
pub fn parse_udev_props(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("E:"))
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
