//! Filesystem helpers shared by the config store, mount resolution and
//! volume reporting.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;

/// Expand a user-supplied path the way the CLI documents it: `~` expands
/// to the invoking user's home, a relative path resolves against the
/// current working directory, anything else is taken as absolute.
pub fn expanded_path(dest: &str) -> PathBuf {
    let dest = dest.trim_start();
    if dest.starts_with('~') {
        PathBuf::from(shellexpand::tilde(dest).into_owned())
    } else if !Path::new(dest).is_absolute() {
        env::current_dir()
            .map(|cwd| cwd.join(dest))
            .unwrap_or_else(|_| PathBuf::from(dest))
    } else {
        PathBuf::from(dest)
    }
}

/// Delete everything inside `dir` while keeping the directory itself.
///
/// Used when removing a server together with its bind-mounted folders;
/// the folder stays behind because it may be a mount point.
pub fn delete_folder_contents(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Total size in bytes of all regular files under `root`, skipping hidden
/// directories. Unreadable entries are ignored, matching `du`-style
/// best-effort reporting.
pub fn folder_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .map(|n| n.starts_with('.'))
                    .unwrap_or(false)
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

const SIZE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Human-readable rendering of a byte count ("1.5 GB").
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0B".to_string();
    }
    let exponent = (size_bytes as f64).log(1024.0).floor() as usize;
    let exponent = exponent.min(SIZE_UNITS.len() - 1);
    let value = size_bytes as f64 / 1024f64.powi(exponent as i32);
    format!("{} {}", (value * 100.0).round() / 100.0, SIZE_UNITS[exponent])
}

/// Parse a docker-style size string into bytes.
///
/// Accepts a bare byte count or a `k`/`m`/`g` suffix (case-insensitive,
/// optionally followed by `b`): "512m", "16g", "1073741824".
pub fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim().to_lowercase();
    let stripped = value.strip_suffix('b').unwrap_or(&value);
    let (digits, multiplier) = match stripped.chars().last() {
        Some('k') => (&stripped[..stripped.len() - 1], 1024u64),
        Some('m') => (&stripped[..stripped.len() - 1], 1024 * 1024),
        Some('g') => (&stripped[..stripped.len() - 1], 1024 * 1024 * 1024),
        _ => (stripped, 1),
    };
    digits.trim().parse::<u64>().ok().map(|n| n * multiplier)
}
