// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Media file fingerprints for stale-reference detection.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Result of checking a fingerprint against the file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintStatus {
    /// The reference still points at the same content
    Match,
    /// The file changed underneath the record
    Stale,
    /// The file is gone
    Missing,
}

/// Cheap identity for a media file: size plus mtime, with an optional
/// content hash used to disambiguate when the cheap pair disagrees
/// (e.g. the file was re-downloaded or touched but is byte-identical).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub size: u64,
    pub mtime_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Fingerprint {
    /// Capture size+mtime for `path` without reading its content.
    pub fn capture(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self { size: metadata.len(), mtime_ms: mtime_ms(&metadata), hash: None })
    }

    /// Capture size+mtime and a sha256 content hash.
    pub fn capture_hashed(path: &Path) -> std::io::Result<Self> {
        let mut fp = Self::capture(path)?;
        fp.hash = Some(hash_file(path)?);
        Ok(fp)
    }

    /// Check whether `path` still matches this fingerprint.
    ///
    /// Size+mtime agreement is a match. On mismatch the check escalates to
    /// a content hash when one was recorded; a hash match means the file
    /// was touched but not changed.
    pub fn verify(&self, path: &Path) -> std::io::Result<FingerprintStatus> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FingerprintStatus::Missing)
            }
            Err(err) => return Err(err),
        };

        if metadata.len() == self.size && mtime_ms(&metadata) == self.mtime_ms {
            return Ok(FingerprintStatus::Match);
        }

        match &self.hash {
            Some(expected) if *expected == hash_file(path)? => Ok(FingerprintStatus::Match),
            _ => Ok(FingerprintStatus::Stale),
        }
    }
}

fn mtime_ms(metadata: &std::fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
