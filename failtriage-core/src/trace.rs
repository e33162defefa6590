//! Trace archive reader
//!
//! Pulls text evidence out of a Playwright trace zip. Entries are visited in
//! lexicographic name order so truncation boundaries are identical across
//! runs, regardless of how the archive was written.
//!
//! # Caps
//! - `max_file_chars`: per-entry cap, marked with [`FILE_TRUNCATED_TAG`].
//! - `max_total_chars`: cap on the rendered excerpt, marked with
//!   [`TOTAL_TRUNCATED_TAG`]. The rendered excerpt never exceeds it.
//!
//! Lengths are counted in `char`s, not bytes. With a [`Redactor`] attached,
//! entry text is redacted before either cap is measured.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TraceError;
use crate::redact::Redactor;

pub const FILE_TRUNCATED_TAG: &str = "\n<TRUNCATED_FILE>";
pub const TOTAL_TRUNCATED_TAG: &str = "\n<TRACE_TRUNCATED_TOTAL>\n";
pub const NO_EVIDENCE: &str = "No text-like trace files found in zip.";

/// Extraction caps and entry filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceLimits {
    pub max_total_chars: usize,
    pub max_file_chars: usize,
    /// Lower-case name suffixes treated as text.
    pub suffixes: Vec<String>,
}

impl Default for TraceLimits {
    fn default() -> Self {
        Self {
            max_total_chars: 160_000,
            max_file_chars: 100_000,
            suffixes: vec![".trace".to_string()],
        }
    }
}

/// One archive entry as it appears in the excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub name: String,
    /// Included text, without the per-file truncation tag.
    pub text: String,
    pub was_truncated: bool,
}

/// Text evidence extracted from one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceExcerpt {
    pub entries: Vec<TraceEntry>,
    pub total_truncated: bool,
    rendered: String,
    #[serde(default)]
    redacted: bool,
}

impl TraceExcerpt {
    /// Concatenated excerpt, or [`NO_EVIDENCE`] if nothing matched.
    pub fn render(&self) -> &str {
        if self.rendered.is_empty() && self.entries.is_empty() && !self.total_truncated {
            NO_EVIDENCE
        } else {
            &self.rendered
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether entry text went through a redactor during extraction.
    pub fn is_redacted(&self) -> bool {
        self.redacted
    }
}

/// Selects and reads trace archives.
#[derive(Debug, Clone, Default)]
pub struct TraceArchiveReader {
    limits: TraceLimits,
    redactor: Option<Redactor>,
}

impl TraceArchiveReader {
    pub fn new(limits: TraceLimits) -> Self {
        Self {
            limits,
            redactor: None,
        }
    }

    /// Redact entry text before the caps are applied.
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = Some(redactor);
        self
    }

    /// Pick the trace zip in `dir`.
    ///
    /// Returns `None` when the directory is missing or holds no zip. Symlinks
    /// are followed. With several candidates the newest wins; equal mtimes
    /// fall back to the greatest file name.
    pub fn find_archive(&self, dir: &Path) -> Result<Option<PathBuf>, TraceError> {
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "Trace directory absent");
            return Ok(None);
        }

        let mut best: Option<(SystemTime, PathBuf)> = None;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_zip = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
            if !is_zip || !path.is_file() {
                continue;
            }
            let modified = std::fs::metadata(&path)?.modified()?;
            let newer = match &best {
                None => true,
                Some((best_time, best_path)) => {
                    (modified, path.file_name()) > (*best_time, best_path.file_name())
                }
            };
            if newer {
                best = Some((modified, path));
            }
        }

        Ok(best.map(|(_, path)| path))
    }

    /// Extract the text excerpt from the archive at `path`.
    pub fn extract(&self, path: &Path) -> Result<TraceExcerpt, TraceError> {
        let file = File::open(path)?;
        self.extract_from_reader(file, path)
    }

    /// Extract from any seekable zip source. `label` is used in errors only.
    pub fn extract_from_reader<R: Read + Seek>(
        &self,
        reader: R,
        label: &Path,
    ) -> Result<TraceExcerpt, TraceError> {
        let mut archive =
            zip::ZipArchive::new(reader).map_err(|e| TraceError::InvalidArchive {
                path: label.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut candidates: Vec<String> = archive
            .file_names()
            .filter(|name| self.is_text_entry(name))
            .map(str::to_string)
            .collect();
        candidates.sort();

        let max_total = self.limits.max_total_chars;
        let tag_chars = TOTAL_TRUNCATED_TAG.chars().count();
        let mut rendered = String::new();
        let mut total = 0usize;
        let mut entries = Vec::new();
        let mut total_truncated = false;

        for (idx, name) in candidates.iter().enumerate() {
            let Some((text, was_truncated)) = self.read_entry(&mut archive, name) else {
                continue;
            };

            let header = format!("\n===== TRACE FILE: {} =====\n", name);
            let file_tag = if was_truncated { FILE_TRUNCATED_TAG } else { "" };
            let block = format!("{}{}{}\n", header, text, file_tag);
            let block_chars = block.chars().count();

            // Keep room for the total tag while later entries could still overflow.
            let more_follow = idx + 1 < candidates.len();
            let budget = if more_follow {
                max_total.saturating_sub(tag_chars)
            } else {
                max_total
            };

            if total + block_chars <= budget {
                rendered.push_str(&block);
                total += block_chars;
                entries.push(TraceEntry {
                    name: name.clone(),
                    text,
                    was_truncated,
                });
                continue;
            }

            let room = max_total.saturating_sub(total);
            let keep = room.saturating_sub(tag_chars);
            rendered.push_str(take_chars(&block, keep));
            rendered.push_str(take_chars(TOTAL_TRUNCATED_TAG, room - keep));

            let header_chars = header.chars().count();
            if keep > header_chars {
                entries.push(TraceEntry {
                    name: name.clone(),
                    text: take_chars(&text, keep - header_chars).to_string(),
                    was_truncated: true,
                });
            }
            total_truncated = true;
            debug!(entry = %name, kept = keep, "Trace total cap reached");
            break;
        }

        Ok(TraceExcerpt {
            entries,
            total_truncated,
            rendered,
            redacted: self.redactor.is_some(),
        })
    }

    fn is_text_entry(&self, name: &str) -> bool {
        if name.ends_with('/') {
            return false;
        }
        let lower = name.to_lowercase();
        self.limits
            .suffixes
            .iter()
            .any(|suffix| lower.ends_with(&suffix.to_lowercase()))
    }

    /// Read one entry, redact it, and cap it at `max_file_chars`.
    /// `None` if unreadable.
    fn read_entry<R: Read + Seek>(
        &self,
        archive: &mut zip::ZipArchive<R>,
        name: &str,
    ) -> Option<(String, bool)> {
        let max_chars = self.limits.max_file_chars;
        // A UTF-8 char is at most 4 bytes, so this many bytes always decodes
        // to more than `max_chars` chars when the entry is longer than that.
        let byte_limit = (max_chars as u64).saturating_mul(4).saturating_add(4);

        let entry = match archive.by_name(name) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(entry = %name, error = %e, "Skipping unreadable trace entry");
                return None;
            }
        };

        let mut raw = Vec::new();
        if let Err(e) = entry.take(byte_limit + 1).read_to_end(&mut raw) {
            warn!(entry = %name, error = %e, "Skipping unreadable trace entry");
            return None;
        }
        let clipped = raw.len() as u64 > byte_limit;
        if clipped {
            raw.truncate(byte_limit as usize);
        }

        let decoded = String::from_utf8_lossy(&raw);
        let text = match &self.redactor {
            Some(redactor) => redactor.redact(&decoded),
            None => decoded.into_owned(),
        };
        if clipped || text.chars().count() > max_chars {
            Some((take_chars(&text, max_chars).to_string(), true))
        } else {
            Some((text, false))
        }
    }
}

/// Longest prefix of `s` holding at most `n` chars.
pub(crate) fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
