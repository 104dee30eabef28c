use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

use super::matcher::CompiledPattern;
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;
use crate::results::{file_name_of, LineMatch, SearchFile};

const BUFFER_CAPACITY: usize = 65536;
/// Lines scanned between two looks at the stop flag
pub const CANCEL_CHECK_LINES: usize = 4096;

/// Helper function to decode one line according to encoding mode
fn decode_bytes<'a>(
    bytes: &'a [u8],
    path: &Path,
    encoding_mode: EncodingMode,
) -> SearchResult<Cow<'a, str>> {
    match encoding_mode {
        EncodingMode::FailFast => match std::str::from_utf8(bytes) {
            Ok(valid) => Ok(Cow::Borrowed(valid)),
            // Only the error path pays for the copy that FromUtf8Error needs.
            Err(_) => String::from_utf8(bytes.to_vec())
                .map(Cow::Owned)
                .map_err(|e| SearchError::encoding_error(path, e)),
        },
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            if let Cow::Owned(_) = cow {
                trace!("Invalid UTF-8 replaced in file: {}", path.display());
            }
            Ok(cow)
        }
    }
}

/// Removes a trailing `\n` or `\r\n`
fn strip_line_terminator(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// Decides whether a single file is a hit and collects its matching lines.
///
/// The file name is tested first; a file that fails it is never opened.
/// Without a content pattern a name match is a hit on its own. With one,
/// the file must contain at least one matching line.
#[derive(Debug, Clone)]
pub struct FileProcessor {
    content_pattern: Option<CompiledPattern>,
    name_pattern: Option<CompiledPattern>,
    encoding_mode: EncodingMode,
    metrics: SearchMetrics,
}

impl FileProcessor {
    pub fn new(
        content_pattern: Option<CompiledPattern>,
        name_pattern: Option<CompiledPattern>,
        encoding_mode: EncodingMode,
        metrics: SearchMetrics,
    ) -> Self {
        Self {
            content_pattern,
            name_pattern,
            encoding_mode,
            metrics,
        }
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    /// Tests a basename against the name pattern; no pattern passes everything
    pub fn matches_name(&self, file_name: &str) -> bool {
        self.name_pattern
            .as_ref()
            .map_or(true, |pattern| pattern.matches(file_name))
    }

    /// Scans a file with no way to cancel it.
    pub fn scan(&self, path: &Path) -> Option<SearchFile> {
        let never = AtomicBool::new(false);
        self.process_file(path, &never).unwrap_or(None)
    }

    /// Scans a file, giving up with `SearchError::Cancelled` once `cancel` is set.
    ///
    /// Every other failure is soft: it is counted and logged, and the file
    /// yields `Ok(None)`.
    pub fn process_file(
        &self,
        path: &Path,
        cancel: &AtomicBool,
    ) -> SearchResult<Option<SearchFile>> {
        let file_name = file_name_of(path);
        if !self.matches_name(&file_name) {
            trace!("Name filter rejected {}", path.display());
            return Ok(None);
        }

        let Some(pattern) = &self.content_pattern else {
            trace!("Name-only hit: {}", path.display());
            self.metrics.record_file_matched(0);
            return Ok(Some(SearchFile::name_only(path)));
        };

        self.metrics.record_file_scanned();
        match self.scan_lines(path, pattern, cancel) {
            Ok(results) if results.is_empty() => Ok(None),
            Ok(results) => {
                debug!("Found {} matches in file {}", results.len(), path.display());
                self.metrics.record_file_matched(results.len());
                Ok(Some(SearchFile::with_results(path, results)))
            }
            Err(SearchError::Cancelled) => Err(SearchError::Cancelled),
            Err(e) => {
                self.metrics.record_file_unreadable();
                debug!("Skipping {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn scan_lines(
        &self,
        path: &Path,
        pattern: &CompiledPattern,
        cancel: &AtomicBool,
    ) -> SearchResult<Vec<LineMatch>> {
        let file = File::open(path).map_err(|e| SearchError::from_io(e, path))?;
        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut line_buffer: Vec<u8> = Vec::with_capacity(256);
        let mut line_number = 0;
        let mut results = Vec::new();

        loop {
            line_buffer.clear();
            let read = reader
                .read_until(b'\n', &mut line_buffer)
                .map_err(|e| SearchError::from_io(e, path))?;
            if read == 0 {
                break;
            }
            line_number += 1;

            if line_number % CANCEL_CHECK_LINES == 0 && cancel.load(Ordering::Relaxed) {
                return Err(SearchError::Cancelled);
            }

            let bytes = strip_line_terminator(&line_buffer);
            let line = decode_bytes(bytes, path, self.encoding_mode)?;
            // Matching sees the whole line; only the stored text is trimmed.
            if pattern.matches(&line) {
                trace!("Found match at line {}: {}", line_number, line.trim());
                results.push(LineMatch {
                    file_path: path.to_path_buf(),
                    line_number,
                    text: line.trim().to_string(),
                });
            }
        }

        Ok(results)
    }
}
