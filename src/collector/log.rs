//! Incremental log tailing.
//!
//! Tails glob-matched files using persisted per-file cursors, surviving
//! agent restarts, log rotation (inode change) and truncation (size
//! decrease under the same inode).

use super::cursor::{Cursor, CursorStore};
use super::{Collector, CollectorError};
use crate::event::Metrics;
use crate::parser::{self, LineParser, RawParser};
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::warn;

fn default_patterns() -> Vec<String> {
    vec!["/var/log/syslog".to_string()]
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".beacon_logstate.json")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogTailerConfig {
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub parser: Option<String>,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

pub fn build(config: &toml::Table) -> Result<Box<dyn Collector>, CollectorError> {
    let config: LogTailerConfig = config
        .clone()
        .try_into()
        .map_err(|e: toml::de::Error| CollectorError::InvalidConfig(e.to_string()))?;

    let parser: Box<dyn LineParser> = match config.parser.as_deref() {
        None => Box::new(RawParser),
        Some(name) => parser::parser_by_name(name)
            .ok_or_else(|| CollectorError::InvalidConfig(format!("unknown parser: {name}")))?,
    };

    Ok(Box::new(LogTailer::new(
        config.patterns,
        parser,
        CursorStore::open(config.state_file),
    )))
}

pub struct LogTailer {
    patterns: Vec<String>,
    parser: Box<dyn LineParser>,
    store: CursorStore,
}

impl LogTailer {
    pub fn new(patterns: Vec<String>, parser: Box<dyn LineParser>, store: CursorStore) -> Self {
        Self {
            patterns,
            parser,
            store,
        }
    }
}

impl Collector for LogTailer {
    fn name(&self) -> String {
        let parser_name = self.parser.name();
        if parser_name.is_empty() {
            "logs".to_string()
        } else {
            format!("logs.{parser_name}")
        }
    }

    /// One tailing pass over every file matching the configured globs.
    ///
    /// A read failure on one file does not abort the rest of the pass, and
    /// the cursor map is persisted once after the whole pass.
    fn collect(&mut self) -> Result<Vec<Metrics>, CollectorError> {
        let mut records = Vec::new();

        for pattern in &self.patterns {
            let paths = match glob::glob(pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    warn!("Bad glob pattern {pattern}: {e}");
                    continue;
                }
            };

            for entry in paths {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("Glob walk failed under {pattern}: {e}");
                        continue;
                    }
                };

                let lines = match tail_file(&mut self.store, &path) {
                    Ok(lines) => lines,
                    Err(e) => {
                        warn!("Tailing {} failed: {e}", path.display());
                        continue;
                    }
                };

                for line in lines {
                    let Some(mut fields) = self.parser.parse(&line) else {
                        continue;
                    };
                    fields.insert(
                        "source".to_string(),
                        Value::String(path.to_string_lossy().into_owned()),
                    );
                    records.push(fields);
                }
            }
        }

        // Records already read are still delivered even if the cursor map
        // cannot be persisted; the worst case is re-reading them next pass.
        if let Err(e) = self.store.save() {
            warn!("Persisting tail cursors failed: {e}");
        }

        Ok(records)
    }
}

/// Read the lines appended to `path` since its saved cursor.
///
/// A missing file is skipped without touching its cursor. An inode change
/// (rotation) or a size below the saved offset (truncation) restarts the
/// read from offset 0.
fn tail_file(store: &mut CursorStore, path: &Path) -> std::io::Result<Vec<String>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let inode = file_inode(&metadata);
    let size = metadata.len();

    let mut offset = 0;
    if let Some(saved) = store.get(path) {
        if saved.inode == inode {
            offset = saved.offset;
            if size < offset {
                // Truncated in place.
                offset = 0;
            }
        }
        // Different inode: rotated to .1, .2, etc.
    }

    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut reader = BufReader::new(file);

    let mut lines = Vec::new();
    let mut buf = String::new();
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        if buf.ends_with('\n') {
            buf.pop();
        }
        lines.push(buf.clone());
    }

    let new_offset = reader.stream_position()?;
    store.update(path, Cursor { inode, offset: new_offset });

    Ok(lines)
}

#[cfg(unix)]
fn file_inode(metadata: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn file_inode(_metadata: &fs::Metadata) -> u64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_leaves_cursor_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CursorStore::open(dir.path().join("state.json"));
        let gone = dir.path().join("gone.log");

        let lines = tail_file(&mut store, &gone).unwrap();
        assert!(lines.is_empty());
        assert!(store.get(&gone).is_none());
    }

    #[test]
    fn partial_last_line_is_emitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "complete\npartial").unwrap();

        let mut store = CursorStore::open(dir.path().join("state.json"));
        let lines = tail_file(&mut store, &path).unwrap();
        assert_eq!(lines, vec!["complete", "partial"]);

        // Cursor sits at end of file, partial line included.
        assert_eq!(store.get(&path).unwrap().offset, "complete\npartial".len() as u64);
    }
}
