//! `NAME=value` configuration store
//!
//! The file is parsed once into an order-preserving [`EnvFile`] document,
//! mutated in memory, and written back atomically. Lines that are not
//! assignments (comments, blanks, anything unparseable) are kept verbatim.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::{has_key_pair, write_atomic, Keystore, KeystoreError};
use crate::core_identity::record::KeyRecord;

/// The store holds the private key, so it is never group or world readable
const ENV_FILE_MODE: u32 = 0o600;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry { name: String, value: String },
    Other(String),
}

impl Line {
    fn is_blank(&self) -> bool {
        matches!(self, Line::Other(raw) if raw.trim().is_empty())
    }
}

/// Parsed `NAME=value` document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<Line>,
}

impl EnvFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(contents: &str) -> Self {
        let lines = contents
            .lines()
            .map(|raw| match split_assignment(raw) {
                Some((name, value)) => Line::Entry {
                    name: name.to_string(),
                    value: value.to_string(),
                },
                None => Line::Other(raw.to_string()),
            })
            .collect();
        Self { lines }
    }

    /// Read and parse `path`; a missing file is an empty document
    pub fn load(path: &Path) -> io::Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e),
        }
    }

    /// Value of the first assignment to `name`, with one layer of matching
    /// quotes removed
    pub fn get(&self, name: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { name: n, value } if n == name => Some(unquote(value)),
            _ => None,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of assignments to `name`
    pub fn occurrences(&self, name: &str) -> usize {
        self.lines
            .iter()
            .filter(|line| matches!(line, Line::Entry { name: n, .. } if n == name))
            .count()
    }

    /// Replace the first assignment to `name` in place, or append one.
    ///
    /// Later duplicate assignments are dropped so the name ends up on exactly
    /// one line.
    pub fn upsert(&mut self, name: &str, value: &str) {
        let mut seen = false;
        self.lines.retain_mut(|line| match line {
            Line::Entry { name: n, value: v } if n == name => {
                if seen {
                    return false;
                }
                seen = true;
                *v = value.to_string();
                true
            }
            _ => true,
        });

        if !seen {
            self.lines.push(Line::Entry {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Serialized form: lines joined with `\n`, leading and trailing blank
    /// lines dropped, one trailing newline. Content lines are written as read.
    pub fn render(&self) -> String {
        let first = self.lines.iter().position(|line| !line.is_blank());
        let last = self.lines.iter().rposition(|line| !line.is_blank());

        let mut out = match (first, last) {
            (Some(first), Some(last)) => self.lines[first..=last]
                .iter()
                .map(|line| match line {
                    Line::Entry { name, value } => format!("{}={}", name, value),
                    Line::Other(raw) => raw.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        };
        out.push('\n');
        out
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        write_atomic(path, self.render().as_bytes(), ENV_FILE_MODE)
    }
}

/// Split `NAME=value` where NAME is an identifier starting at column 0
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once('=')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name, value))
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Keystore backed by an env file, loaded once on open
#[derive(Debug)]
pub struct EnvFileKeystore {
    path: PathBuf,
    document: RwLock<EnvFile>,
}

fn handle_poison<T>(_err: PoisonError<T>) -> KeystoreError {
    KeystoreError::Io(io::Error::new(
        io::ErrorKind::Other,
        "env file lock poisoned: a thread panicked while holding it",
    ))
}

impl EnvFileKeystore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, KeystoreError> {
        let path = path.into();
        let document = EnvFile::load(&path)?;
        tracing::debug!(path = %path.display(), "Loaded key-value store");
        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the in-memory document
    pub fn snapshot(&self) -> Result<EnvFile, KeystoreError> {
        Ok(self.document.read().map_err(handle_poison)?.clone())
    }
}

impl Keystore for EnvFileKeystore {
    fn load_record(&self) -> Result<KeyRecord, KeystoreError> {
        let document = self.document.read().map_err(handle_poison)?;
        KeyRecord::from_fields(|name| document.get(name).map(str::to_string))
    }

    fn save_record(&self, record: &KeyRecord) -> Result<(), KeystoreError> {
        let mut document = self.document.write().map_err(handle_poison)?;
        // Mutate a copy so a failed write leaves memory matching disk.
        let mut updated = document.clone();
        record.write_fields(|name, value| updated.upsert(name, value));
        updated.save(&self.path)?;
        *document = updated;
        tracing::debug!(path = %self.path.display(), "Wrote key record");
        Ok(())
    }

    fn has_record(&self) -> Result<bool, KeystoreError> {
        let document = self.document.read().map_err(handle_poison)?;
        Ok(has_key_pair(|name| document.get(name)))
    }
}
