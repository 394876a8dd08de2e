//! KV store bound to one backing file.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by [`KvStore`].
#[derive(Debug, Error)]
pub enum KvError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("the key in the KV pair is empty")]
    EmptyKey,

    #[error("the key cannot start with '#': {0}")]
    CommentKey(String),

    #[error("empty line or the line is commented")]
    NotARecord,

    #[error("KV pair not found: {0}")]
    NotFound(String),
}

/// One `key value...` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub values: Vec<String>,
}

impl KvPair {
    pub fn new<K, I, V>(key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a raw line. Returns `None` for blank and `#` lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            return None;
        }
        let mut fields = line.split_whitespace();
        let key = fields.next()?.to_string();
        Some(Self {
            key,
            values: fields.map(str::to_string).collect(),
        })
    }

    /// The values joined by single spaces.
    pub fn joined_values(&self) -> String {
        self.values.join(" ")
    }

    /// Render as a file line (no trailing newline).
    pub fn to_line(&self) -> String {
        if self.values.is_empty() {
            self.key.clone()
        } else {
            format!("{} {}", self.key, self.joined_values())
        }
    }

    fn same_record(&self, other: &KvPair) -> bool {
        self.key == other.key && self.values == other.values
    }
}

/// In-memory view of a KV file.
///
/// The file stays open until [`KvStore::close`]; nothing reaches the disk
/// before [`KvStore::sync`] or `close`.
#[derive(Debug)]
pub struct KvStore {
    path: PathBuf,
    file: File,
    pairs: Vec<KvPair>,
}

impl KvStore {
    /// Open `path` read-write and parse every record in it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| KvError::Io {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(io_err)?;

        let mut content = String::new();
        file.read_to_string(&mut content).map_err(io_err)?;

        let mut store = Self {
            path,
            file,
            pairs: Vec::new(),
        };
        for pair in content.lines().filter_map(KvPair::parse) {
            store.push_unique(pair);
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in file order.
    pub fn all(&self) -> &[KvPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Append `pair` unless an identical record exists. Duplicates are a no-op.
    pub fn add_kv_pair(&mut self, pair: KvPair) -> Result<(), KvError> {
        if pair.key.is_empty() {
            return Err(KvError::EmptyKey);
        }
        if pair.key.starts_with('#') {
            return Err(KvError::CommentKey(pair.key));
        }
        self.push_unique(pair);
        Ok(())
    }

    pub fn add_strings<I, V>(&mut self, key: &str, values: I) -> Result<(), KvError>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.add_kv_pair(KvPair::new(key, values))
    }

    /// Parse `line` and append it. Blank and comment lines are rejected.
    pub fn add_line(&mut self, line: &str) -> Result<(), KvError> {
        let pair = KvPair::parse(line).ok_or(KvError::NotARecord)?;
        self.add_kv_pair(pair)
    }

    /// Every record with `key`, in order.
    pub fn get_kv_pairs(&self, key: &str) -> Vec<&KvPair> {
        self.pairs.iter().filter(|p| p.key == key).collect()
    }

    /// Joined values of every record with `key`.
    pub fn get_values(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|p| p.key == key)
            .map(KvPair::joined_values)
            .collect()
    }

    /// Full lines of every record with `key`.
    pub fn get_lines(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|p| p.key == key)
            .map(KvPair::to_line)
            .collect()
    }

    /// Number of records with `key`.
    pub fn count(&self, key: &str) -> usize {
        self.pairs.iter().filter(|p| p.key == key).count()
    }

    /// Replace the first exact match of `old` with `new`, keeping its position.
    pub fn replace(&mut self, old: &KvPair, new: KvPair) -> Result<(), KvError> {
        match self.pairs.iter_mut().find(|p| p.same_record(old)) {
            Some(slot) => {
                *slot = new;
                Ok(())
            }
            None => Err(KvError::NotFound(old.to_line())),
        }
    }

    /// Delete records matching `pair`. Empty values delete every record with the key.
    pub fn delete(&mut self, pair: &KvPair) -> Result<(), KvError> {
        if pair.key.is_empty() {
            return Err(KvError::EmptyKey);
        }
        self.pairs.retain(|p| {
            let matches = p.key == pair.key && (pair.values.is_empty() || p.values == pair.values);
            !matches
        });
        Ok(())
    }

    pub fn delete_by_key(&mut self, key: &str) -> Result<(), KvError> {
        self.delete(&KvPair::new(key, Vec::<String>::new()))
    }

    pub fn delete_all(&mut self) {
        self.pairs.clear();
    }

    /// Truncate the backing file and write every record back.
    pub fn sync(&mut self) -> Result<(), KvError> {
        let mut data = String::new();
        for pair in &self.pairs {
            data.push_str(&pair.to_line());
            data.push('\n');
        }

        let path = self.path.clone();
        let io_err = |source| KvError::Io { path, source };
        (|| -> io::Result<()> {
            self.file.set_len(0)?;
            self.file.seek(SeekFrom::Start(0))?;
            self.file.write_all(data.as_bytes())?;
            self.file.sync_all()
        })()
        .map_err(io_err)
    }

    /// Sync and release the file. The store is consumed.
    pub fn close(mut self) -> Result<(), KvError> {
        self.sync()
    }

    fn push_unique(&mut self, pair: KvPair) {
        if !self.pairs.iter().any(|p| p.same_record(&pair)) {
            self.pairs.push(pair);
        }
    }
}
