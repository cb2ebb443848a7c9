use chrono::Utc;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{DashError, Result};

lazy_static! {
    static ref KEY_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,127}$").unwrap();
}

const EXTENSION: &str = "json.gz";

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    key: String,
    stored_at: i64,
    value: T,
}

/// Flat-file cache keyed by identifier
///
/// Each entry is one gzip-compressed JSON file named after its key.
#[derive(Clone, Debug)]
pub struct FileCache {
    dir: PathBuf,
    max_age_secs: Option<u64>,
}

impl FileCache {
    /// Opens a cache in `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_age_secs: None,
        })
    }

    pub fn with_max_age(mut self, secs: Option<u64>) -> Self {
        self.max_age_secs = secs;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        if !KEY_REGEX.is_match(key) || key.contains("..") {
            return Err(DashError::InvalidName {
                name: key.to_string(),
                reason: "cache keys are 1-128 characters of [A-Za-z0-9_.-]",
            });
        }
        Ok(self.dir.join(format!("{}.{}", key, EXTENSION)))
    }

    /// Stores `value` under `key`, replacing any previous entry
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path(key)?;
        let file = File::create(&path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = BufWriter::new(encoder);
        let envelope = Envelope {
            key: key.to_string(),
            stored_at: Utc::now().timestamp(),
            value,
        };
        serde_json::to_writer(&mut writer, &envelope)?;
        writer.flush()?;
        let encoder = writer.into_inner().map_err(|e| e.into_error())?;
        encoder.finish()?;
        debug!("cached '{}' at {}", key, path.display());
        Ok(())
    }

    /// Reads the entry stored under `key`
    ///
    /// Missing and expired entries read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(GzDecoder::new(file));
        let envelope: Envelope<T> = serde_json::from_reader(reader)?;
        if let Some(max_age) = self.max_age_secs {
            let age = Utc::now().timestamp().saturating_sub(envelope.stored_at);
            if age > i64::try_from(max_age).unwrap_or(i64::MAX) {
                debug!("cache entry '{}' expired ({}s old)", key, age);
                return Ok(None);
            }
        }
        Ok(Some(envelope.value))
    }

    /// Returns the cached value, computing and storing it when absent
    pub fn get_or_insert_with<T, F>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        match self.get(key) {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(DashError::Json(e)) => warn!("discarding unreadable cache entry '{}': {}", key, e),
            Err(e) => return Err(e),
        }
        let value = compute()?;
        self.put(key, &value)?;
        Ok(value)
    }

    /// Removes one entry; returns whether it existed
    pub fn invalidate(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes every entry; returns how many were removed
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_entry = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(EXTENSION));
            if is_entry {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{Figure, Trace};

    #[test]
    fn stores_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        let fig = Figure::new("cached").with_trace(Trace::line("a", vec![1.0], vec![2.0]));
        cache.put("chart-1", &fig).unwrap();
        let back: Option<Figure> = cache.get("chart-1").unwrap();
        assert_eq!(back, Some(fig));
        assert_eq!(cache.get::<Figure>("chart-2").unwrap(), None);
    }

    #[test]
    fn computes_only_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        let first: u32 = cache.get_or_insert_with("n", || Ok(1)).unwrap();
        let second: u32 = cache.get_or_insert_with("n", || Ok(2)).unwrap();
        assert_eq!((first, second), (1, 1));
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(br#"{"key":"old","stored_at":0,"value":5}"#)
            .unwrap();
        encoder.finish().unwrap();

        let cache = FileCache::open(dir.path()).unwrap();
        assert_eq!(cache.get::<u32>("old").unwrap(), Some(5));
        let cache = cache.with_max_age(Some(60));
        assert_eq!(cache.get::<u32>("old").unwrap(), None);
    }

    #[test]
    fn huge_max_age_never_expires() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap().with_max_age(Some(u64::MAX));
        cache.put("fresh", &7u32).unwrap();
        assert_eq!(cache.get::<u32>("fresh").unwrap(), Some(7));

        let path = dir.path().join("ancient.json.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder
            .write_all(br#"{"key":"ancient","stored_at":-9223372036854775808,"value":1}"#)
            .unwrap();
        encoder.finish().unwrap();
        assert_eq!(cache.get::<u32>("ancient").unwrap(), Some(1));
    }

    #[test]
    fn invalidate_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        cache.put("a", &1).unwrap();
        cache.put("b", &2).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        assert!(cache.invalidate("a").unwrap());
        assert!(!cache.invalidate("a").unwrap());
        assert_eq!(cache.clear().unwrap(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        assert!(matches!(
            cache.put("../escape", &1),
            Err(DashError::InvalidName { .. })
        ));
        assert!(cache.get::<u32>("a..b").is_err());
    }
}
