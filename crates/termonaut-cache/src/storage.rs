//! Directory-backed artifact storage
//!
//! Layout under the cache root:
//!
//! ```text
//! meta/<fingerprint>.json   metadata record (CacheEntry)
//! svg/<fingerprint>.svg     vector image
//! ascii/<fingerprint>.txt   character art
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::key::is_valid_fingerprint;

const META_DIR: &str = "meta";
const VECTOR_DIR: &str = "svg";
const ASCII_DIR: &str = "ascii";
const STAGING_SUFFIX: &str = "tmp";

/// Cache storage manager
#[derive(Debug, Clone)]
pub struct CacheStorage {
    /// Root cache directory
    cache_dir: PathBuf,
}

/// A file written next to its destination, waiting to be renamed into place.
struct StagedFile {
    staged: PathBuf,
    dest: PathBuf,
}

impl CacheStorage {
    /// Create a storage rooted at `cache_dir`, creating the layout if needed
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let storage = Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
        };
        storage.ensure_layout()?;
        Ok(storage)
    }

    /// Create the root and the three artifact directories
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [META_DIR, VECTOR_DIR, ASCII_DIR] {
            let path = self.cache_dir.join(dir);
            fs::create_dir_all(&path).map_err(CacheError::io(&path))?;
        }
        Ok(())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.cache_dir.join(META_DIR)
    }

    pub fn meta_path(&self, fingerprint: &str) -> PathBuf {
        self.cache_dir.join(META_DIR).join(format!("{}.json", fingerprint))
    }

    pub fn vector_path(&self, fingerprint: &str) -> PathBuf {
        self.cache_dir.join(VECTOR_DIR).join(format!("{}.svg", fingerprint))
    }

    pub fn ascii_path(&self, fingerprint: &str) -> PathBuf {
        self.cache_dir.join(ASCII_DIR).join(format!("{}.txt", fingerprint))
    }

    fn paths(&self, fingerprint: &str) -> [PathBuf; 3] {
        [
            self.meta_path(fingerprint),
            self.vector_path(fingerprint),
            self.ascii_path(fingerprint),
        ]
    }

    pub(crate) fn check_key(fingerprint: &str) -> Result<()> {
        if is_valid_fingerprint(fingerprint) {
            Ok(())
        } else {
            Err(CacheError::InvalidKey(fingerprint.to_string()))
        }
    }

    /// Read the metadata record for a fingerprint
    pub fn read_entry(&self, fingerprint: &str) -> Result<CacheEntry> {
        Self::check_key(fingerprint)?;
        let path = self.meta_path(fingerprint);

        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|source| CacheError::Corrupt { path, source }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(CacheError::NotFound(fingerprint.to_string()))
            }
            Err(e) => Err(CacheError::io(&path)(e)),
        }
    }

    /// Rewrite only the metadata record
    pub fn write_entry(&self, fingerprint: &str, entry: &CacheEntry) -> Result<()> {
        Self::check_key(fingerprint)?;
        let content = serde_json::to_string_pretty(entry)?;
        let staged = stage(&self.meta_path(fingerprint), content.as_bytes())?;
        promote(vec![staged])
    }

    /// Write metadata and artifacts as one unit
    ///
    /// Every file is first written to a staging sibling; nothing is renamed
    /// into place until all writes have succeeded. Empty artifacts remove
    /// any older file for the same fingerprint.
    pub fn commit(
        &self,
        fingerprint: &str,
        entry: &CacheEntry,
        vector: &[u8],
        ascii: &str,
    ) -> Result<()> {
        Self::check_key(fingerprint)?;
        self.ensure_layout()?;

        let content = serde_json::to_string_pretty(entry)?;

        let mut writes: Vec<(PathBuf, &[u8])> = Vec::with_capacity(3);
        writes.push((self.meta_path(fingerprint), content.as_bytes()));
        if !vector.is_empty() {
            writes.push((self.vector_path(fingerprint), vector));
        }
        if !ascii.is_empty() {
            writes.push((self.ascii_path(fingerprint), ascii.as_bytes()));
        }

        let mut staged = Vec::with_capacity(writes.len());
        for (dest, bytes) in writes {
            match stage(&dest, bytes) {
                Ok(file) => staged.push(file),
                Err(e) => {
                    discard(&staged);
                    return Err(e);
                }
            }
        }

        promote(staged)?;

        if vector.is_empty() {
            remove_if_present(&self.vector_path(fingerprint))?;
        }
        if ascii.is_empty() {
            remove_if_present(&self.ascii_path(fingerprint))?;
        }

        log::debug!("Cache entry committed: {}", fingerprint);
        Ok(())
    }

    /// Read the vector artifact, if present
    pub fn read_vector(&self, fingerprint: &str) -> Option<Vec<u8>> {
        fs::read(self.vector_path(fingerprint)).ok()
    }

    /// Read the character-art artifact, if present
    pub fn read_ascii(&self, fingerprint: &str) -> Option<String> {
        fs::read_to_string(self.ascii_path(fingerprint)).ok()
    }

    /// Remove all files for a fingerprint
    ///
    /// Missing files are fine; any other failure is collected and reported
    /// after every removal has been attempted.
    pub fn delete(&self, fingerprint: &str) -> Result<()> {
        Self::check_key(fingerprint)?;

        let failures: Vec<String> = self
            .paths(fingerprint)
            .iter()
            .filter_map(|path| {
                remove_if_present(path)
                    .err()
                    .map(|e| e.to_string())
            })
            .collect();

        if failures.is_empty() {
            log::debug!("Cache entry deleted: {}", fingerprint);
            Ok(())
        } else {
            Err(CacheError::Delete(failures))
        }
    }

    /// Combined on-disk size of the three files for a fingerprint
    pub fn entry_size(&self, fingerprint: &str) -> u64 {
        self.paths(fingerprint)
            .iter()
            .filter_map(|path| fs::metadata(path).ok())
            .map(|metadata| metadata.len())
            .sum()
    }

    /// Fingerprints of every metadata file, sorted by name
    pub fn fingerprints(&self) -> Vec<String> {
        let meta_dir = self.meta_dir();
        if !meta_dir.exists() {
            return Vec::new();
        }

        walkdir::WalkDir::new(&meta_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect()
    }

    /// Combined size of every indexed entry
    ///
    /// Files with no metadata record, such as leftover staging files, are
    /// not counted since eviction cannot remove them.
    pub fn total_size(&self) -> Result<u64> {
        Ok(self
            .fingerprints()
            .iter()
            .map(|fingerprint| self.entry_size(fingerprint))
            .sum())
    }

    /// Remove the whole cache root
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.cache_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&self.cache_dir)(e)),
        }
    }
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(STAGING_SUFFIX);
    dest.with_file_name(name)
}

fn stage(dest: &Path, bytes: &[u8]) -> Result<StagedFile> {
    let staged = staging_path(dest);
    fs::write(&staged, bytes).map_err(CacheError::io(&staged))?;
    Ok(StagedFile {
        staged,
        dest: dest.to_path_buf(),
    })
}

fn promote(files: Vec<StagedFile>) -> Result<()> {
    for (index, file) in files.iter().enumerate() {
        if let Err(e) = fs::rename(&file.staged, &file.dest) {
            discard(&files[index..]);
            return Err(CacheError::io(&file.dest)(e));
        }
    }
    Ok(())
}

fn discard(files: &[StagedFile]) {
    for file in files {
        let _ = fs::remove_file(&file.staged);
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path)(e)),
    }
}
