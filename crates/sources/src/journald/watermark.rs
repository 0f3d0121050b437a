//! High-watermark cursor persistence
//!
//! A plain-text file holding the cursor of the last acknowledged journal
//! record. Restart resumes exactly after it; an absent or empty file
//! means "start from the beginning of available history".

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handle to the cursor file
///
/// Clones share one open file; stores from concurrent acknowledgment
/// callbacks serialize on an internal lock.
#[derive(Clone)]
pub struct Watermark {
    file: Arc<Mutex<File>>,
}

impl Watermark {
    /// Open (or create) the cursor file at `path`
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Read the persisted cursor, `None` if nothing was ever stored
    pub fn load(&self) -> io::Result<Option<String>> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let cursor = contents.trim();
        if cursor.is_empty() {
            Ok(None)
        } else {
            Ok(Some(cursor.to_string()))
        }
    }

    /// Replace the persisted cursor
    pub fn store(&self, cursor: &str) -> io::Result<()> {
        let mut file = self.file.lock();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(cursor.as_bytes())?;
        Ok(())
    }
}
