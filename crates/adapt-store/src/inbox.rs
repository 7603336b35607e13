//! File-backed command inbox.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use adapt_core::{CommandInbox, StoreError};

/// Single-slot inbox backed by a command file the coordinator writes.
///
/// Presence of the file is "one command pending"; consuming reads the
/// content and removes the file, so a command is executed exactly
/// once.
pub struct FileInbox {
    path: PathBuf,
}

impl FileInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_slot(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let command = raw.trim();
                if command.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(command.to_string()))
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io("reading command file", &err)),
        }
    }
}

impl CommandInbox for FileInbox {
    fn peek(&self) -> Result<Option<String>, StoreError> {
        self.read_slot()
    }

    fn consume(&self) -> Result<Option<String>, StoreError> {
        let command = self.read_slot()?;
        if command.is_some() {
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(StoreError::io("clearing command file", &err)),
            }
        }
        Ok(command)
    }
}
