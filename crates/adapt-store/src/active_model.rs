//! Active-model pointer file.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use adapt_core::{ActiveModelStore, ModelId, StoreError};

/// The single mutable cell naming the active model, stored as a plain
/// text file the inference collaborator reads before each prediction.
///
/// Writes go through a temp file and rename so the collaborator never
/// observes a half-written name.
pub struct FileActiveModel {
    path: PathBuf,
}

impl FileActiveModel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ActiveModelStore for FileActiveModel {
    fn current(&self) -> Result<Option<ModelId>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io("reading active-model pointer", &err)),
        };
        let name = raw.trim();
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(ModelId::new(name)))
    }

    fn set_current(&self, model: &ModelId) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, model.as_str())
            .map_err(|err| StoreError::io("writing active-model temp file", &err))?;
        fs::rename(&tmp, &self.path)
            .map_err(|err| StoreError::io("renaming active-model temp file", &err))?;
        Ok(())
    }
}
