use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::encoding::{ContainerKind, FieldTarget, TagSink, TagWrite, WriteOutcome};
use crate::error::TagWriteError;

type Fields = HashMap<FieldTarget, String>;

/// Sink en memoria: no toca disco. Para pruebas y para quien quiera
/// inspeccionar los campos sin escribirlos.
#[derive(Debug, Default)]
pub struct MemoryTagSink {
    files: Mutex<HashMap<PathBuf, Fields>>,
    saves: Mutex<HashMap<PathBuf, usize>>,
}

impl MemoryTagSink {
    pub fn field(&self, path: &Path, target: &FieldTarget) -> Option<String> {
        let files = self.files.lock().ok()?;
        files.get(path)?.get(target).cloned()
    }

    /// Veces que se "guardó" `path` con al menos un cambio.
    pub fn saves(&self, path: &Path) -> usize {
        self.saves
            .lock()
            .map(|s| s.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn tagged_files(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .lock()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

impl TagSink for MemoryTagSink {
    fn detect(&self, path: &Path) -> Result<ContainerKind, TagWriteError> {
        ContainerKind::from_path(path)
            .ok_or_else(|| TagWriteError::UnknownContainer(path.display().to_string()))
    }

    fn apply(
        &self,
        path: &Path,
        _container: ContainerKind,
        writes: &[TagWrite],
    ) -> Result<WriteOutcome, TagWriteError> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| TagWriteError::Backend("memory sink poisoned".into()))?;
        let fields = files.entry(path.to_path_buf()).or_default();

        let mut outcome = WriteOutcome::default();
        for write in writes {
            if fields.get(&write.target) == Some(&write.value) {
                outcome.unchanged += 1;
                continue;
            }
            fields.insert(write.target.clone(), write.value.clone());
            outcome.changed += 1;
        }

        if outcome.changed > 0 {
            let mut saves = self
                .saves
                .lock()
                .map_err(|_| TagWriteError::Backend("memory sink poisoned".into()))?;
            *saves.entry(path.to_path_buf()).or_default() += 1;
        }
        Ok(outcome)
    }
}
