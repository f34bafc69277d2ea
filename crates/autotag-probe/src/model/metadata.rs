use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::Error;

/// Fichero JSON que acompaña a cada cabeza. Solo nos interesa `classes`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub name: Option<String>,
    pub classes: Vec<String>,
}

pub fn load_metadata(path: &Path) -> Result<ModelMetadata, Error> {
    let raw = fs::read_to_string(path)?;
    let meta: ModelMetadata =
        serde_json::from_str(&raw).map_err(|e| Error::metadata(path, e))?;
    tracing::debug!(path = %path.display(), classes = meta.classes.len(), "metadatos cargados");
    Ok(meta)
}
