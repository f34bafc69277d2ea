use std::path::{Path, PathBuf};

use autotag_core::Analysis;

use crate::report::ReportContext;

/// Lista los ficheros de audio de una carpeta de datos.
pub trait FileDiscovery {
    /// Rutas en un orden estable. Un error aquí invalida el grupo entero.
    fn discover(&self, folder: &Path) -> anyhow::Result<Vec<PathBuf>>;
}

/// Destino de los informes legibles de cada pipeline.
pub trait ReportWriter {
    /// Borra el informe anterior. `Ok(false)` si no existía.
    fn reset(&self, path: &Path) -> anyhow::Result<bool>;

    /// Añade el bloque de un fichero analizado al final del informe.
    fn append(&self, path: &Path, ctx: &ReportContext<'_>, analysis: &Analysis) -> anyhow::Result<()>;
}
