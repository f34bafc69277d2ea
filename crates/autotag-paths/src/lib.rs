//! Crate `autotag_paths`: rutas por usuario, lock de ejecución y utilidades de fs

mod errors;
pub mod fs_utils;
mod paths;

pub use errors::Error;
pub use paths::{AutotagPaths, ENV_BASE_DIR};
