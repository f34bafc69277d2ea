use std::{env, fs::File, path::PathBuf};

use directories::ProjectDirs;

use crate::{errors::Error, fs_utils};

/// Nombre de la ENV var para override de ruta base (modo “portable”)
pub const ENV_BASE_DIR: &str = "AUTOTAG_BASE_DIR";

/// Rutas por usuario de autotag
#[derive(Debug, Clone)]
pub struct AutotagPaths {
    // config_dir
    pub config_dir: PathBuf,
    pub config_file: PathBuf,

    // data_dir
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub log_file: PathBuf,

    pub lock_file: PathBuf,
}

impl AutotagPaths {
    pub fn new() -> Result<Self, Error> {
        let (config_dir, data_dir) = if let Ok(base) = env::var(ENV_BASE_DIR) {
            let b = PathBuf::from(base);
            (b.join("config"), b.join("data"))
        } else {
            let proj = ProjectDirs::from("org", "Autotag", "autotag").ok_or(Error::NoHome)?;
            (proj.config_dir().to_path_buf(), proj.data_dir().to_path_buf())
        };

        let logs_dir = data_dir.join("logs");
        let paths = AutotagPaths {
            config_file: config_dir.join("config.json"),
            config_dir,
            log_file: logs_dir.join("autotag.log"),
            logs_dir,
            lock_file: data_dir.join("autotag.lock"),
            data_dir,
        };

        paths.ensure_structure()?;
        paths.validate_structure()?;

        Ok(paths)
    }

    /// Adquiere el advisory-lock de ejecución. Mantén vivo el File retornado.
    pub fn lock(&self) -> Result<File, Error> {
        fs_utils::lock_file(&self.lock_file)
    }

    /// Crea las carpetas base. El fichero de configuración no se crea: si falta,
    /// el que llama decide qué hacer.
    pub fn ensure_structure(&self) -> Result<(), Error> {
        fs_utils::ensure_dir(&self.config_dir)?;
        fs_utils::ensure_dir(&self.data_dir)?;
        fs_utils::ensure_dir(&self.logs_dir)?;
        Ok(())
    }

    /// Valida que cada carpeta existe y es escribible; las que falten se recrean.
    pub fn validate_structure(&self) -> Result<(), Error> {
        for dir in [&self.config_dir, &self.data_dir, &self.logs_dir] {
            if !dir.exists() {
                fs_utils::ensure_dir(dir)?;
            }
            fs_utils::check_writable(dir)?;
        }
        Ok(())
    }
}
