#[cfg(feature = "symphonia")]
mod symphonia_native;

#[cfg(feature = "symphonia")]
pub use symphonia_native::SymphoniaLoader;

use std::path::Path;

use crate::audio::{AudioLoader, MonoAudio};
use crate::error::Error;

/// Loader por defecto cuando no se compiló ningún decodificador.
pub struct NoopLoader;

impl AudioLoader for NoopLoader {
    fn load(&self, _path: &Path, _sample_rate: u32, _quality: u8) -> Result<MonoAudio, Error> {
        Err(Error::Unsupported("no audio decoder compiled in"))
    }
}
