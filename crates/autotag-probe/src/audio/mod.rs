pub mod decoder;
pub mod resample;

use crate::error::Error;
use std::path::Path;

/// Señal mono en f32 [-1, 1] a una frecuencia fija.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoAudio {
    pub fn duration_s(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decodifica un fichero a mono y lo remuestrea a `sample_rate`.
pub trait AudioLoader {
    /// `quality` va de 0 (mejor) a 4 (más rápido).
    fn load(&self, path: &Path, sample_rate: u32, quality: u8) -> Result<MonoAudio, Error>;
}
