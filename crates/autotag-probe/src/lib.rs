//! Crate `autotag_probe`: decodificación de audio, inferencia de modelos y
//! escritura de tags sobre ficheros reales.

pub mod analysis;
pub mod audio;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod tags;

pub use audio::{AudioLoader, MonoAudio};
pub use error::Error;
pub use model::{ClassifierHead, EmbeddingModel, HeadSpec, ModelBackend, ModelMetadata, load_metadata};
pub use pipeline::probe::{Probe, ProbeBuilder, ProbeConfig};

pub mod prelude {
    pub use crate::audio::{AudioLoader, MonoAudio};
    pub use crate::error::Error;
    pub use crate::model::{ClassifierHead, EmbeddingModel, HeadSpec, ModelBackend};
    pub use crate::pipeline::probe::{Probe, ProbeBuilder};
}
