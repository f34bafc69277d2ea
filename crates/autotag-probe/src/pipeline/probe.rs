use std::path::Path;

use autotag_core::TagSink;

use crate::{
    audio::{AudioLoader, MonoAudio},
    error::Error,
    model::{ClassifierHead, EmbeddingModel, HeadSpec, ModelBackend, ModelMetadata, load_metadata},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Hilos de cada sesión de inferencia.
    pub intra_threads: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig { intra_threads: 1 }
    }
}

#[derive(Default)]
pub struct ProbeBuilder {
    cfg: ProbeConfig,
    loader: Option<Box<dyn AudioLoader + Send + Sync>>,
    backend: Option<Box<dyn ModelBackend + Send + Sync>>,
    sink: Option<Box<dyn TagSink + Send + Sync>>,
}

impl ProbeBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.cfg.intra_threads = threads.max(1);
        self
    }

    pub fn with_loader<L: AudioLoader + Send + Sync + 'static>(mut self, l: L) -> Self {
        self.loader = Some(Box::new(l));
        self
    }
    pub fn with_backend<B: ModelBackend + Send + Sync + 'static>(mut self, b: B) -> Self {
        self.backend = Some(Box::new(b));
        self
    }
    pub fn with_sink<S: TagSink + Send + Sync + 'static>(mut self, s: S) -> Self {
        self.sink = Some(Box::new(s));
        self
    }

    pub fn build(self) -> Probe {
        let cfg = self.cfg;
        Probe {
            cfg,
            loader: self.loader.unwrap_or_else(default_loader),
            backend: self.backend.unwrap_or_else(|| default_backend(&cfg)),
            sink: self.sink.unwrap_or_else(default_sink),
        }
    }
}

/// Punto de entrada a todo lo que toca disco o runtime: audio, modelos y tags.
pub struct Probe {
    cfg: ProbeConfig,
    loader: Box<dyn AudioLoader + Send + Sync>,
    backend: Box<dyn ModelBackend + Send + Sync>,
    sink: Box<dyn TagSink + Send + Sync>,
}

pub fn default_loader() -> Box<dyn AudioLoader + Send + Sync> {
    #[cfg(feature = "symphonia")]
    {
        Box::new(crate::audio::decoder::SymphoniaLoader::new())
    }
    #[cfg(not(feature = "symphonia"))]
    {
        Box::new(crate::audio::decoder::NoopLoader)
    }
}

pub fn default_backend(cfg: &ProbeConfig) -> Box<dyn ModelBackend + Send + Sync> {
    #[cfg(feature = "onnx")]
    {
        Box::new(crate::model::onnx::OnnxBackend::new().with_intra_threads(cfg.intra_threads))
    }
    #[cfg(not(feature = "onnx"))]
    {
        let _ = cfg;
        Box::new(crate::model::NoopBackend)
    }
}

pub fn default_sink() -> Box<dyn TagSink + Send + Sync> {
    #[cfg(feature = "lofty")]
    {
        Box::new(crate::tags::LoftyTagSink::new())
    }
    #[cfg(not(feature = "lofty"))]
    {
        Box::new(crate::tags::NoopTagSink)
    }
}

impl Probe {
    pub fn builder() -> ProbeBuilder {
        ProbeBuilder::default()
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.cfg
    }

    /// Decodifica a mono y remuestrea; la parte más cara después de la inferencia.
    pub fn load_audio<P: AsRef<Path>>(&self, path: P, sample_rate: u32, quality: u8) -> Result<MonoAudio, Error> {
        let audio = self.loader.load(path.as_ref(), sample_rate, quality)?;
        if audio.samples.is_empty() {
            return Err(Error::EmptyAudio(path.as_ref().display().to_string()));
        }
        Ok(audio)
    }

    pub fn load_embedding_model<P: AsRef<Path>>(
        &self,
        path: P,
        output: Option<&str>,
    ) -> Result<Box<dyn EmbeddingModel + Send + Sync>, Error> {
        self.backend.load_embedding(path.as_ref(), output)
    }

    pub fn load_head(&self, spec: &HeadSpec) -> Result<Box<dyn ClassifierHead + Send + Sync>, Error> {
        self.backend.load_head(spec)
    }

    pub fn load_metadata<P: AsRef<Path>>(&self, path: P) -> Result<ModelMetadata, Error> {
        load_metadata(path.as_ref())
    }

    pub fn sink(&self) -> &dyn TagSink {
        self.sink.as_ref()
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoopBackend;
    use autotag_core::MemoryTagSink;

    struct Silence;

    impl AudioLoader for Silence {
        fn load(&self, _path: &Path, sample_rate: u32, _quality: u8) -> Result<MonoAudio, Error> {
            Ok(MonoAudio {
                samples: Vec::new(),
                sample_rate,
            })
        }
    }

    #[test]
    fn empty_decode_is_an_error() {
        let probe = Probe::builder().with_loader(Silence).build();
        assert!(matches!(
            probe.load_audio("/music/a.wav", 16_000, 4),
            Err(Error::EmptyAudio(_))
        ));
    }

    #[test]
    fn injected_parts_are_used() {
        let probe = Probe::builder()
            .intra_threads(0)
            .with_backend(NoopBackend)
            .with_sink(MemoryTagSink::default())
            .build();

        assert_eq!(probe.config().intra_threads, 1);
        assert!(matches!(
            probe.load_embedding_model("/models/effnet.onnx", None),
            Err(Error::Unsupported(_))
        ));
        assert!(probe.sink().detect(Path::new("/music/a.flac")).is_ok());
    }

    #[cfg(not(feature = "lofty"))]
    #[test]
    fn without_a_tag_backend_writes_fail() {
        let probe = Probe::default();
        assert!(probe.sink().detect(Path::new("/music/a.flac")).is_err());
    }
}
