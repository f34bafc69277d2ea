#[cfg(feature = "lofty")]
mod lofty_sink;

#[cfg(feature = "lofty")]
pub use lofty_sink::LoftyTagSink;

use std::path::Path;

use autotag_core::{ContainerKind, TagSink, TagWrite, TagWriteError, WriteOutcome};

const NO_BACKEND: &str = "no tag backend compiled in";

/// Sink por defecto cuando no se compiló ningún backend de metadatos.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTagSink;

impl TagSink for NoopTagSink {
    fn detect(&self, _path: &Path) -> Result<ContainerKind, TagWriteError> {
        Err(TagWriteError::Backend(NO_BACKEND.to_string()))
    }

    fn apply(
        &self,
        _path: &Path,
        _container: ContainerKind,
        _writes: &[TagWrite],
    ) -> Result<WriteOutcome, TagWriteError> {
        Err(TagWriteError::Backend(NO_BACKEND.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autotag_core::encode_value;

    #[test]
    fn noop_sink_never_reports_a_write() {
        let err = encode_value(&NoopTagSink, Path::new("/music/a.flac"), &["GENRE_AUTO"], "Rock");
        assert!(matches!(err, Err(TagWriteError::Backend(msg)) if msg == NO_BACKEND));
        assert!(NoopTagSink.apply(Path::new("/music/a.flac"), ContainerKind::Flac, &[]).is_err());
    }
}
