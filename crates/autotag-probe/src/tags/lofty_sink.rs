use std::borrow::Cow;
use std::fs::{self, File};
use std::path::Path;

use autotag_core::{ContainerKind, FieldTarget, TagSink, TagWrite, TagWriteError, WriteOutcome};
use lofty::{
    TextEncoding,
    config::{ParseOptions, WriteOptions},
    error::LoftyError,
    file::{AudioFile, FileType},
    flac::FlacFile,
    iff::wav::WavFile,
    id3::v2::{Frame, FrameId, Id3v2Tag, TextInformationFrame},
    mp4::{Atom, AtomData, AtomIdent, Ilst, Mp4File},
    mpeg::MpegFile,
    ogg::{OpusFile, VorbisComments, VorbisFile},
    probe::Probe,
    tag::TagExt,
};
use tracing::{debug, trace};

/// Escribe los campos directamente en el fichero con lofty.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagSink;

impl LoftyTagSink {
    pub fn new() -> Self {
        Self
    }
}

fn backend(e: LoftyError) -> TagWriteError {
    TagWriteError::Backend(e.to_string())
}

fn container_of(file_type: FileType) -> Option<ContainerKind> {
    match file_type {
        FileType::Mpeg => Some(ContainerKind::Mpeg),
        FileType::Wav => Some(ContainerKind::Wav),
        FileType::Flac => Some(ContainerKind::Flac),
        FileType::Vorbis => Some(ContainerKind::OggVorbis),
        FileType::Opus => Some(ContainerKind::OggOpus),
        FileType::Mp4 => Some(ContainerKind::Mp4),
        _ => None,
    }
}

/// Tag nativo del contenedor, leído tal cual para no perder frames al reescribir.
enum NativeTag {
    Id3v2(Id3v2Tag),
    Vorbis(VorbisComments),
    Ilst(Ilst),
}

impl NativeTag {
    fn read(path: &Path, container: ContainerKind) -> Result<Self, TagWriteError> {
        let mut file = File::open(path)?;
        let opts = ParseOptions::new().read_properties(false);

        let tag = match container {
            ContainerKind::Mpeg => NativeTag::Id3v2(
                MpegFile::read_from(&mut file, opts)
                    .map_err(backend)?
                    .id3v2()
                    .cloned()
                    .unwrap_or_default(),
            ),
            ContainerKind::Wav => NativeTag::Id3v2(
                WavFile::read_from(&mut file, opts)
                    .map_err(backend)?
                    .id3v2()
                    .cloned()
                    .unwrap_or_default(),
            ),
            ContainerKind::Flac => NativeTag::Vorbis(
                FlacFile::read_from(&mut file, opts)
                    .map_err(backend)?
                    .vorbis_comments()
                    .cloned()
                    .unwrap_or_default(),
            ),
            ContainerKind::OggVorbis => NativeTag::Vorbis(
                VorbisFile::read_from(&mut file, opts)
                    .map_err(backend)?
                    .vorbis_comments()
                    .clone(),
            ),
            ContainerKind::OggOpus => NativeTag::Vorbis(
                OpusFile::read_from(&mut file, opts)
                    .map_err(backend)?
                    .vorbis_comments()
                    .clone(),
            ),
            ContainerKind::Mp4 => NativeTag::Ilst(
                Mp4File::read_from(&mut file, opts)
                    .map_err(backend)?
                    .ilst()
                    .cloned()
                    .unwrap_or_default(),
            ),
        };
        Ok(tag)
    }

    /// Devuelve `true` si el valor cambió.
    fn set(&mut self, target: &FieldTarget, value: &str) -> Result<bool, TagWriteError> {
        match (self, target) {
            (NativeTag::Id3v2(tag), FieldTarget::UserText { description }) => {
                if tag.get_user_text(description) == Some(value) {
                    return Ok(false);
                }
                tag.insert_user_text(description.clone(), value.to_string());
                Ok(true)
            }
            (NativeTag::Id3v2(tag), FieldTarget::TextFrame { id }) => {
                let frame_id = FrameId::new(id.clone()).map_err(backend)?;
                if tag.get_text(&frame_id) == Some(value) {
                    return Ok(false);
                }
                tag.insert(Frame::Text(TextInformationFrame::new(
                    frame_id,
                    TextEncoding::UTF8,
                    value.to_string(),
                )));
                Ok(true)
            }
            (NativeTag::Vorbis(tag), FieldTarget::VorbisComment { key }) => {
                if tag.get(key) == Some(value) {
                    return Ok(false);
                }
                tag.insert(key.clone(), value.to_string());
                Ok(true)
            }
            (NativeTag::Ilst(tag), FieldTarget::FreeformAtom { mean, name }) => {
                let ident = AtomIdent::Freeform {
                    mean: Cow::Owned(mean.clone()),
                    name: Cow::Owned(name.clone()),
                };
                let current = tag.get(&ident).and_then(|atom| {
                    atom.data().find_map(|d| match d {
                        AtomData::UTF8(s) => Some(s.as_str()),
                        _ => None,
                    })
                });
                if current == Some(value) {
                    return Ok(false);
                }
                tag.replace_atom(Atom::new(ident, AtomData::UTF8(value.to_string())));
                Ok(true)
            }
            (_, target) => Err(TagWriteError::Backend(format!(
                "field {target:?} does not belong to this container"
            ))),
        }
    }

    fn save(&self, path: &Path) -> Result<(), TagWriteError> {
        let opts = WriteOptions::default();
        match self {
            NativeTag::Id3v2(tag) => tag.save_to_path(path, opts),
            NativeTag::Vorbis(tag) => tag.save_to_path(path, opts),
            NativeTag::Ilst(tag) => tag.save_to_path(path, opts),
        }
        .map_err(backend)
    }
}

impl TagSink for LoftyTagSink {
    fn detect(&self, path: &Path) -> Result<ContainerKind, TagWriteError> {
        let guessed = Probe::open(path)
            .and_then(|p| p.guess_file_type().map_err(LoftyError::from))
            .ok()
            .and_then(|p| p.file_type());

        match guessed {
            Some(ft) => container_of(ft)
                .ok_or_else(|| TagWriteError::UnsupportedContainer(format!("{ft:?}"))),
            None => ContainerKind::from_path(path)
                .ok_or_else(|| TagWriteError::UnknownContainer(path.display().to_string())),
        }
    }

    fn apply(
        &self,
        path: &Path,
        container: ContainerKind,
        writes: &[TagWrite],
    ) -> Result<WriteOutcome, TagWriteError> {
        if fs::metadata(path)?.permissions().readonly() {
            return Err(TagWriteError::ReadOnly(path.display().to_string()));
        }

        let mut tag = NativeTag::read(path, container)?;
        let mut outcome = WriteOutcome::default();
        for write in writes {
            if tag.set(&write.target, &write.value)? {
                trace!(path = %path.display(), tag = %write.identifier, "campo actualizado");
                outcome.changed += 1;
            } else {
                outcome.unchanged += 1;
            }
        }

        if outcome.changed > 0 {
            tag.save(path)?;
            debug!(path = %path.display(), changed = outcome.changed, "tags guardados");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autotag_core::encode_value;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::tempdir;

    fn write_wav(path: &Path) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut w = WavWriter::create(path, spec).unwrap();
        for i in 0..1600 {
            w.write_sample(((i % 100) as i16 - 50) * 100).unwrap();
        }
        w.finalize().unwrap();
    }

    fn user_text(path: &Path, description: &str) -> Option<String> {
        let mut file = File::open(path).unwrap();
        let wav = WavFile::read_from(&mut file, ParseOptions::new()).unwrap();
        wav.id3v2()?.get_user_text(description).map(str::to_string)
    }

    #[test]
    fn detects_wav_by_signature() {
        let tmp = tempdir().unwrap();
        // extensión engañosa: manda la firma
        let path = tmp.path().join("track.mp3");
        write_wav(&path);
        assert_eq!(LoftyTagSink.detect(&path).unwrap(), ContainerKind::Wav);
    }

    #[test]
    fn writes_user_text_into_wav_and_skips_unchanged() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("track.wav");
        write_wav(&path);

        let sink = LoftyTagSink::new();
        let report = encode_value(&sink, &path, &["GENRE_AUTO", "TXXX:Mood"], "Rock ; Pop").unwrap();
        assert_eq!(report.container, ContainerKind::Wav);
        assert_eq!(report.outcome.changed, 2);
        assert_eq!(user_text(&path, "GENRE_AUTO").as_deref(), Some("Rock ; Pop"));
        assert_eq!(user_text(&path, "Mood").as_deref(), Some("Rock ; Pop"));

        let again = encode_value(&sink, &path, &["GENRE_AUTO"], "Rock ; Pop").unwrap();
        assert_eq!(again.outcome, WriteOutcome { changed: 0, unchanged: 1 });
    }

    /// Copia un fixture de `testdata/` a un directorio temporal para poder reescribirlo.
    fn fixture(tmp: &Path, name: &str) -> std::path::PathBuf {
        let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name);
        let dst = tmp.join(name);
        fs::copy(src, &dst).unwrap();
        dst
    }

    #[test]
    fn writes_vorbis_comments_into_flac() {
        let tmp = tempdir().unwrap();
        let path = fixture(tmp.path(), "tiny.flac");
        assert_eq!(LoftyTagSink.detect(&path).unwrap(), ContainerKind::Flac);

        let report = encode_value(&LoftyTagSink, &path, &["GENRE_AUTO", "VORBIS:mood"], "Rock ; Pop").unwrap();
        assert_eq!(report.outcome.changed, 2);

        let mut file = File::open(&path).unwrap();
        let flac = FlacFile::read_from(&mut file, ParseOptions::new().read_properties(false)).unwrap();
        let comments = flac.vorbis_comments().unwrap();
        assert_eq!(comments.get("GENRE_AUTO"), Some("Rock ; Pop"));
        assert_eq!(comments.get("MOOD"), Some("Rock ; Pop"));

        let again = encode_value(&LoftyTagSink, &path, &["GENRE_AUTO"], "Rock ; Pop").unwrap();
        assert_eq!(again.outcome, WriteOutcome { changed: 0, unchanged: 1 });
    }

    #[test]
    fn writes_freeform_atoms_into_mp4() {
        let tmp = tempdir().unwrap();
        let path = fixture(tmp.path(), "tiny.m4a");
        assert_eq!(LoftyTagSink.detect(&path).unwrap(), ContainerKind::Mp4);

        let ids = ["GENRE_AUTO", "----:org.example:STYLE", "ID3:TCON"];
        let report = encode_value(&LoftyTagSink, &path, &ids, "Jazz").unwrap();
        assert_eq!(report.outcome.changed, 2);
        assert_eq!(report.skipped.len(), 1);

        let mut file = File::open(&path).unwrap();
        let mp4 = Mp4File::read_from(&mut file, ParseOptions::new().read_properties(false)).unwrap();
        let ilst = mp4.ilst().unwrap();
        let text = |mean: &'static str, name: &'static str| {
            ilst.get(&AtomIdent::Freeform {
                mean: Cow::Borrowed(mean),
                name: Cow::Borrowed(name),
            })
            .and_then(|atom| {
                atom.data().find_map(|d| match d {
                    AtomData::UTF8(s) => Some(s.clone()),
                    _ => None,
                })
            })
        };
        assert_eq!(text("com.apple.iTunes", "GENRE_AUTO").as_deref(), Some("Jazz"));
        assert_eq!(text("org.example", "STYLE").as_deref(), Some("Jazz"));
    }

    #[test]
    fn read_only_file_is_reported() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("locked.wav");
        write_wav(&path);
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        let err = encode_value(&LoftyTagSink, &path, &["GENRE_AUTO"], "Rock");
        assert!(matches!(err, Err(TagWriteError::ReadOnly(_))));
    }

    #[test]
    fn unreadable_file_without_known_extension() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("notes.txt");
        fs::write(&path, b"not audio").unwrap();
        assert!(LoftyTagSink.detect(&path).is_err());
    }
}
