use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::TagWriteError;

/// `mean` de los átomos freeform de iTunes.
pub const ITUNES_MEAN: &str = "com.apple.iTunes";

/// Contenedores en los que sabemos escribir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Mpeg,
    Wav,
    Flac,
    OggVorbis,
    OggOpus,
    Mp4,
}

/// Forma en que un contenedor guarda campos de texto libres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingStrategy {
    /// Frames ID3v2 (`TXXX` o frames de texto nativos).
    FreeTextFrame,
    /// Pares clave/valor de Vorbis comments.
    VorbisComment,
    /// Átomos `----:mean:name` de MP4.
    FreeformAtom,
}

impl ContainerKind {
    pub const ALL: &'static [ContainerKind] = &[
        ContainerKind::Mpeg,
        ContainerKind::Wav,
        ContainerKind::Flac,
        ContainerKind::OggVorbis,
        ContainerKind::OggOpus,
        ContainerKind::Mp4,
    ];

    pub fn strategy(self) -> EncodingStrategy {
        match self {
            ContainerKind::Mpeg | ContainerKind::Wav => EncodingStrategy::FreeTextFrame,
            ContainerKind::Flac | ContainerKind::OggVorbis | ContainerKind::OggOpus => {
                EncodingStrategy::VorbisComment
            }
            ContainerKind::Mp4 => EncodingStrategy::FreeformAtom,
        }
    }

    /// Último recurso cuando no se puede leer la firma del fichero.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(ContainerKind::Mpeg),
            "wav" => Some(ContainerKind::Wav),
            "flac" => Some(ContainerKind::Flac),
            "ogg" | "oga" => Some(ContainerKind::OggVorbis),
            "opus" => Some(ContainerKind::OggOpus),
            "mp4" | "m4a" => Some(ContainerKind::Mp4),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Mpeg => "mpeg",
            ContainerKind::Wav => "wav",
            ContainerKind::Flac => "flac",
            ContainerKind::OggVorbis => "ogg-vorbis",
            ContainerKind::OggOpus => "ogg-opus",
            ContainerKind::Mp4 => "mp4",
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identificador de campo tal como aparece en `tags_to_write`.
///
/// - `TXXX:<desc>` o un nombre suelto (`GENRE_AUTO`): campo propio, válido en todo contenedor.
/// - `ID3:<FRAME>`: frame de texto ID3v2 nativo.
/// - `VORBIS:<KEY>`: clave Vorbis literal.
/// - `----:<mean>:<name>`: átomo freeform MP4.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagIdentifier {
    Custom(String),
    Id3Frame(String),
    VorbisKey(String),
    Mp4Freeform { mean: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed tag identifier `{0}`")]
pub struct InvalidTagIdentifier(pub String);

impl FromStr for TagIdentifier {
    type Err = InvalidTagIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || InvalidTagIdentifier(s.to_string());

        if let Some(desc) = raw.strip_prefix("TXXX:") {
            let desc = desc.trim();
            return if desc.is_empty() {
                Err(invalid())
            } else {
                Ok(TagIdentifier::Custom(desc.to_string()))
            };
        }
        if let Some(frame) = raw.strip_prefix("ID3:") {
            let valid = frame.len() == 4
                && frame.starts_with('T')
                && frame != "TXXX"
                && frame.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
            return if valid {
                Ok(TagIdentifier::Id3Frame(frame.to_string()))
            } else {
                Err(invalid())
            };
        }
        if let Some(key) = raw.strip_prefix("VORBIS:") {
            let valid = !key.is_empty() && key.chars().all(|c| (' '..='}').contains(&c) && c != '=');
            return if valid {
                Ok(TagIdentifier::VorbisKey(key.to_ascii_uppercase()))
            } else {
                Err(invalid())
            };
        }
        if let Some(rest) = raw.strip_prefix("----:") {
            return match rest.split_once(':') {
                Some((mean, name)) if !mean.is_empty() && !name.is_empty() => {
                    Ok(TagIdentifier::Mp4Freeform {
                        mean: mean.to_string(),
                        name: name.to_string(),
                    })
                }
                _ => Err(invalid()),
            };
        }
        if raw.is_empty() || raw.contains(':') {
            return Err(invalid());
        }
        Ok(TagIdentifier::Custom(raw.to_string()))
    }
}

/// Campo concreto dentro de un contenedor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldTarget {
    /// `TXXX` con descripción.
    UserText { description: String },
    /// Frame de texto ID3v2 nativo (`TCON`, `TMOO`...).
    TextFrame { id: String },
    VorbisComment { key: String },
    FreeformAtom { mean: String, name: String },
}

impl TagIdentifier {
    /// Campo que corresponde a este identificador con la estrategia dada, si existe.
    pub fn target(&self, strategy: EncodingStrategy) -> Option<FieldTarget> {
        use EncodingStrategy::*;

        match (self, strategy) {
            (TagIdentifier::Custom(desc), FreeTextFrame) => Some(FieldTarget::UserText {
                description: desc.clone(),
            }),
            (TagIdentifier::Custom(desc), VorbisComment) => Some(FieldTarget::VorbisComment {
                key: desc.to_ascii_uppercase(),
            }),
            (TagIdentifier::Custom(desc), FreeformAtom) => Some(FieldTarget::FreeformAtom {
                mean: ITUNES_MEAN.to_string(),
                name: desc.clone(),
            }),
            (TagIdentifier::Id3Frame(id), FreeTextFrame) => {
                Some(FieldTarget::TextFrame { id: id.clone() })
            }
            (TagIdentifier::VorbisKey(key), VorbisComment) => {
                Some(FieldTarget::VorbisComment { key: key.clone() })
            }
            (TagIdentifier::Mp4Freeform { mean, name }, FreeformAtom) => {
                Some(FieldTarget::FreeformAtom {
                    mean: mean.clone(),
                    name: name.clone(),
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagWrite {
    /// Identificador original de la configuración.
    pub identifier: String,
    pub target: FieldTarget,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTag {
    pub identifier: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagWritePlan {
    pub container: ContainerKind,
    pub writes: Vec<TagWrite>,
    pub skipped: Vec<SkippedTag>,
}

/// Traduce los identificadores configurados a campos del contenedor.
///
/// Los que el contenedor no puede expresar (o que no se entienden) se apartan
/// en `skipped`; el resto se escribe igual.
pub fn plan_writes<S: AsRef<str>>(
    container: ContainerKind,
    identifiers: &[S],
    value: &str,
) -> TagWritePlan {
    let strategy = container.strategy();
    let mut writes = Vec::new();
    let mut skipped = Vec::new();

    for raw in identifiers {
        let raw = raw.as_ref();
        let reason = match raw.parse::<TagIdentifier>() {
            Ok(id) => match id.target(strategy) {
                Some(target) => {
                    writes.push(TagWrite {
                        identifier: raw.to_string(),
                        target,
                        value: value.to_string(),
                    });
                    continue;
                }
                None => format!("not expressible in {container} files"),
            },
            Err(e) => e.to_string(),
        };

        warn!(tag = raw, %container, %reason, "tag omitido");
        skipped.push(SkippedTag {
            identifier: raw.to_string(),
            reason,
        });
    }

    TagWritePlan {
        container,
        writes,
        skipped,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub changed: usize,
    pub unchanged: usize,
}

/// Backend que persiste los campos en el fichero.
pub trait TagSink {
    /// Tipo de contenedor del fichero (firma primero, extensión como respaldo).
    fn detect(&self, path: &Path) -> Result<ContainerKind, TagWriteError>;

    /// Aplica todos los campos y guarda una sola vez. Los valores iguales a los
    /// existentes no cuentan como cambio.
    fn apply(
        &self,
        path: &Path,
        container: ContainerKind,
        writes: &[TagWrite],
    ) -> Result<WriteOutcome, TagWriteError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeReport {
    pub container: ContainerKind,
    pub outcome: WriteOutcome,
    pub skipped: Vec<SkippedTag>,
}

/// Escribe `value` en cada identificador de `identifiers` del fichero `path`.
pub fn encode_value<S: AsRef<str>>(
    sink: &dyn TagSink,
    path: &Path,
    identifiers: &[S],
    value: &str,
) -> Result<EncodeReport, TagWriteError> {
    let container = sink.detect(path)?;
    let TagWritePlan { writes, mut skipped, .. } = plan_writes(container, identifiers, value);

    let outcome = if value.trim().is_empty() {
        // un valor vacío borraría lo que hubiera; se omite y queda constancia
        for write in writes {
            warn!(path = %path.display(), tag = %write.identifier, "valor vacío, tag omitido");
            skipped.push(SkippedTag {
                identifier: write.identifier,
                reason: "formatted value is empty".to_string(),
            });
        }
        WriteOutcome::default()
    } else if writes.is_empty() {
        debug!(path = %path.display(), "nada que escribir");
        WriteOutcome::default()
    } else {
        sink.apply(path, container, &writes)?
    };

    Ok(EncodeReport {
        container,
        outcome,
        skipped,
    })
}
