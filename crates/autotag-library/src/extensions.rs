use serde::{Deserialize, Serialize};

/// Extensiones que se recogen de cada carpeta de datos.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SupportedExtension {
    Mp3,
    Wav,
    Flac,
    Mp4,
    M4a,
    Ogg,
}

impl SupportedExtension {
    pub const ALL: &'static [SupportedExtension] = &[
        SupportedExtension::Mp3,
        SupportedExtension::Wav,
        SupportedExtension::Flac,
        SupportedExtension::Mp4,
        SupportedExtension::M4a,
        SupportedExtension::Ogg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedExtension::Mp3 => "mp3",
            SupportedExtension::Wav => "wav",
            SupportedExtension::Flac => "flac",
            SupportedExtension::Mp4 => "mp4",
            SupportedExtension::M4a => "m4a",
            SupportedExtension::Ogg => "ogg",
        }
    }
}

impl std::str::FromStr for SupportedExtension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        SupportedExtension::ALL
            .iter()
            .find(|ext| ext.as_str() == lower)
            .cloned()
            .ok_or_else(|| format!("Extension not supported: {}", s))
    }
}

impl std::fmt::Display for SupportedExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn default_extensions() -> Vec<SupportedExtension> {
    SupportedExtension::ALL.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("FLAC".parse::<SupportedExtension>(), Ok(SupportedExtension::Flac));
        assert!("opus".parse::<SupportedExtension>().is_err());
    }
}
