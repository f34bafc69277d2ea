use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Separador entre etiquetas dentro de un único campo de metadatos.
pub const TAG_SEPARATOR: &str = " ; ";

/// Separador jerárquico de las etiquetas de algunos modelos ("Electronic---Techno").
const HIERARCHY_SEPARATOR: &str = "---";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lista ordenada y sin duplicados de las etiquetas finales de un (pipeline, fichero).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Añade `label` al final si no estaba ya. Devuelve `true` si se añadió.
    pub fn push(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.0.contains(&label) {
            return false;
        }
        self.0.push(label);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Valor listo para escribir en un campo de metadatos.
    pub fn to_value(&self) -> String {
        format_tag_value(&self.0)
    }
}

impl FromIterator<String> for TagSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for label in iter {
            set.push(label);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Une las etiquetas en un único valor de campo.
///
/// Cada entrada se parte por `;` y por el separador jerárquico, se limpian los
/// espacios, se capitaliza cada palabra y se descartan repetidas sin importar
/// mayúsculas (gana la primera). Aplicarla sobre su propia salida no cambia nada.
pub fn format_tag_value<S: AsRef<str>>(labels: &[S]) -> String {
    let mut seen = HashSet::new();
    let mut parts: Vec<String> = Vec::new();

    for label in labels {
        for element in label.as_ref().split(';') {
            for piece in element.split(HIERARCHY_SEPARATOR) {
                let cased = title_case(piece);
                if cased.is_empty() {
                    continue;
                }
                if seen.insert(cased.to_lowercase()) {
                    parts.push(cased);
                }
            }
        }
    }

    parts.join(TAG_SEPARATOR)
}

/// "jazzy hip-hop" -> "Jazzy Hip-Hop". Los números ("-0.2500") se dejan tal cual.
fn title_case(text: &str) -> String {
    WHITESPACE_RUN
        .split(text.trim())
        .filter_map(|word| {
            if word.bytes().any(|b| b.is_ascii_digit()) && word.parse::<f64>().is_ok() {
                return Some(word.to_string());
            }
            let word = word.trim_matches('-');
            if word.is_empty() {
                return None;
            }
            Some(word.split('-').map(capitalize).collect::<Vec<_>>().join("-"))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    // 'ß' -> "SS" rompería la idempotencia en la segunda pasada
    let upper: String = first.to_uppercase().collect();
    let mut out = if upper.chars().count() == 1 {
        upper
    } else {
        first.to_string()
    };
    out.extend(chars.flat_map(char::to_lowercase));
    out
}
