use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Language tag used by IIIF for values that carry no language.
pub const NO_LANGUAGE: &str = "none";

/// Language-keyed string lists, in the order the producer declared them.
/// Serializes as a IIIF language map such as `{"none": ["f000"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedString {
    entries: Vec<(String, Vec<String>)>,
}

impl LocalizedString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unlocalized(value: impl Into<String>) -> Self {
        let mut s = Self::new();
        s.push(NO_LANGUAGE, value);
        s
    }

    /// Appends `value` under `lang`, keeping first-seen key order.
    pub fn push(&mut self, lang: &str, value: impl Into<String>) {
        match self.entries.iter_mut().find(|(key, _)| key == lang) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((lang.to_string(), vec![value.into()])),
        }
    }

    pub fn get(&self, lang: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(key, _)| key == lang)
            .map(|(_, values)| values.as_slice())
    }

    pub fn contains_key(&self, lang: &str) -> bool {
        self.get(lang).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `none` sits alongside language keys.
    pub fn is_mixed(&self) -> bool {
        self.contains_key(NO_LANGUAGE) && self.entries.len() > 1
    }
}

impl Serialize for LocalizedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (lang, values) in &self.entries {
            map.serialize_entry(lang, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LocalizedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LanguageMapVisitor;

        impl<'de> Visitor<'de> for LanguageMapVisitor {
            type Value = LocalizedString;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a language map of string lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut s = LocalizedString::new();
                while let Some((lang, values)) = access.next_entry::<String, Vec<String>>()? {
                    for value in values {
                        s.push(&lang, value);
                    }
                }
                Ok(s)
            }
        }

        deserializer.deserialize_map(LanguageMapVisitor)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Vec<V>)> for LocalizedString {
    fn from_iter<I: IntoIterator<Item = (K, Vec<V>)>>(iter: I) -> Self {
        let mut s = Self::new();
        for (key, values) in iter {
            let key = key.into();
            for value in values {
                s.push(&key, value);
            }
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ZoneShape {
    Rectangle { ulx: u64, uly: u64, lrx: u64, lry: u64 },
    Polygon { points: Vec<(u64, u64)> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub shape: ZoneShape,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    Text,
    Tei,
}

impl TextFormat {
    pub fn from_mime(format: &str) -> Option<Self> {
        match format {
            "text/plain" => Some(TextFormat::Text),
            "application/tei+xml" => Some(TextFormat::Tei),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRef {
    pub url: String,
    pub name: String,
    pub format: TextFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceSource {
    /// Backed by a IIIF image service.
    Iiif { image_api_url: String },
    /// A local image file, named after the surface id.
    RawFile {
        resource_entry_id: String,
        mime_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub id: String,
    pub source: SurfaceSource,
    pub width: u64,
    pub height: u64,
    pub labels: LocalizedString,
    pub zones: Vec<Zone>,
    pub texts: Vec<TextRef>,
    pub canvas_uri: Option<String>,
    /// The painting resource itself, when the manifest names one.
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacsimileModel {
    pub id: String,
    pub name: String,
    pub manifest_id: String,
    pub surfaces: Vec<Surface>,
    pub texts: Vec<TextRef>,
}

/// One logical document to convert, as given on the command line or by a CSV row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub manifests: Vec<String>,
    pub title: Option<String>,
    /// Overrides every other title source when the manifest comes from a record lookup.
    pub name: Option<String>,
    pub transcription: Option<String>,
    pub output_id: Option<String>,
    /// External record id echoed into the file-level `sameAs`.
    pub record_id: Option<String>,
    /// Key used to look up the manifest through the record API.
    pub lookup_id: Option<String>,
}

impl DocumentDescriptor {
    /// Maps a batch row (header name to cell) onto a descriptor. Blank cells count as absent.
    pub fn from_row(row: &HashMap<String, String>, xml_id_field: Option<&str>) -> Self {
        let cell = |key: &str| {
            row.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            manifests: cell("manifest").into_iter().collect(),
            title: cell("title"),
            name: cell("name"),
            transcription: cell("transcription"),
            output_id: cell("xmlid").or_else(|| xml_id_field.and_then(cell)),
            record_id: cell("fairdataID"),
            lookup_id: cell("uuid").or_else(|| cell("mediaFairdataID")),
        }
    }

    /// Short name for diagnostics.
    pub fn label(&self) -> String {
        self.output_id
            .clone()
            .or_else(|| self.lookup_id.clone())
            .or_else(|| self.record_id.clone())
            .or_else(|| self.manifests.first().cloned())
            .unwrap_or_else(|| "<unnamed document>".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub manifest_url: String,
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localized_string_keeps_declaration_order() {
        let mut s = LocalizedString::new();
        s.push("fr", "B");
        s.push("en", "A");
        s.push("fr", "C");

        let keys: Vec<&str> = s.keys().collect();
        assert_eq!(keys, vec!["fr", "en"]);
        assert_eq!(s.get("fr").unwrap(), &["B".to_string(), "C".to_string()]);
        assert!(!s.is_mixed());

        s.push(NO_LANGUAGE, "X");
        assert!(s.is_mixed());
    }

    #[test]
    fn test_localized_string_is_a_language_map() {
        assert_eq!(
            serde_json::to_value(LocalizedString::unlocalized("f000")).unwrap(),
            serde_json::json!({"none": ["f000"]})
        );

        let parsed: LocalizedString =
            serde_json::from_str(r#"{"fr": ["Lettre"], "en": ["Letter", "Note"]}"#).unwrap();
        let keys: Vec<&str> = parsed.keys().collect();
        assert_eq!(keys, vec!["fr", "en"]);
        assert_eq!(parsed.get("en").unwrap().len(), 2);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"{"fr":["Lettre"],"en":["Letter","Note"]}"#);
    }

    #[test]
    fn test_descriptor_from_row() {
        let row: HashMap<String, String> = [
            ("xmlid", ""),
            ("doc_id", "doc-7"),
            ("uuid", "abc-123"),
            ("title", "  Letter  "),
            ("manifest", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let descriptor = DocumentDescriptor::from_row(&row, Some("doc_id"));

        assert_eq!(descriptor.output_id.as_deref(), Some("doc-7"));
        assert_eq!(descriptor.lookup_id.as_deref(), Some("abc-123"));
        assert_eq!(descriptor.title.as_deref(), Some("Letter"));
        assert!(descriptor.manifests.is_empty());
        assert_eq!(descriptor.label(), "doc-7");
    }
}
