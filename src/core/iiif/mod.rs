mod v2;
mod v3;

use crate::core::localized::{normalize_legacy_string, resolve_joined};
use crate::domain::model::{FacsimileModel, LocalizedString};
use crate::utils::error::{Result, TeiError};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

pub const PRESENTATION_2_CONTEXT: &str = "http://iiif.io/api/presentation/2/context.json";
pub const PRESENTATION_3_CONTEXT: &str = "http://iiif.io/api/presentation/3/context.json";

pub const SURFACE_ID_PREFIX: &str = "f";

static DISALLOWED_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s#&?:/]").expect("valid id pattern"));

#[derive(Debug, Clone, Copy)]
pub enum PresentationManifest<'a> {
    V2(&'a Value),
    V3(&'a Value),
}

impl<'a> PresentationManifest<'a> {
    pub fn detect(manifest: &'a Value) -> Result<Self> {
        let context = manifest
            .get("@context")
            .filter(|c| !c.is_null())
            .ok_or_else(|| TeiError::manifest("Missing @context property."))?;

        if context_mentions(context, PRESENTATION_2_CONTEXT) {
            Ok(PresentationManifest::V2(manifest))
        } else if context_mentions(context, PRESENTATION_3_CONTEXT) {
            Ok(PresentationManifest::V3(manifest))
        } else {
            Err(TeiError::manifest(format!(
                "Unrecognized presentation context: {}",
                context
            )))
        }
    }

    pub fn version(&self) -> u8 {
        match self {
            PresentationManifest::V2(_) => 2,
            PresentationManifest::V3(_) => 3,
        }
    }

    pub fn to_facsimile(&self, first_ordinal: usize, display_lang: &str) -> Result<FacsimileModel> {
        match self {
            PresentationManifest::V2(manifest) => {
                v2::manifest_to_facsimile(manifest, first_ordinal, display_lang)
            }
            PresentationManifest::V3(manifest) => {
                v3::manifest_to_facsimile(manifest, first_ordinal, display_lang)
            }
        }
    }
}

/// Normalizes a manifest with ordinals starting at `f000` and English labels.
pub fn normalize(manifest: &Value) -> Result<FacsimileModel> {
    normalize_with(manifest, 0, "en")
}

/// Normalizes a manifest, numbering surfaces from `first_ordinal`.
pub fn normalize_with(
    manifest: &Value,
    first_ordinal: usize,
    display_lang: &str,
) -> Result<FacsimileModel> {
    let variant = PresentationManifest::detect(manifest)?;
    tracing::debug!("Detected IIIF Presentation {} manifest", variant.version());
    variant.to_facsimile(first_ordinal, display_lang)
}

/// `f` + ordinal zero-padded to at least three digits.
pub fn generate_ordinal_id(prefix: &str, ordinal: usize) -> String {
    format!("{}{:03}", prefix, ordinal)
}

/// Strips characters that are not allowed in an `xml:id` and guards a leading digit.
pub fn sanitize_id(value: &str) -> Option<String> {
    let mut clean = DISALLOWED_ID_CHARS.replace_all(value, "").into_owned();
    if clean.starts_with(|c: char| c.is_ascii_digit()) {
        clean.insert(0, '_');
    }
    (!clean.is_empty()).then_some(clean)
}

/// Local id from the manifest URL path, or a timestamp id when the path yields nothing.
pub fn derive_local_id(manifest_id: &str) -> String {
    Url::parse(manifest_id)
        .ok()
        .and_then(|url| sanitize_id(url.path()))
        .unwrap_or_else(|| format!("import_{}", chrono::Utc::now().timestamp_millis()))
}

fn context_mentions(context: &Value, uri: &str) -> bool {
    match context {
        Value::String(s) => s.contains(uri),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.contains(uri)),
        _ => false,
    }
}

/// JSON-LD keywords appear as `@id`/`@type` in v2 and `id`/`type` in v3.
pub(crate) fn json_keyword<'v>(node: &'v Value, key: &str) -> Option<&'v str> {
    node.get(format!("@{}", key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| node.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()))
}

pub(crate) fn json_id(node: &Value) -> Option<&str> {
    json_keyword(node, "id")
}

pub(crate) fn json_type(node: &Value) -> Option<&str> {
    json_keyword(node, "type")
}

/// Treats a single object as a one-element list.
pub(crate) fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}

pub(crate) fn dimension(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

/// Reads a label, warning when unlocalized and localized entries are mixed.
pub(crate) fn read_label(value: Option<&Value>, owner: &str) -> Option<LocalizedString> {
    let label = normalize_legacy_string(value?)?;
    if label.is_mixed() {
        tracing::warn!(
            "Label of {} mixes 'none' with language keys; showing unlocalized values when no language matches",
            owner
        );
    }
    Some(label)
}

pub(crate) fn document_name(label: &LocalizedString, display_lang: &str) -> String {
    resolve_joined(label, display_lang).unwrap_or_default()
}
