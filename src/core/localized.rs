//! Language selection for IIIF localized values.

use crate::domain::model::{LocalizedString, NO_LANGUAGE};
use crate::utils::error::{Result, TeiError};
use serde_json::Value;

const FALLBACK_LANGUAGE: &str = "en";

/// Picks the list of strings a client should display for `preferred_lang`.
///
/// Unlocalized values always win when they are the only entry. Otherwise the
/// preferred language is used if present; when every entry is localized and
/// none matches, English or else the first declared language is chosen; when
/// some entries are unlocalized, those are shown instead.
pub fn resolve<'a>(values: &'a LocalizedString, preferred_lang: &str) -> Result<&'a [String]> {
    if values.is_empty() {
        return Err(TeiError::MalformedLocalizedValue {
            reason: "value map has no language keys".to_string(),
        });
    }

    let only_unlocalized = values.len() == 1 && values.contains_key(NO_LANGUAGE);
    if only_unlocalized {
        return Ok(values.get(NO_LANGUAGE).unwrap_or_default());
    }

    if let Some(preferred) = values.get(preferred_lang) {
        return Ok(preferred);
    }

    if !values.contains_key(NO_LANGUAGE) {
        if let Some(english) = values.get(FALLBACK_LANGUAGE) {
            return Ok(english);
        }
        let first = values.iter().next().map(|(_, list)| list).unwrap_or_default();
        return Ok(first);
    }

    Ok(values.get(NO_LANGUAGE).unwrap_or_default())
}

/// Resolves and joins with single spaces; `None` when nothing can be displayed.
pub fn resolve_joined(values: &LocalizedString, preferred_lang: &str) -> Option<String> {
    resolve(values, preferred_lang).ok().map(|list| list.join(" "))
}

/// Lifts any IIIF label shape into a [`LocalizedString`].
///
/// Plain strings (Presentation 2) become `{none: [value]}`; language maps
/// pass through; v2 arrays of strings or `{"@value", "@language"}` objects
/// are grouped by language. Returns `None` for shapes that carry no text.
pub fn normalize_legacy_string(value: &Value) -> Option<LocalizedString> {
    match value {
        Value::String(s) => Some(LocalizedString::unlocalized(s.as_str())),
        Value::Object(map) if map.contains_key("@value") => {
            let mut out = LocalizedString::new();
            push_language_value(&mut out, value);
            Some(out)
        }
        Value::Object(map) => {
            let mut out = LocalizedString::new();
            for (lang, entry) in map {
                match entry {
                    Value::Array(items) => {
                        for item in items.iter().filter_map(Value::as_str) {
                            out.push(lang, item);
                        }
                    }
                    Value::String(s) => out.push(lang, s.as_str()),
                    _ => {}
                }
            }
            Some(out)
        }
        Value::Array(items) => {
            let mut out = LocalizedString::new();
            for item in items {
                match item {
                    Value::String(s) => out.push(NO_LANGUAGE, s.as_str()),
                    Value::Object(_) => push_language_value(&mut out, item),
                    _ => {}
                }
            }
            Some(out)
        }
        _ => None,
    }
}

fn push_language_value(out: &mut LocalizedString, item: &Value) {
    if let Some(text) = item.get("@value").and_then(Value::as_str) {
        let lang = item
            .get("@language")
            .and_then(Value::as_str)
            .unwrap_or(NO_LANGUAGE);
        out.push(lang, text);
    }
}
