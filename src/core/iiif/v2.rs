use super::{
    as_list, derive_local_id, dimension, document_name, generate_ordinal_id, json_id, json_type,
    read_label, SURFACE_ID_PREFIX,
};
use crate::core::localized::{normalize_legacy_string, resolve_joined};
use crate::domain::model::{
    FacsimileModel, LocalizedString, Surface, SurfaceSource, TextFormat, TextRef,
};
use crate::utils::error::{Result, TeiError};
use serde_json::Value;

pub(super) fn manifest_to_facsimile(
    manifest: &Value,
    first_ordinal: usize,
    display_lang: &str,
) -> Result<FacsimileModel> {
    if json_type(manifest) != Some("sc:Manifest") {
        return Err(TeiError::manifest("Only Manifests are supported."));
    }

    let sequence = manifest
        .get("sequences")
        .and_then(Value::as_array)
        .and_then(|sequences| sequences.first())
        .ok_or_else(|| {
            TeiError::manifest("Expected manifest to contain at least one sequence.")
        })?;

    let manifest_label = read_label(manifest.get("label"), "manifest")
        .ok_or_else(|| TeiError::manifest("Expected manifest to have a label."))?;

    let manifest_id = json_id(manifest)
        .ok_or_else(|| TeiError::manifest("Expected manifest to have an ID."))?;

    let canvases = sequence
        .get("canvases")
        .and_then(Value::as_array)
        .filter(|canvases| !canvases.is_empty())
        .ok_or_else(|| {
            TeiError::manifest("Expected sequence to contain at least one canvas.")
        })?;

    let texts = gather_text_refs(sequence.get("rendering"), display_lang);

    let mut surfaces = Vec::with_capacity(canvases.len());
    for (offset, canvas) in canvases.iter().enumerate() {
        let id = generate_ordinal_id(SURFACE_ID_PREFIX, first_ordinal + offset);
        surfaces.push(canvas_to_surface(canvas, id, display_lang)?);
    }

    Ok(FacsimileModel {
        id: derive_local_id(manifest_id),
        name: document_name(&manifest_label, display_lang),
        manifest_id: manifest_id.to_string(),
        surfaces,
        texts,
    })
}

fn canvas_to_surface(canvas: &Value, id: String, display_lang: &str) -> Result<Surface> {
    if let Some(kind) = json_type(canvas) {
        if kind != "sc:Canvas" {
            return Err(TeiError::manifest(format!(
                "Expected a sc:Canvas item, found {}.",
                kind
            )));
        }
    }

    let canvas_uri = json_id(canvas).map(str::to_string);
    let owner = canvas_uri.clone().unwrap_or_else(|| id.clone());

    let image = canvas
        .get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .ok_or_else(|| TeiError::manifest("Expected canvas to contain at least one image."))?;

    // v2 manifests without an image service cannot be displayed as IIIF surfaces.
    let resource = image
        .get("resource")
        .filter(|resource| resource.get("service").is_some())
        .ok_or_else(|| {
            TeiError::manifest("Expected image resource to contain a service object.")
        })?;

    let image_api_url = as_list(resource.get("service"))
        .into_iter()
        .find_map(json_id)
        .or_else(|| json_id(resource))
        .ok_or_else(|| {
            TeiError::manifest(format!("Expected image service on canvas {} to have an ID.", owner))
        })?;

    let (width, height) = match (dimension(canvas.get("width")), dimension(canvas.get("height"))) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(TeiError::manifest(format!(
                "Expected canvas {} to declare a width and height.",
                owner
            )))
        }
    };

    let labels = read_label(canvas.get("label"), &format!("canvas {}", owner))
        .unwrap_or_else(LocalizedString::new);

    Ok(Surface {
        id,
        source: SurfaceSource::Iiif {
            image_api_url: image_api_url.to_string(),
        },
        width,
        height,
        labels,
        zones: Vec::new(),
        texts: gather_text_refs(canvas.get("seeAlso"), display_lang),
        canvas_uri,
        image_url: json_id(resource).map(str::to_string),
    })
}

/// Keeps plain-text and TEI renderings; other formats are dropped.
fn gather_text_refs(renderings: Option<&Value>, display_lang: &str) -> Vec<TextRef> {
    as_list(renderings)
        .into_iter()
        .filter_map(|rendering| {
            let url = json_id(rendering)?;
            let name = normalize_legacy_string(rendering.get("label")?)
                .and_then(|label| resolve_joined(&label, display_lang))?;
            let format = rendering
                .get("format")
                .and_then(Value::as_str)
                .and_then(TextFormat::from_mime)?;
            Some(TextRef {
                url: url.to_string(),
                name,
                format,
            })
        })
        .collect()
}
