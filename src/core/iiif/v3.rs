use super::{
    as_list, derive_local_id, dimension, document_name, generate_ordinal_id, json_id, json_type,
    read_label, SURFACE_ID_PREFIX,
};
use crate::core::localized::resolve_joined;
use crate::domain::model::{FacsimileModel, LocalizedString, Surface, SurfaceSource};
use crate::utils::error::{Result, TeiError};
use serde_json::Value;

const IMAGE_SERVICE_TYPES: [&str; 2] = ["ImageService2", "ImageService3"];

pub(super) fn manifest_to_facsimile(
    manifest: &Value,
    first_ordinal: usize,
    display_lang: &str,
) -> Result<FacsimileModel> {
    if json_type(manifest) != Some("Manifest") {
        return Err(TeiError::manifest(
            "Only Manifests are supported for Presentation API v3",
        ));
    }

    let canvases = manifest
        .get("items")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| TeiError::manifest("Expected manifest to contain at least one canvas."))?;

    let manifest_label = read_label(manifest.get("label"), "manifest")
        .ok_or_else(|| TeiError::manifest("Expected manifest to have a label."))?;

    let manifest_id = json_id(manifest)
        .ok_or_else(|| TeiError::manifest("Expected manifest to have an ID."))?;

    let manifest_name = resolve_joined(&manifest_label, display_lang);

    let mut surfaces = Vec::with_capacity(canvases.len());
    for (offset, canvas) in canvases.iter().enumerate() {
        let id = generate_ordinal_id(SURFACE_ID_PREFIX, first_ordinal + offset);
        surfaces.push(canvas_to_surface(
            canvas,
            id,
            manifest_name.as_deref(),
            display_lang,
        )?);
    }

    Ok(FacsimileModel {
        id: derive_local_id(manifest_id),
        name: document_name(&manifest_label, display_lang),
        manifest_id: manifest_id.to_string(),
        surfaces,
        texts: Vec::new(),
    })
}

fn canvas_to_surface(
    canvas: &Value,
    id: String,
    manifest_name: Option<&str>,
    display_lang: &str,
) -> Result<Surface> {
    if json_type(canvas) != Some("Canvas") {
        return Err(TeiError::manifest("Expected a Canvas item."));
    }

    let canvas_uri = json_id(canvas).map(str::to_string);
    let owner = canvas_uri.as_deref().unwrap_or(id.as_str());

    let annotation_page = canvas
        .get("items")
        .and_then(Value::as_array)
        .and_then(|pages| pages.first())
        .ok_or_else(|| TeiError::manifest(format!("Missing items in canvas {}", owner)))?;

    if json_type(annotation_page) != Some("AnnotationPage") {
        return Err(TeiError::manifest("Expected an Annotation Page item."));
    }

    let body = first_painted_image(annotation_page)?.ok_or_else(|| {
        TeiError::manifest(format!(
            "Expected canvas {} to contain a painting annotation with an Image body.",
            owner
        ))
    })?;

    // Dimensions may sit on the image body or only on the canvas.
    let width = dimension(body.get("width")).or_else(|| dimension(canvas.get("width")));
    let height = dimension(body.get("height")).or_else(|| dimension(canvas.get("height")));
    let (width, height) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(TeiError::manifest(format!(
                "Expected canvas {} to declare a width and height.",
                owner
            )))
        }
    };

    let image_api_url = image_service_url(body).ok_or_else(|| {
        TeiError::manifest(format!(
            "Expected image body on canvas {} to have an ID or image service.",
            owner
        ))
    })?;

    let labels = distinguishing_label(canvas, &id, manifest_name, display_lang);

    Ok(Surface {
        id,
        source: SurfaceSource::Iiif {
            image_api_url: image_api_url.to_string(),
        },
        width,
        height,
        labels,
        zones: Vec::new(),
        texts: Vec::new(),
        canvas_uri,
        image_url: json_id(body).map(str::to_string),
    })
}

/// Body of the first `painting` annotation whose body is an `Image`.
/// Annotations after the first match are not inspected.
fn first_painted_image(annotation_page: &Value) -> Result<Option<&Value>> {
    let annotations = annotation_page
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for annotation in annotations {
        if json_type(annotation) != Some("Annotation") {
            return Err(TeiError::manifest("Expected an Annotation item."));
        }

        let painting = annotation.get("motivation").and_then(Value::as_str) == Some("painting");
        let body = annotation.get("body").filter(|b| json_type(b) == Some("Image"));
        if let (true, Some(body)) = (painting, body) {
            return Ok(Some(body));
        }
    }

    Ok(None)
}

/// First `ImageService2`/`ImageService3` id, else the body's own id.
pub(crate) fn image_service_url(body: &Value) -> Option<&str> {
    as_list(body.get("service"))
        .into_iter()
        .find(|service| {
            json_type(service).is_some_and(|kind| IMAGE_SERVICE_TYPES.contains(&kind))
        })
        .and_then(json_id)
        .or_else(|| json_id(body))
}

/// A canvas labelled with the whole document's title is labelled by its ordinal instead.
fn distinguishing_label(
    canvas: &Value,
    id: &str,
    manifest_name: Option<&str>,
    display_lang: &str,
) -> LocalizedString {
    let owner = format!("canvas {}", id);
    match read_label(canvas.get("label"), &owner) {
        Some(label) => match resolve_joined(&label, display_lang) {
            Some(resolved) if Some(resolved.as_str()) != manifest_name => label,
            _ => LocalizedString::unlocalized(id),
        },
        None => LocalizedString::unlocalized(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iiif::normalize;
    use serde_json::json;

    fn canvas(n: usize, label: Value, body: Value) -> Value {
        json!({
            "id": format!("https://example.org/canvas/{}", n),
            "type": "Canvas",
            "label": label,
            "width": 1000,
            "height": 1500,
            "items": [{
                "id": format!("https://example.org/page/{}", n),
                "type": "AnnotationPage",
                "items": [{
                    "id": format!("https://example.org/anno/{}", n),
                    "type": "Annotation",
                    "motivation": "painting",
                    "body": body,
                    "target": format!("https://example.org/canvas/{}", n)
                }]
            }]
        })
    }

    fn image_body(n: usize) -> Value {
        json!({
            "id": format!("https://images.example.org/{}/full/max/0/default.jpg", n),
            "type": "Image",
            "format": "image/jpeg",
            "service": [{"id": format!("https://images.example.org/{}", n), "type": "ImageService3"}]
        })
    }

    fn manifest(canvases: Vec<Value>) -> Value {
        json!({
            "@context": "http://iiif.io/api/presentation/3/context.json",
            "id": "https://example.org/iiif/letter-1/manifest",
            "type": "Manifest",
            "label": {"en": ["Letter to Jane"]},
            "items": canvases
        })
    }

    #[test]
    fn test_one_surface_per_canvas_in_order() {
        let canvases = (0..3)
            .map(|n| canvas(n, json!({"en": [format!("Page {}", n + 1)]}), image_body(n)))
            .collect();
        let model = normalize(&manifest(canvases)).unwrap();

        assert_eq!(model.id, "iiifletter-1manifest");
        assert_eq!(model.name, "Letter to Jane");
        assert_eq!(model.manifest_id, "https://example.org/iiif/letter-1/manifest");

        let ids: Vec<&str> = model.surfaces.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["f000", "f001", "f002"]);

        let first = &model.surfaces[0];
        assert_eq!((first.width, first.height), (1000, 1500));
        assert_eq!(
            first.source,
            SurfaceSource::Iiif {
                image_api_url: "https://images.example.org/0".to_string()
            }
        );
        assert_eq!(first.canvas_uri.as_deref(), Some("https://example.org/canvas/0"));
        assert_eq!(first.labels.get("en").unwrap(), &["Page 1".to_string()]);
    }

    #[test]
    fn test_canvas_repeating_manifest_label_is_replaced() {
        let canvases = vec![canvas(0, json!({"en": ["Letter to Jane"]}), image_body(0))];
        let model = normalize(&manifest(canvases)).unwrap();
        assert_eq!(model.surfaces[0].labels, LocalizedString::unlocalized("f000"));
    }

    #[test]
    fn test_missing_canvas_label_uses_ordinal() {
        let mut c = canvas(0, Value::Null, image_body(0));
        c.as_object_mut().unwrap().remove("label");
        let model = normalize(&manifest(vec![c])).unwrap();
        assert_eq!(model.surfaces[0].labels, LocalizedString::unlocalized("f000"));
    }

    #[test]
    fn test_body_dimensions_override_canvas() {
        let mut body = image_body(0);
        body["width"] = json!(2000);
        body["height"] = json!(3000);
        let model = normalize(&manifest(vec![canvas(0, json!("p1"), body)])).unwrap();
        assert_eq!((model.surfaces[0].width, model.surfaces[0].height), (2000, 3000));
    }

    #[test]
    fn test_image_service_url_resolution() {
        let body = json!({"id": "B", "type": "Image", "service": [{"type": "ImageService2", "id": "X"}]});
        assert_eq!(image_service_url(&body), Some("X"));

        let body = json!({"id": "B", "type": "Image"});
        assert_eq!(image_service_url(&body), Some("B"));

        let body = json!({"id": "B", "type": "Image", "service": [
            {"type": "AuthCookieService1", "id": "A"},
            {"@type": "ImageService3", "@id": "Y"}
        ]});
        assert_eq!(image_service_url(&body), Some("Y"));
    }

    #[test]
    fn test_first_painting_annotation_wins() {
        let mut c = canvas(0, json!("p1"), image_body(0));
        let extra = json!({
            "id": "https://example.org/anno/extra",
            "type": "Annotation",
            "motivation": "painting",
            "body": image_body(9)
        });
        c["items"][0]["items"].as_array_mut().unwrap().push(extra);

        let model = normalize(&manifest(vec![c])).unwrap();
        assert_eq!(model.surfaces.len(), 1);
        assert_eq!(
            model.surfaces[0].image_url.as_deref(),
            Some("https://images.example.org/0/full/max/0/default.jpg")
        );
    }

    #[test]
    fn test_wrong_discriminators_are_rejected() {
        let mut m = manifest(vec![canvas(0, json!("p1"), image_body(0))]);
        m["type"] = json!("Collection");
        assert!(normalize(&m).unwrap_err().to_string().contains("Only Manifests"));

        let mut m = manifest(vec![canvas(0, json!("p1"), image_body(0))]);
        m["items"][0]["type"] = json!("Range");
        assert!(normalize(&m).unwrap_err().to_string().contains("Canvas"));

        let mut m = manifest(vec![canvas(0, json!("p1"), image_body(0))]);
        m["items"][0]["items"][0]["type"] = json!("Collection");
        assert!(normalize(&m).unwrap_err().to_string().contains("Annotation Page"));

        let mut m = manifest(vec![canvas(0, json!("p1"), image_body(0))]);
        m["items"][0]["items"][0]["items"][0]["type"] = json!("Note");
        assert!(normalize(&m).unwrap_err().to_string().contains("Annotation item"));
    }

    #[test]
    fn test_missing_required_fields() {
        let mut m = manifest(vec![]);
        let err = normalize(&m).unwrap_err();
        assert!(err.to_string().contains("at least one canvas"));

        m = manifest(vec![canvas(0, json!("p1"), image_body(0))]);
        m.as_object_mut().unwrap().remove("label");
        assert!(normalize(&m).unwrap_err().to_string().contains("label"));

        m = manifest(vec![canvas(0, json!("p1"), image_body(0))]);
        m.as_object_mut().unwrap().remove("id");
        assert!(normalize(&m).unwrap_err().to_string().contains("ID"));
    }

    #[test]
    fn test_canvas_without_image_is_rejected() {
        let body = json!({"id": "https://example.org/audio.mp3", "type": "Sound"});
        let err = normalize(&manifest(vec![canvas(0, json!("p1"), body)])).unwrap_err();
        assert!(err.to_string().contains("painting annotation"));
    }

    #[test]
    fn test_offset_continues_numbering() {
        let canvases = (0..2).map(|n| canvas(n, json!("p"), image_body(n))).collect();
        let model = crate::core::iiif::normalize_with(&manifest(canvases), 998, "en").unwrap();
        let ids: Vec<&str> = model.surfaces.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["f998", "f999"]);
    }
}
