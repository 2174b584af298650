//! Renders a [`FacsimileModel`] as a TEI document with a `<facsimile>` section.

use crate::core::tei::{self, Element, Node, TEI_NAMESPACE};
use crate::domain::model::{
    FacsimileModel, LocalizedString, Surface, SurfaceSource, Zone, ZoneShape, NO_LANGUAGE,
};
use crate::utils::error::{Result, TeiError};

/// Comment placed in the header when no title is known.
pub const TITLE_PLACEHOLDER: &str = " Your Title Here ";

const IIIF_GRAPHIC_MIME_TYPE: &str = "application/json";

pub fn extension_for_mime_type(mime_type: &str) -> Result<&'static str> {
    match mime_type {
        "image/png" => Ok("png"),
        "image/jpeg" => Ok("jpg"),
        "image/gif" => Ok("gif"),
        other => Err(TeiError::UnknownMimeType {
            mime_type: other.to_string(),
        }),
    }
}

/// Builds the full TEI tree: header plus one `<surface>` per model surface, in order.
pub fn build_document(
    model: &FacsimileModel,
    title: Option<&str>,
    file_same_as: Option<&str>,
) -> Result<Element> {
    let surfaces = model
        .surfaces
        .iter()
        .map(surface_element)
        .collect::<Result<Vec<_>>>()?;

    let mut facsimile = Element::new("facsimile");
    if !model.manifest_id.is_empty() {
        facsimile = facsimile.with_attr("sameAs", model.manifest_id.as_str());
    }

    Ok(Element::new("TEI")
        .with_attr("xmlns", TEI_NAMESPACE)
        .with_child(tei_header(title, file_same_as))
        .with_child(facsimile.with_children(surfaces)))
}

pub fn serialize(
    model: &FacsimileModel,
    title: Option<&str>,
    file_same_as: Option<&str>,
) -> Result<String> {
    Ok(tei::to_xml_string(&build_document(model, title, file_same_as)?))
}

fn tei_header(title: Option<&str>, file_same_as: Option<&str>) -> Element {
    let title_el = match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Element::new("title").with_text(t),
        None => Element::new("title").with_child(Node::Comment(TITLE_PLACEHOLDER.to_string())),
    };

    let mut file_desc = Element::new("fileDesc");
    if let Some(same_as) = file_same_as {
        file_desc = file_desc.with_attr("sameAs", same_as);
    }

    Element::new("teiHeader").with_child(
        file_desc
            .with_child(Element::new("titleStmt").with_child(title_el))
            .with_child(Element::new("publicationStmt").with_child(Element::new("p")))
            .with_child(Element::new("sourceDesc").with_child(Element::new("p"))),
    )
}

fn surface_element(surface: &Surface) -> Result<Element> {
    let mut el = Element::new("surface")
        .with_attr("xml:id", surface.id.as_str())
        .with_attr("ulx", "0")
        .with_attr("uly", "0")
        .with_attr("lrx", surface.width.to_string())
        .with_attr("lry", surface.height.to_string());

    if let Some(canvas_uri) = &surface.canvas_uri {
        el = el.with_attr("sameAs", canvas_uri.as_str());
    }

    let graphic = match &surface.source {
        SurfaceSource::Iiif { image_api_url } => Element::new("graphic")
            .with_attr("mimeType", IIIF_GRAPHIC_MIME_TYPE)
            .with_attr("url", image_api_url.as_str()),
        SurfaceSource::RawFile {
            resource_entry_id,
            mime_type,
        } => {
            let ext = extension_for_mime_type(mime_type)?;
            Element::new("graphic")
                .with_attr("sameAs", resource_entry_id.as_str())
                .with_attr("mimeType", mime_type.as_str())
                .with_attr("url", format!("{}.{}", surface.id, ext))
        }
    };

    Ok(el
        .with_children(label_elements(&surface.labels))
        .with_child(graphic)
        .with_children(surface.zones.iter().map(zone_element)))
}

/// One `<label>` per value; `none` values carry no `xml:lang`.
fn label_elements(labels: &LocalizedString) -> Vec<Element> {
    labels
        .iter()
        .flat_map(|(lang, values)| {
            values.iter().map(move |value| {
                let label = Element::new("label");
                let label = if lang == NO_LANGUAGE {
                    label
                } else {
                    label.with_attr("xml:lang", lang)
                };
                label.with_text(value.as_str())
            })
        })
        .collect()
}

fn zone_element(zone: &Zone) -> Element {
    let el = Element::new("zone").with_attr("xml:id", zone.id.as_str());
    let el = match &zone.shape {
        ZoneShape::Rectangle { ulx, uly, lrx, lry } => el
            .with_attr("ulx", ulx.to_string())
            .with_attr("uly", uly.to_string())
            .with_attr("lrx", lrx.to_string())
            .with_attr("lry", lry.to_string()),
        ZoneShape::Polygon { points } => {
            let points = points
                .iter()
                .map(|(x, y)| format!("{},{}", x, y))
                .collect::<Vec<_>>()
                .join(" ");
            el.with_attr("points", points)
        }
    };

    match zone.note.as_deref().filter(|n| !n.is_empty()) {
        Some(note) => el.with_child(Element::new("note").with_text(note)),
        None => el,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tei::parse_document;

    fn iiif_surface(n: usize) -> Surface {
        Surface {
            id: format!("f{:03}", n),
            source: SurfaceSource::Iiif {
                image_api_url: format!("https://images.example.org/{}", n),
            },
            width: 1000 + n as u64,
            height: 1500,
            labels: LocalizedString::unlocalized(format!("p. {}", n + 1)),
            zones: Vec::new(),
            texts: Vec::new(),
            canvas_uri: Some(format!("https://example.org/canvas/{}", n)),
            image_url: None,
        }
    }

    fn model(surfaces: Vec<Surface>) -> FacsimileModel {
        FacsimileModel {
            id: "iiifletter".to_string(),
            name: "Letter".to_string(),
            manifest_id: "https://example.org/iiif/letter/manifest".to_string(),
            surfaces,
            texts: Vec::new(),
        }
    }

    #[test]
    fn test_round_trip_recovers_surfaces() {
        let xml = serialize(&model((0..3).map(iiif_surface).collect()), Some("Letter"), None).unwrap();
        let doc = parse_document(&xml).unwrap();

        assert_eq!(doc.attr("xmlns"), Some(TEI_NAMESPACE));
        let facsimile = doc.find("facsimile").unwrap();
        assert_eq!(facsimile.attr("sameAs"), Some("https://example.org/iiif/letter/manifest"));

        let surfaces: Vec<&Element> = facsimile.child_elements().collect();
        assert_eq!(surfaces.len(), 3);
        for (n, surface) in surfaces.iter().enumerate() {
            assert_eq!(surface.attr("xml:id"), Some(format!("f{:03}", n).as_str()));
            assert_eq!(surface.attr("ulx"), Some("0"));
            assert_eq!(surface.attr("uly"), Some("0"));
            assert_eq!(surface.attr("lrx"), Some((1000 + n).to_string().as_str()));
            assert_eq!(surface.attr("lry"), Some("1500"));
        }
    }

    #[test]
    fn test_surface_children_order() {
        let mut surface = iiif_surface(0);
        surface.labels = [("en", vec!["Page one"]), ("none", vec!["1r"])].into_iter().collect();
        surface.zones.push(Zone {
            id: "z1".to_string(),
            shape: ZoneShape::Rectangle { ulx: 1, uly: 2, lrx: 3, lry: 4 },
            note: Some("margin".to_string()),
        });

        let el = surface_element(&surface).unwrap();
        assert_eq!(
            tei::fragment_to_string(&el),
            "<surface xml:id=\"f000\" ulx=\"0\" uly=\"0\" lrx=\"1000\" lry=\"1500\" sameAs=\"https://example.org/canvas/0\">\n  \
             <label xml:lang=\"en\">Page one</label>\n  \
             <label>1r</label>\n  \
             <graphic mimeType=\"application/json\" url=\"https://images.example.org/0\"/>\n  \
             <zone xml:id=\"z1\" ulx=\"1\" uly=\"2\" lrx=\"3\" lry=\"4\"><note>margin</note></zone>\n\
             </surface>"
        );
    }

    #[test]
    fn test_raw_file_surface_uses_constructed_filename() {
        let mut surface = iiif_surface(4);
        surface.canvas_uri = None;
        surface.source = SurfaceSource::RawFile {
            resource_entry_id: "entry-9".to_string(),
            mime_type: "image/jpeg".to_string(),
        };
        let el = surface_element(&surface).unwrap();
        let graphic = el.find("graphic").unwrap();
        assert_eq!(graphic.attr("url"), Some("f004.jpg"));
        assert_eq!(graphic.attr("sameAs"), Some("entry-9"));
        assert_eq!(el.attr("sameAs"), None);
    }

    #[test]
    fn test_unknown_mime_type_fails() {
        let mut surface = iiif_surface(0);
        surface.source = SurfaceSource::RawFile {
            resource_entry_id: "x".to_string(),
            mime_type: "image/tiff".to_string(),
        };
        let err = serialize(&model(vec![surface]), None, None).unwrap_err();
        assert!(matches!(err, TeiError::UnknownMimeType { ref mime_type } if mime_type == "image/tiff"));
    }

    #[test]
    fn test_polygon_zone() {
        let zone = Zone {
            id: "z2".to_string(),
            shape: ZoneShape::Polygon { points: vec![(0, 0), (10, 0), (10, 5)] },
            note: None,
        };
        assert_eq!(
            tei::fragment_to_string(&zone_element(&zone)),
            "<zone xml:id=\"z2\" points=\"0,0 10,0 10,5\"/>"
        );
    }

    #[test]
    fn test_header_title_and_same_as() {
        let xml = serialize(&model(vec![iiif_surface(0)]), Some("Smith & Sons"), Some("#_abc")).unwrap();
        assert!(xml.contains("<title>Smith &amp; Sons</title>"));
        assert!(xml.contains("<fileDesc sameAs=\"#_abc\">"));

        let xml = serialize(&model(vec![iiif_surface(0)]), None, None).unwrap();
        assert!(xml.contains("<title><!-- Your Title Here --></title>"));
        assert!(xml.contains("<fileDesc>"));
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let m = model((0..5).map(iiif_surface).collect());
        assert_eq!(serialize(&m, Some("T"), None).unwrap(), serialize(&m, Some("T"), None).unwrap());
    }
}
