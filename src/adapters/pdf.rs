use crate::domain::ports::PdfWriter;
use crate::utils::error::{Result, TeiError};
use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;

/// A4 portrait, in points.
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

const IMAGE_NAME: &str = "Im0";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scales `width × height` pixels to fit the page, keeping the aspect ratio, centered.
pub fn fit_to_page(width: u32, height: u32) -> Placement {
    let scale = (PAGE_WIDTH / width as f32).min(PAGE_HEIGHT / height as f32);
    let (fitted_width, fitted_height) = (width as f32 * scale, height as f32 * scale);
    Placement {
        x: (PAGE_WIDTH - fitted_width) / 2.0,
        y: (PAGE_HEIGHT - fitted_height) / 2.0,
        width: fitted_width,
        height: fitted_height,
    }
}

struct JpegInfo {
    width: u32,
    height: u32,
    color_space: &'static str,
}

fn read_jpeg_info(jpeg: &[u8]) -> std::result::Result<JpegInfo, String> {
    let decoder = JpegDecoder::new(Cursor::new(jpeg)).map_err(|e| e.to_string())?;
    let (width, height) = decoder.dimensions();
    if width == 0 || height == 0 {
        return Err("image has no pixels".to_string());
    }

    let color_space = match decoder.original_color_type() {
        ExtendedColorType::L8 => "DeviceGray",
        ExtendedColorType::Cmyk8 => "DeviceCMYK",
        _ => "DeviceRGB",
    };
    Ok(JpegInfo {
        width,
        height,
        color_space,
    })
}

/// Embeds each JPEG as-is (`DCTDecode`) on its own A4 page.
#[derive(Debug, Clone, Default)]
pub struct JpegPdfWriter;

impl JpegPdfWriter {
    pub fn new() -> Self {
        Self
    }

    fn add_page(
        doc: &mut Document,
        pages_id: ObjectId,
        jpeg: &[u8],
    ) -> std::result::Result<ObjectId, String> {
        let info = read_jpeg_info(jpeg)?;

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(info.width),
                "Height" => i64::from(info.height),
                "ColorSpace" => info.color_space,
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            },
            jpeg.to_vec(),
        );
        let image_id = doc.add_object(image);

        let placement = fit_to_page(info.width, info.height);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        placement.width.into(),
                        0i64.into(),
                        0i64.into(),
                        placement.height.into(),
                        placement.x.into(),
                        placement.y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content.encode().map_err(|e| e.to_string())?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let media_box: Vec<Object> = vec![
            0i64.into(),
            0i64.into(),
            PAGE_WIDTH.into(),
            PAGE_HEIGHT.into(),
        ];
        Ok(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { IMAGE_NAME => image_id },
            },
        }))
    }
}

impl PdfWriter for JpegPdfWriter {
    fn write_pdf(&self, pages: &[Vec<u8>]) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(TeiError::PdfBuild {
                reason: "no page images".to_string(),
            });
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for (index, jpeg) in pages.iter().enumerate() {
            let page_id =
                Self::add_page(&mut doc, pages_id, jpeg).map_err(|reason| TeiError::PdfBuild {
                    reason: format!("page {}: {}", index + 1, reason),
                })?;
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages.len() as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(|e| TeiError::PdfBuild {
            reason: e.to_string(),
        })?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;

    fn jpeg(width: u32, height: u32, color: ExtendedColorType) -> Vec<u8> {
        let channels = match color {
            ExtendedColorType::L8 => 1,
            _ => 3,
        };
        let pixels = vec![128u8; (width * height * channels) as usize];
        let mut out = Vec::new();
        JpegEncoder::new(&mut out)
            .encode(&pixels, width, height, color)
            .unwrap();
        out
    }

    #[test]
    fn test_fit_to_page_centers_landscape_image() {
        let placement = fit_to_page(2000, 1000);
        assert!((placement.width - PAGE_WIDTH).abs() < 0.01);
        assert!((placement.height - PAGE_WIDTH / 2.0).abs() < 0.01);
        assert!(placement.x.abs() < 0.01);
        assert!((placement.y - (PAGE_HEIGHT - placement.height) / 2.0).abs() < 0.01);
    }

    #[test]
    fn test_fit_to_page_scales_small_images_up() {
        let placement = fit_to_page(100, 200);
        assert!((placement.height - PAGE_HEIGHT).abs() < 0.01);
        assert!((placement.width - PAGE_HEIGHT / 2.0).abs() < 0.01);
    }

    #[test]
    fn test_one_page_per_image() {
        let pages = vec![
            jpeg(40, 20, ExtendedColorType::Rgb8),
            jpeg(10, 30, ExtendedColorType::L8),
        ];

        let bytes = JpegPdfWriter::new().write_pdf(&pages).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_rejects_non_jpeg_page() {
        let pages = vec![jpeg(8, 8, ExtendedColorType::Rgb8), b"not a jpeg".to_vec()];

        let err = JpegPdfWriter::new().write_pdf(&pages).unwrap_err();
        assert!(matches!(err, TeiError::PdfBuild { ref reason } if reason.starts_with("page 2")));
        assert!(JpegPdfWriter::new().write_pdf(&[]).is_err());
    }
}
