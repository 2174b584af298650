use anyhow::Result;
use facs2tei::{JpegPdfWriter, LocalStorage, PdfMerger};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use lopdf::Document;
use tempfile::TempDir;

fn write_jpeg(path: &std::path::Path, width: u32, height: u32) -> Result<()> {
    let pixels = vec![200u8; (width * height * 3) as usize];
    let mut bytes = Vec::new();
    JpegEncoder::new(&mut bytes).encode(&pixels, width, height, ExtendedColorType::Rgb8)?;

    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[tokio::test]
async fn test_image_folders_become_pdfs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("merging_input");
    write_jpeg(&input.join("Letter to a friend/f001.jpg"), 60, 90)?;
    write_jpeg(&input.join("Letter to a friend/f002.jpg"), 90, 60)?;
    write_jpeg(&input.join("Letter to a friend/f010.jpg"), 30, 30)?;
    write_jpeg(&input.join("Album/f001.jpg"), 40, 40)?;
    std::fs::write(input.join("Album/readme.txt"), "not a page")?;

    let merger = PdfMerger::new(LocalStorage::new(temp_dir.path()), JpegPdfWriter::new());
    let report = merger.merge("merging_input", "merging_output").await?;

    assert_eq!(report.items.len(), 2);
    assert_eq!(report.succeeded(), 2);

    let letter = Document::load(temp_dir.path().join("merging_output/Letter to a friend.pdf"))?;
    assert_eq!(letter.get_pages().len(), 3);
    let album = Document::load(temp_dir.path().join("merging_output/Album.pdf"))?;
    assert_eq!(album.get_pages().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_image_fails_only_its_folder() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("merging_input");
    write_jpeg(&input.join("Good/f001.jpg"), 20, 20)?;
    std::fs::create_dir_all(input.join("Bad"))?;
    std::fs::write(input.join("Bad/f001.jpg"), b"truncated")?;

    let merger = PdfMerger::new(LocalStorage::new(temp_dir.path()), JpegPdfWriter::new());
    let report = merger.merge("merging_input", "merging_output").await?;

    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].document, "Bad");
    assert!(temp_dir.path().join("merging_output/Good.pdf").exists());
    assert!(!temp_dir.path().join("merging_output/Bad.pdf").exists());
    Ok(())
}
