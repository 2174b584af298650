use crate::domain::model::{DocumentDescriptor, MediaRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    /// Every file below `dir`, recursively, as sorted storage paths. A missing directory lists nothing.
    fn list_files(
        &self,
        dir: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn transcriptions_dir(&self) -> &str;
    fn csv_dir(&self) -> &str;
    fn tei_output_dir(&self) -> &str;
    fn image_output_dir(&self) -> &str;
    fn merge_input_dir(&self) -> &str;
    fn merge_output_dir(&self) -> &str;
    fn page_break_marker(&self) -> &str;
    fn display_language(&self) -> &str;
    fn strict_alignment(&self) -> bool;
    fn xml_id_field(&self) -> Option<&str>;
}

/// Fetches manifest JSON. Transport failures and non-JSON bodies surface as different errors.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value>;
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Resolves an external record id to the first related media record.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    async fn lookup(&self, record_id: &str) -> Result<MediaRecord>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub html: String,
    /// Non-fatal notes about content that could not be converted.
    pub messages: Vec<String>,
}

pub trait DocumentConverter: Send + Sync {
    fn convert_to_html(&self, document: &[u8]) -> Result<Conversion>;
}

/// Lays out page images (JPEG bytes, in page order) as one PDF, one image per page.
pub trait PdfWriter: Send + Sync {
    fn write_pdf(&self, pages: &[Vec<u8>]) -> Result<Vec<u8>>;
}

/// One unit of batch work; returns a one-line summary of what was produced.
#[async_trait]
pub trait DocumentJob: Send + Sync {
    async fn process(&self, descriptor: &DocumentDescriptor) -> Result<String>;
}
