use crate::domain::model::MediaRecord;
use crate::domain::ports::{
    Conversion, DocumentConverter, ImageFetcher, ManifestSource, RecordLookup, Storage,
};
use crate::utils::error::{Result, TeiError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub async fn insert(&self, path: &str, content: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .await
            .insert(path.to_string(), content.into());
    }

    pub async fn read_string(&self, path: &str) -> String {
        let files = self.files.lock().await;
        String::from_utf8(files.get(path).cloned().unwrap_or_default()).unwrap()
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub async fn is_empty(&self) -> bool {
        self.files.lock().await.is_empty()
    }
}

impl Storage for MemoryStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files.lock().await.get(path).cloned().ok_or_else(|| {
            TeiError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.insert(path, data.to_vec()).await;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.files.lock().await.contains_key(path)
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(self
            .paths()
            .await
            .into_iter()
            .filter(|path| path.starts_with(&prefix))
            .collect())
    }
}

/// Serves fixed JSON per URL; unknown URLs answer 404.
#[derive(Debug, Clone, Default)]
pub struct StaticManifests {
    manifests: HashMap<String, Value>,
}

impl StaticManifests {
    pub fn with(mut self, url: &str, manifest: Value) -> Self {
        self.manifests.insert(url.to_string(), manifest);
        self
    }
}

#[async_trait]
impl ManifestSource for StaticManifests {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.manifests
            .get(url)
            .cloned()
            .ok_or_else(|| TeiError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticRecords {
    records: HashMap<String, MediaRecord>,
}

impl StaticRecords {
    pub fn with(mut self, record_id: &str, record: MediaRecord) -> Self {
        self.records.insert(record_id.to_string(), record);
        self
    }
}

#[async_trait]
impl RecordLookup for StaticRecords {
    async fn lookup(&self, record_id: &str) -> Result<MediaRecord> {
        self.records
            .get(record_id)
            .cloned()
            .ok_or_else(|| TeiError::RecordNotFound {
                record_id: record_id.to_string(),
            })
    }
}

/// Treats the stored transcription bytes as the converted HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlConverter;

impl DocumentConverter for HtmlConverter {
    fn convert_to_html(&self, document: &[u8]) -> Result<Conversion> {
        Ok(Conversion {
            html: String::from_utf8_lossy(document).into_owned(),
            messages: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticImages {
    images: HashMap<String, Vec<u8>>,
}

impl StaticImages {
    pub fn with(mut self, url: &str, bytes: &[u8]) -> Self {
        self.images.insert(url.to_string(), bytes.to_vec());
        self
    }
}

#[async_trait]
impl ImageFetcher for StaticImages {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| TeiError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// A Presentation 3 manifest with `canvases` painted canvases.
pub fn v3_manifest(id: &str, label: &str, canvases: usize) -> Value {
    let items: Vec<Value> = (0..canvases)
        .map(|n| {
            json!({
                "id": format!("{}/canvas/{}", id, n),
                "type": "Canvas",
                "label": {"none": [format!("p. {}", n + 1)]},
                "height": 1200,
                "width": 800,
                "items": [{
                    "id": format!("{}/page/{}", id, n),
                    "type": "AnnotationPage",
                    "items": [{
                        "id": format!("{}/annotation/{}", id, n),
                        "type": "Annotation",
                        "motivation": "painting",
                        "target": format!("{}/canvas/{}", id, n),
                        "body": {
                            "id": format!("https://images.example.org/{}/full/max/0/default.jpg", n),
                            "type": "Image",
                            "format": "image/jpeg",
                            "height": 1200,
                            "width": 800,
                            "service": [{
                                "id": format!("https://images.example.org/{}", n),
                                "type": "ImageService3",
                                "profile": "level1"
                            }]
                        }
                    }]
                }]
            })
        })
        .collect();

    json!({
        "@context": "http://iiif.io/api/presentation/3/context.json",
        "id": id,
        "type": "Manifest",
        "label": {"en": [label]},
        "items": items
    })
}
