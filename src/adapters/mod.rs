pub mod docx;
pub mod http;
pub mod pdf;
pub mod record_lookup;
pub mod storage;

pub use docx::DocxConverter;
pub use http::HttpClient;
pub use pdf::JpegPdfWriter;
pub use record_lookup::CoreDataLookup;
pub use storage::LocalStorage;
