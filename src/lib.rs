pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command, DocumentArgs, MergeArgs};

pub use adapters::{CoreDataLookup, DocxConverter, HttpClient, JpegPdfWriter, LocalStorage};
pub use config::AppConfig;
pub use core::batch::{BatchReport, BatchRunner};
pub use core::images::ImageExtractor;
pub use core::merge::PdfMerger;
pub use core::orchestrator::TeiPipeline;
pub use domain::model::{DocumentDescriptor, FacsimileModel};
pub use utils::error::{Result, TeiError};
