pub mod batch;
pub mod facsimile;
pub mod iiif;
pub mod images;
pub mod localized;
pub mod merge;
pub mod orchestrator;
pub mod tei;
pub mod transcription;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::ports::{ConfigProvider, DocumentJob, Storage};
pub use crate::utils::error::Result;
