use crate::domain::model::DocumentDescriptor;
use crate::utils::error::{Result, TeiError};
use crate::utils::validation::{validate_path, validate_url, Validate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "facs2tei.toml";

#[derive(Debug, Parser)]
#[command(name = "facs2tei")]
#[command(about = "Convert IIIF manifests and transcriptions into TEI-XML")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Directory that the configured paths are relative to
    #[arg(long, global = true, default_value = ".")]
    pub workdir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build TEI documents from manifests and transcriptions
    Tei(DocumentArgs),
    /// Download the page images of a document
    Images(DocumentArgs),
    /// Print the normalized facsimile model as JSON
    Inspect(DocumentArgs),
    /// Turn each folder of page images into one PDF
    Merge(MergeArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct MergeArgs {
    /// Directory holding one folder of `fNNN.jpg` images per document
    #[arg(short, long)]
    pub input: Option<String>,

    /// Directory the PDFs are written to
    #[arg(short, long)]
    pub output: Option<String>,
}

impl Validate for MergeArgs {
    fn validate(&self) -> Result<()> {
        if let Some(input) = &self.input {
            validate_path("input", input)?;
        }
        if let Some(output) = &self.output {
            validate_path("output", output)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct DocumentArgs {
    /// Transcription file name inside the transcriptions directory
    #[arg(short, long)]
    pub transcription: Option<String>,

    /// Manifest URL; repeat to combine several manifests into one document
    #[arg(short, long)]
    pub manifest: Vec<String>,

    /// Batch CSV inside the csvs directory, one document per row
    #[arg(short, long, conflicts_with_all = ["transcription", "manifest", "title", "xmlid"])]
    pub file: Option<String>,

    /// Document title
    #[arg(short = 'n', long)]
    pub title: Option<String>,

    /// Output id (file name without extension)
    #[arg(short = 'x', long)]
    pub xmlid: Option<String>,

    /// Record id echoed into the header `sameAs`
    #[arg(short = 'u', long)]
    pub fairdata_id: Option<String>,

    /// Record id used to look up the manifest
    #[arg(short = 'p', long)]
    pub media_fairdata_id: Option<String>,
}

impl DocumentArgs {
    pub fn to_descriptor(&self) -> DocumentDescriptor {
        DocumentDescriptor {
            manifests: self.manifest.clone(),
            title: self.title.clone(),
            name: None,
            transcription: self.transcription.clone(),
            output_id: self.xmlid.clone(),
            record_id: self.fairdata_id.clone(),
            lookup_id: self.media_fairdata_id.clone(),
        }
    }
}

impl Validate for DocumentArgs {
    fn validate(&self) -> Result<()> {
        let has_source = self.file.is_some()
            || !self.manifest.is_empty()
            || self.fairdata_id.is_some()
            || self.media_fairdata_id.is_some();
        if !has_source {
            return Err(TeiError::MissingConfigError {
                field: "manifest, file or record id".to_string(),
            });
        }
        for manifest in &self.manifest {
            validate_url("manifest", manifest)?;
        }
        Ok(())
    }
}
