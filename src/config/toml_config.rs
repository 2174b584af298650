use crate::core::transcription::PAGE_BREAK_MARKER_DEFAULT;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, TeiError};
use crate::utils::validation::{
    validate_language_tag, validate_non_empty_string, validate_path, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub record_lookup: RecordLookupConfig,
    pub transcription: TranscriptionConfig,
    pub manifest: ManifestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub transcriptions: String,
    pub csvs: String,
    pub tei_output: String,
    pub image_output: String,
    /// Folders of page images to turn into PDFs.
    pub merge_input: String,
    pub merge_output: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            transcriptions: "transcriptions".to_string(),
            csvs: "csvs".to_string(),
            tei_output: "TEI".to_string(),
            image_output: "image_output".to_string(),
            merge_input: "merging_input".to_string(),
            merge_output: "merging_output".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordLookupConfig {
    pub base_url: String,
    pub project_id: u64,
    /// CSV column that supplies the output id when `xmlid` is blank.
    pub xml_id_field: Option<String>,
}

impl Default for RecordLookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.coredata.cloud".to_string(),
            project_id: 92,
            xml_id_field: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub page_break_marker: String,
    /// Skip the transcription when its pages do not match the facsimile surfaces.
    pub strict_alignment: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            page_break_marker: PAGE_BREAK_MARKER_DEFAULT.to_string(),
            strict_alignment: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub display_language: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            display_language: "en".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TeiError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| TeiError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}

impl ConfigProvider for AppConfig {
    fn transcriptions_dir(&self) -> &str {
        &self.paths.transcriptions
    }

    fn csv_dir(&self) -> &str {
        &self.paths.csvs
    }

    fn tei_output_dir(&self) -> &str {
        &self.paths.tei_output
    }

    fn image_output_dir(&self) -> &str {
        &self.paths.image_output
    }

    fn merge_input_dir(&self) -> &str {
        &self.paths.merge_input
    }

    fn merge_output_dir(&self) -> &str {
        &self.paths.merge_output
    }

    fn page_break_marker(&self) -> &str {
        &self.transcription.page_break_marker
    }

    fn display_language(&self) -> &str {
        &self.manifest.display_language
    }

    fn strict_alignment(&self) -> bool {
        self.transcription.strict_alignment
    }

    fn xml_id_field(&self) -> Option<&str> {
        self.record_lookup.xml_id_field.as_deref()
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_path("paths.transcriptions", &self.paths.transcriptions)?;
        validate_path("paths.csvs", &self.paths.csvs)?;
        validate_path("paths.tei_output", &self.paths.tei_output)?;
        validate_path("paths.image_output", &self.paths.image_output)?;
        validate_path("paths.merge_input", &self.paths.merge_input)?;
        validate_path("paths.merge_output", &self.paths.merge_output)?;
        validate_url("record_lookup.base_url", &self.record_lookup.base_url)?;
        validate_non_empty_string(
            "transcription.page_break_marker",
            &self.transcription.page_break_marker,
        )?;
        validate_language_tag("manifest.display_language", &self.manifest.display_language)?;
        Ok(())
    }
}
