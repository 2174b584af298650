use thiserror::Error;

#[derive(Error, Debug)]
pub enum TeiError {
    #[error("Manifest validation error: {reason}")]
    ManifestValidation { reason: String },

    #[error("Malformed localized value: {reason}")]
    MalformedLocalizedValue { reason: String },

    #[error("Unknown MIMEType: {mime_type}")]
    UnknownMimeType { mime_type: String },

    #[error("No related media found for document {record_id}")]
    RecordNotFound { record_id: String },

    #[error("Something went wrong fetching media for document {record_id}: {reason}")]
    RecordLookup { record_id: String, reason: String },

    #[error("Transcription contains unsupported structures ({markup}); edit the file and try again")]
    UnsupportedMarkup { markup: String },

    #[error("Transcription page {page} is not well-formed: {reason}")]
    MalformedFragment { page: usize, reason: String },

    #[error("Transcription pages do not line up with facsimile surfaces: {reason}")]
    PageAlignment { reason: String },

    #[error("Image fetch failed for page {page} ({url}): {reason}")]
    ImageFetch {
        page: usize,
        url: String,
        reason: String,
    },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Response from {url} is not valid JSON: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Document conversion failed: {reason}")]
    DocumentConversion { reason: String },

    #[error("PDF build failed: {reason}")]
    PdfBuild { reason: String },

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Manifest,
    Transcription,
    Network,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TeiError {
    pub fn manifest(reason: impl Into<String>) -> Self {
        TeiError::ManifestValidation {
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TeiError::ManifestValidation { .. }
            | TeiError::MalformedLocalizedValue { .. }
            | TeiError::UnknownMimeType { .. } => ErrorCategory::Manifest,
            TeiError::UnsupportedMarkup { .. }
            | TeiError::MalformedFragment { .. }
            | TeiError::PageAlignment { .. }
            | TeiError::DocumentConversion { .. } => ErrorCategory::Transcription,
            TeiError::RecordNotFound { .. }
            | TeiError::RecordLookup { .. }
            | TeiError::ImageFetch { .. }
            | TeiError::Http { .. }
            | TeiError::HttpStatus { .. } => ErrorCategory::Network,
            TeiError::InvalidJson { .. }
            | TeiError::PdfBuild { .. }
            | TeiError::XmlError(_)
            | TeiError::ZipError(_)
            | TeiError::CsvError(_)
            | TeiError::SerializationError(_) => ErrorCategory::Data,
            TeiError::ConfigError { .. }
            | TeiError::MissingConfigError { .. }
            | TeiError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            TeiError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TeiError::MalformedLocalizedValue { .. }
            | TeiError::UnsupportedMarkup { .. }
            | TeiError::MalformedFragment { .. }
            | TeiError::PageAlignment { .. }
            | TeiError::DocumentConversion { .. } => ErrorSeverity::Low,
            TeiError::Http { .. }
            | TeiError::HttpStatus { .. }
            | TeiError::ImageFetch { .. }
            | TeiError::RecordLookup { .. } => ErrorSeverity::Medium,
            TeiError::ConfigError { .. }
            | TeiError::MissingConfigError { .. }
            | TeiError::InvalidConfigValueError { .. }
            | TeiError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Step-level failures that leave the rest of the document usable.
    pub fn is_recoverable(&self) -> bool {
        self.severity() == ErrorSeverity::Low
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            TeiError::ManifestValidation { .. } => {
                "Check that the URL points to a IIIF Presentation 2 or 3 manifest"
            }
            TeiError::MalformedLocalizedValue { .. } => {
                "Give the label at least one language entry"
            }
            TeiError::UnknownMimeType { .. } => "Use a PNG, JPEG or GIF image",
            TeiError::RecordNotFound { .. } => {
                "Attach a media record to the item or pass the manifest URL directly"
            }
            TeiError::RecordLookup { .. } => "Check the record id and the lookup base URL",
            TeiError::UnsupportedMarkup { .. } => {
                "Remove tables and lists from the transcription and try again"
            }
            TeiError::MalformedFragment { .. } => {
                "Check the transcription page for unbalanced formatting"
            }
            TeiError::PageAlignment { .. } => {
                "Make the number of transcription pages match the number of canvases"
            }
            TeiError::ImageFetch { .. } | TeiError::Http { .. } | TeiError::HttpStatus { .. } => {
                "Check network connectivity and that the server is reachable"
            }
            TeiError::InvalidJson { .. } | TeiError::SerializationError(_) => {
                "The server did not return JSON; check the URL"
            }
            TeiError::DocumentConversion { .. } | TeiError::ZipError(_) => {
                "Re-save the transcription as a .docx file"
            }
            TeiError::PdfBuild { .. } => "Check that the folder holds only JPEG page images",
            TeiError::XmlError(_) => "Check the XML input for syntax errors",
            TeiError::CsvError(_) => "Check the batch CSV: the first row must name the columns",
            TeiError::IoError(_) => "Check file paths and permissions",
            TeiError::ConfigError { .. }
            | TeiError::MissingConfigError { .. }
            | TeiError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line arguments"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Manifest => format!("Could not read the IIIF manifest: {}", self),
            ErrorCategory::Transcription => format!("Transcription skipped: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Data => format!("Unexpected data: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, TeiError>;
