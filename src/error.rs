//! Error taxonomy shared by rendering, template loading and PDF export.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A render was requested before any resume data was set.
    #[error("resume data not set; call set_resume_data() first")]
    MissingData,

    /// The requested template name is not part of the loaded set.
    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    /// A template document could not be retrieved during initialization.
    #[error("failed to load template '{name}': {reason}")]
    TemplateLoad { name: String, reason: String },

    /// The rasterizer failed, or the staged document had no content root.
    #[error("PDF rasterization failed: {0}")]
    Rasterization(String),

    #[error("invalid resume data: {0}")]
    InvalidData(#[from] serde_json::Error),

    /// Required resume fields are missing or empty.
    #[error("missing required fields: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
