pub mod analyzer;
pub mod compose;
pub mod config;
pub mod css;
pub mod decision;
pub mod html;
pub mod intake;
pub mod model;
pub mod renderer;
pub mod repository;
pub mod supervisor;

/// A specialized result type for layout-core operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors that can occur while loading, analyzing, composing, or rendering
/// a magazine issue.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A requested issue, article, image, or template pack does not exist.
    #[error("not found: {0}")]
    InputNotFound(String),
    /// Intake JSON did not match the documented schema.
    #[error("intake schema error: {0}")]
    IntakeSchema(String),
    /// The composed template failed renderer-side validation.
    #[error("template validation failed: {0}")]
    TemplateValidation(String),
    /// The paged-media renderer did not finish within its time budget.
    #[error("render timed out: {0}")]
    RenderTimeout(String),
    /// The paged-media renderer failed for a reason other than a timeout.
    #[error("render failed: {0}")]
    RenderInternal(String),
    /// Neither the primary renderer nor the HTML fallback could write an
    /// artifact to disk.
    #[error("failed to write render artifact: {0}")]
    FallbackWriteFailure(String),
    /// The job was cancelled before it reached a terminal state.
    #[error("job cancelled")]
    Cancelled,
    /// An operation was attempted against a job already in a terminal
    /// state.
    #[error("invalid job transition: {0}")]
    InvalidTransition(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ::config::ConfigError),
}
