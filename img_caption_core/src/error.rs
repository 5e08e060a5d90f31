use thiserror::Error;

/// Every way a single `classify` call can end without a ranked caption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("unable to convert image: {0}")]
    ImageConversion(String),

    #[error("inference could not be performed: {0}")]
    InferenceInvocation(String),

    /// The engine ran and reported a failure. Displays as the bare description.
    #[error("{0}")]
    Inference(String),

    #[error("no classifications were returned")]
    EmptyResults,

    #[error("invalid image orientation value {0}")]
    InvalidOrientation(u32),

    #[error("superseded by a newer classification")]
    Superseded,
}
