use crate::error::ClassifyError;
use crate::input::PixelBuffer;

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// An inference engine. Results come back sorted by descending confidence.
///
/// `predict` may take a long time; the pipeline only ever calls it from a
/// blocking worker.
pub trait Classifier: Send + Sync + 'static {
    fn predict(&self, buffer: &PixelBuffer) -> Result<Vec<Classification>, ClassifyError>;
}
