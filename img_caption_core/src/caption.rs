use std::num::NonZeroUsize;

use crate::classifier::Classification;
use crate::error::ClassifyError;

pub const IN_PROGRESS: &str = "Classifying scene...";
pub const DEFAULT_TOP_N: NonZeroUsize = NonZeroUsize::MIN.saturating_add(1);

const HEADER: &str = "Classification:\n";
const FAILURE_HEADER: &str = "Unable to classify facial expression.\n";

/// Formats the leading `top_n` entries, keeping the engine's order.
///
/// An empty slice is a failure and yields `Err(EmptyResults)`.
pub fn format_classifications(
    classifications: &[Classification],
    top_n: NonZeroUsize,
) -> Result<String, ClassifyError> {
    if classifications.is_empty() {
        return Err(ClassifyError::EmptyResults);
    }
    let lines: Vec<String> = classifications
        .iter()
        .take(top_n.get())
        .map(|c| format!("  ({:.2}) {}", c.confidence, c.label))
        .collect();
    Ok(format!("{HEADER}{}", lines.join("\n")))
}

pub fn format_failure(error: &ClassifyError) -> String {
    format!("{FAILURE_HEADER}{error}")
}
