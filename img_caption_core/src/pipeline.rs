use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::board::{CallId, CaptionSink};
use crate::caption::{format_classifications, format_failure, IN_PROGRESS};
use crate::classifier::Classifier;
use crate::config::{ConcurrencyPolicy, PipelineConfig};
use crate::error::ClassifyError;
use crate::input::Image;

/// Turns images into captions.
///
/// Each `classify` call posts the in-progress caption right away, runs
/// inference on a blocking worker of `runtime` and posts exactly one terminal
/// caption (unless the call was superseded).
pub struct ClassificationPipeline<C> {
    classifier: Arc<C>,
    sink: CaptionSink,
    config: PipelineConfig,
    runtime: Handle,
    // Id of the newest call issued.
    calls: Arc<AtomicU64>,
}

impl<C: Classifier> ClassificationPipeline<C> {
    pub fn new(classifier: C, sink: CaptionSink, config: PipelineConfig, runtime: Handle) -> Self {
        Self {
            classifier: Arc::new(classifier),
            sink: sink.with_policy(config.policy),
            config,
            runtime,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts classifying `image` and returns without waiting for inference.
    pub fn classify(&self, image: Image) -> ClassifyTask {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.sink.post(call, IN_PROGRESS, false);
        debug!("call {} started, orientation {:?}", call, image.orientation());

        let classifier = Arc::clone(&self.classifier);
        let sink = self.sink.clone();
        let calls = Arc::clone(&self.calls);
        let runtime = self.runtime.clone();
        let PipelineConfig { top_n, policy } = self.config.clone();

        let handle = self.runtime.spawn(async move {
            let work = runtime.spawn_blocking(move || run(&*classifier, &image, top_n));
            let outcome = match work.await {
                Ok(outcome) => outcome,
                Err(e) => Err(ClassifyError::InferenceInvocation(e.to_string())),
            };

            // The board drops stale updates too; this only spares the post
            // and tells the caller.
            if policy == ConcurrencyPolicy::SupersedePrevious
                && calls.load(Ordering::SeqCst) != call
            {
                debug!("call {} superseded, dropping its result", call);
                return Err(ClassifyError::Superseded);
            }

            match &outcome {
                Ok(caption) => sink.post(call, caption.as_str(), true),
                Err(e) => {
                    warn!("call {} failed: {}", call, e);
                    sink.post(call, format_failure(e), true);
                }
            }
            outcome
        });

        ClassifyTask { call, handle }
    }
}

fn run<C: Classifier + ?Sized>(
    classifier: &C,
    image: &Image,
    top_n: NonZeroUsize,
) -> Result<String, ClassifyError> {
    let buffer = image.to_pixel_buffer()?;
    let start = std::time::Instant::now();
    let classifications = classifier.predict(&buffer)?;
    debug!(
        "predict returned {} classifications in {:?}",
        classifications.len(),
        start.elapsed()
    );
    format_classifications(&classifications, top_n)
}

/// Handle to one in-flight `classify` call.
#[derive(Debug)]
pub struct ClassifyTask {
    call: CallId,
    handle: JoinHandle<Result<String, ClassifyError>>,
}

impl ClassifyTask {
    pub fn call(&self) -> CallId {
        self.call
    }

    /// Resolves with the caption posted for this call, or the error behind it.
    ///
    /// Under `SupersedePrevious` the board may still drop an `Ok` caption when
    /// a newer call starts while this one is posting.
    pub async fn wait(self) -> Result<String, ClassifyError> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(ClassifyError::InferenceInvocation(e.to_string())),
        }
    }
}
