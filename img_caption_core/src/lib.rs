pub mod board;
pub mod caption;
pub mod classifier;
pub mod clip;
pub mod config;
pub mod error;
pub mod input;
pub mod orientation;
pub mod pipeline;
pub mod resource;

pub use board::{caption_channel, CallId, CaptionBoard, CaptionSink, CaptionUpdate};
pub use classifier::{Classification, Classifier};
pub use clip::ClipClassifier;
pub use config::{AppConfig, ConcurrencyPolicy, ModelConfig, PipelineConfig};
pub use error::ClassifyError;
pub use input::{Image, PixelBuffer};
pub use orientation::{ImageOrientation, OrientationTag};
pub use pipeline::{ClassificationPipeline, ClassifyTask};
