//! Zero-shot CLIP classifier over a fixed label set.
//!
//! Weights are loaded on the first prediction. A failed load fails only that
//! prediction; the next one tries again.

use anyhow::Error as E;
use candle_core::{DType, Device, Tensor};
use candle_nn::ops::softmax;
use candle_transformers::models::clip::{ClipConfig, ClipModel};
use image::imageops::FilterType;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use tokenizers::Tokenizer;
use tracing::info;

use crate::classifier::{Classification, Classifier};
use crate::config::ModelConfig;
use crate::error::ClassifyError;
use crate::input::PixelBuffer;
use crate::resource;

/// Encodes every prompt and right-pads them with `<|endoftext|>` into one
/// `(prompts, max_len)` id tensor.
pub fn tokenize_prompts(
    prompts: &[String],
    tokenizer: &Tokenizer,
    device: &Device,
) -> anyhow::Result<Tensor> {
    let pad_id = *tokenizer
        .get_vocab(true)
        .get("<|endoftext|>")
        .ok_or(E::msg("tokenizer has no <|endoftext|> token"))?;

    let mut ids = prompts
        .iter()
        .map(|p| {
            let encoding = tokenizer.encode(p.as_str(), true).map_err(E::msg)?;
            Ok(encoding.get_ids().to_vec())
        })
        .collect::<anyhow::Result<Vec<Vec<u32>>>>()?;

    let width = ids.iter().map(Vec::len).max().unwrap_or(0);
    for row in ids.iter_mut() {
        row.resize(width, pad_id);
    }
    Ok(Tensor::new(ids, device)?)
}

/// CHW f32 tensor scaled to [-1, 1], cropped to a `side` square.
pub fn image_tensor(img: &DynamicImage, side: usize) -> anyhow::Result<Tensor> {
    let pixels = img
        .resize_to_fill(side as u32, side as u32, FilterType::Triangle)
        .to_rgb8()
        .into_raw();
    let tensor = Tensor::from_vec(pixels, (side, side, 3), &Device::Cpu)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?
        .affine(2. / 255., -1.)?;
    Ok(tensor)
}

/// Pairs each label with its probability, highest first.
pub fn rank(labels: &[String], probs: &[f32]) -> Vec<Classification> {
    let mut ranked: Vec<Classification> = labels
        .iter()
        .zip(probs)
        .map(|(label, p)| Classification::new(label.as_str(), *p))
        .collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked
}

struct LoadedClip {
    model: ClipModel,
    input_ids: Tensor,
}

pub struct ClipClassifier {
    settings: ModelConfig,
    labels: Vec<String>,
    loaded: OnceCell<LoadedClip>,
}

impl ClipClassifier {
    pub fn new(settings: ModelConfig, labels: Vec<String>) -> Self {
        Self {
            settings,
            labels,
            loaded: OnceCell::new(),
        }
    }

    fn load(&self) -> anyhow::Result<LoadedClip> {
        if self.labels.is_empty() {
            anyhow::bail!("no labels configured");
        }
        let start = std::time::Instant::now();
        let config = ClipConfig::vit_base_patch32();
        let model = resource::get_model(&self.settings, &config)?;
        let tokenizer = resource::get_tokenizer(&self.settings)?;

        let prompts: Vec<String> = self.labels.iter().map(|l| self.settings.prompt(l)).collect();
        let input_ids = tokenize_prompts(&prompts, &tokenizer, &Device::Cpu)?;
        info!(
            "loaded {} with {} labels in {:?}",
            self.settings.repo,
            self.labels.len(),
            start.elapsed()
        );
        Ok(LoadedClip { model, input_ids })
    }

    fn forward(&self, loaded: &LoadedClip, image: &Tensor) -> anyhow::Result<Vec<f32>> {
        let images = image.unsqueeze(0)?;

        let start = std::time::Instant::now();
        let (_logits_per_text, logits_per_image) =
            loaded.model.forward(&images, &loaded.input_ids)?;
        info!("forward costs:{:?}", start.elapsed());

        let softmax_image = softmax(&logits_per_image, 1)?;
        let probs = softmax_image.flatten_all()?.to_vec1::<f32>()?;
        Ok(probs)
    }
}

impl Classifier for ClipClassifier {
    fn predict(&self, buffer: &PixelBuffer) -> Result<Vec<Classification>, ClassifyError> {
        let loaded = self
            .loaded
            .get_or_try_init(|| self.load())
            .map_err(|e| ClassifyError::ModelUnavailable(format!("{:#}", e)))?;

        let upright = buffer.to_upright_image()?;
        let image_size = ClipConfig::vit_base_patch32().image_size;
        let image = image_tensor(&upright, image_size)
            .map_err(|e| ClassifyError::ImageConversion(e.to_string()))?;

        let probs = self
            .forward(loaded, &image)
            .map_err(|e| ClassifyError::InferenceInvocation(e.to_string()))?;
        Ok(rank(&self.labels, &probs))
    }
}
