use anyhow::Result;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{self, ClipConfig, ClipModel};

#[cfg(feature = "fat")]
use rust_embed::Embed;
use tokenizers::Tokenizer;
use tracing::info;

use crate::config::ModelConfig;

#[cfg(feature = "fat")]
#[derive(Embed)]
#[folder = "resource/openai_clip_vit_base_patch32/"]
struct Asset;

#[cfg(not(feature = "fat"))]
struct Asset;
#[cfg(not(feature = "fat"))]
struct FakeEmbedFile<'a> {
    data: &'a [u8],
}
#[cfg(not(feature = "fat"))]
impl Asset {
    fn get(_: &str) -> Option<FakeEmbedFile<'static>> {
        None
    }
}

/// Reads one model file, from the binary when built `fat`, otherwise from the hub.
fn fetch(settings: &ModelConfig, name: &str) -> Result<Vec<u8>> {
    if cfg!(feature = "fat") {
        let f = Asset::get(name).ok_or(anyhow::format_err!("{} not embedded", name))?;
        return Ok(f.data.to_vec());
    }
    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_endpoint(settings.endpoint.clone())
        .build()?;
    let api = api.repo(hf_hub::Repo::with_revision(
        settings.repo.clone(),
        hf_hub::RepoType::Model,
        settings.revision.clone(),
    ));
    let path = api.get(name)?;
    info!("{} resolved to {}", name, path.display());
    std::fs::read(&path).map_err(|e| anyhow::anyhow!("read {} err:{}", path.display(), e))
}

pub fn get_model(settings: &ModelConfig, config: &ClipConfig) -> Result<ClipModel> {
    let data = fetch(settings, "model.safetensors")?;
    let vb = VarBuilder::from_slice_safetensors(&data, DType::F32, &Device::Cpu)?;
    let model = clip::ClipModel::new(vb, config)?;
    Ok(model)
}

pub fn get_tokenizer(settings: &ModelConfig) -> Result<Tokenizer> {
    let data = fetch(settings, "tokenizer.json")?;
    Tokenizer::from_bytes(data).map_err(|e| anyhow::anyhow!("failed to create tokenizer, {}", e))
}
