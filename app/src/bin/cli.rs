use std::num::NonZeroUsize;

use clap::Parser;
use img_caption_core::{
    caption_channel, AppConfig, ClassificationPipeline, ClipClassifier, ConcurrencyPolicy, Image,
    ImageOrientation,
};
use tracing::{info, warn};

#[derive(Parser)]
struct Args {
    #[arg(long, use_value_delimiter = true, required = true)]
    images: Vec<String>,

    #[arg(long, use_value_delimiter = true)]
    labels: Option<Vec<String>>,

    /// Stored orientation of every image, 0 (up) through 7 (right mirrored).
    #[arg(long, default_value_t = 0)]
    orientation: u32,

    #[arg(long)]
    config: Option<String>,

    /// last-writer-wins or supersede-previous
    #[arg(long)]
    policy: Option<ConcurrencyPolicy>,

    #[arg(long)]
    top_n: Option<NonZeroUsize>,
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("read config {} err:{}", path, e))?;
            toml::from_str(&text)?
        }
        None => AppConfig::default(),
    };
    if let Some(labels) = &args.labels {
        config.labels = labels.clone();
    }
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    Ok(config)
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    std::env::set_var("RUST_BACKTRACE", "full");
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let config = load_config(&args)?;
    let orientation = ImageOrientation::try_from(args.orientation)?;
    info!("labels: {:?}, policy: {:?}", config.labels, config.policy);

    let (sink, board) = caption_channel();
    let classifier = ClipClassifier::new(config.model.clone(), config.labels.clone());
    let pipeline = ClassificationPipeline::new(
        classifier,
        sink,
        config.pipeline(),
        tokio::runtime::Handle::current(),
    );

    let mut tasks = vec![];
    for path in &args.images {
        let image = Image::open(path, orientation)?;
        let task = pipeline.classify(image);
        info!("call {} classifying {}", task.call(), path);
        tasks.push(task);
    }
    drop(pipeline);

    let waiter = tokio::spawn(async move {
        for task in tasks {
            let call = task.call();
            if let Err(e) = task.wait().await {
                warn!("call {} ended without a result: {}", call, e);
            }
        }
    });

    // The board is the caption's only writer; it runs here until every call is done.
    let last = board
        .run(|update| info!("\n\n[call {}]\n{}\n", update.call, update.caption))
        .await;
    waiter.await?;
    info!("final caption:\n{}", last);
    Ok(())
}
