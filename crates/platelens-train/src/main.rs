//! Offline trainer for the food ingredient model
//!
//! Fine-tunes an EfficientNet-B0 backbone on a labeled image directory in
//! two phases: first only the classification head learns at a higher rate,
//! then every parameter is unfrozen at a lower one. The result is written
//! as a safetensors checkpoint. This binary shares no code with the
//! serving stack and is meant to run on a training box, not in production.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Var};
use candle_nn::{AdamW, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use candle_transformers::models::efficientnet::{EfficientNet, MBConvConfig};
use clap::Parser;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

mod dataset;
mod metrics;

use dataset::Dataset;
use metrics::MicroF1;

#[derive(Parser)]
#[command(name = "platelens-train")]
#[command(about = "Train the food ingredient classifier on a labeled image directory")]
struct Cli {
    /// Dataset directory containing images and labels.csv
    #[arg(short, long)]
    dataset: PathBuf,

    /// Pretrained backbone weights to start from (safetensors)
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Where to write the trained checkpoint
    #[arg(short, long, default_value = "food_model.safetensors")]
    output: PathBuf,

    /// Number of ingredient classes
    #[arg(long, default_value_t = 498)]
    classes: usize,

    /// Samples per training batch
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Epochs with only the classification head unfrozen
    #[arg(long, default_value_t = 10)]
    transfer_epochs: usize,

    /// Epochs with the full network unfrozen
    #[arg(long, default_value_t = 10)]
    finetune_epochs: usize,

    /// Learning rate for the head-only phase
    #[arg(long, default_value_t = 1e-3)]
    transfer_lr: f64,

    /// Learning rate for the full-network phase
    #[arg(long, default_value_t = 1e-4)]
    finetune_lr: f64,

    /// Seed for batch shuffling
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Train on the first CUDA device instead of the CPU
    #[arg(long)]
    cuda: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let device = if cli.cuda {
        Device::new_cuda(0).context("Failed to initialize CUDA device")?
    } else {
        Device::Cpu
    };

    let dataset = Dataset::load(&cli.dataset, cli.classes)?;
    if dataset.is_empty() {
        anyhow::bail!("Dataset at {} has no samples", cli.dataset.display());
    }
    info!(
        "Loaded {} samples across {} classes from {}",
        dataset.len(),
        cli.classes,
        cli.dataset.display()
    );

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = EfficientNet::new(vb, MBConvConfig::b0(), cli.classes)
        .context("Failed to build EfficientNet-B0")?;

    if let Some(weights) = &cli.weights {
        let loaded = load_pretrained(&varmap, weights, &device)?;
        info!("Loaded {} pretrained tensors from {}", loaded, weights.display());
    }

    let mut rng = StdRng::seed_from_u64(cli.seed);

    let head = head_vars(&varmap);
    if head.is_empty() {
        anyhow::bail!("No classification head variables found");
    }
    run_phase(
        "transfer",
        &model,
        &dataset,
        head,
        cli.transfer_lr,
        cli.transfer_epochs,
        cli.batch_size,
        &device,
        &mut rng,
    )?;
    run_phase(
        "finetune",
        &model,
        &dataset,
        varmap.all_vars(),
        cli.finetune_lr,
        cli.finetune_epochs,
        cli.batch_size,
        &device,
        &mut rng,
    )?;

    varmap
        .save(&cli.output)
        .with_context(|| format!("Failed to save checkpoint to {}", cli.output.display()))?;
    info!("Saved trained checkpoint to {}", cli.output.display());
    Ok(())
}

/// Run one optimization phase over the given trainable variables
fn run_phase(
    name: &str,
    model: &EfficientNet,
    dataset: &Dataset,
    vars: Vec<Var>,
    lr: f64,
    epochs: usize,
    batch_size: usize,
    device: &Device,
    rng: &mut StdRng,
) -> Result<()> {
    if epochs == 0 {
        return Ok(());
    }
    info!("Starting {} phase: {} epochs at lr {}", name, epochs, lr);

    let mut optimizer = AdamW::new(
        vars,
        ParamsAdamW {
            lr,
            ..Default::default()
        },
    )?;

    for epoch in 1..=epochs {
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.shuffle(rng);

        let mut total_loss = 0f32;
        let mut batches = 0usize;
        let mut f1 = MicroF1::new(0.5);

        for chunk in order.chunks(batch_size) {
            let (images, targets) = dataset.batch(chunk, device)?;
            let logits = model.forward(&images)?;
            let loss = candle_nn::loss::binary_cross_entropy_with_logit(&logits, &targets)?;
            optimizer.backward_step(&loss)?;

            f1.update(&logits, &targets)?;
            total_loss += loss.to_scalar::<f32>()?;
            batches += 1;
        }

        info!(
            "{} epoch {}/{}: loss {:.4}, micro-F1 {:.4}",
            name,
            epoch,
            epochs,
            total_loss / batches.max(1) as f32,
            f1.f1()
        );
    }
    Ok(())
}

/// Copy matching tensors from a safetensors file into the variable map
///
/// Only tensors whose name and shape both match are copied, so a checkpoint
/// with a differently sized head still seeds the backbone while the fresh
/// head keeps its random initialization. Returns how many tensors loaded.
fn load_pretrained(varmap: &VarMap, path: &Path, device: &Device) -> Result<usize> {
    let tensors = candle_core::safetensors::load(path, device)
        .with_context(|| format!("Failed to read weights from {}", path.display()))?;

    let mut loaded = 0;
    let data = varmap.data().lock().unwrap();
    for (name, var) in data.iter() {
        match tensors.get(name) {
            Some(tensor) if tensor.shape() == var.shape() => {
                var.set(tensor)?;
                loaded += 1;
            }
            Some(tensor) => {
                debug!(
                    "Skipping {}: checkpoint shape {:?} does not match model shape {:?}",
                    name,
                    tensor.shape(),
                    var.shape()
                );
            }
            None => {
                debug!("Skipping {}: not present in checkpoint", name);
            }
        }
    }
    Ok(loaded)
}

/// The classification head variables, the only ones trained in phase one
fn head_vars(varmap: &VarMap) -> Vec<Var> {
    varmap
        .data()
        .lock()
        .unwrap()
        .iter()
        .filter(|(name, _)| name.starts_with("classifier"))
        .map(|(_, var)| var.clone())
        .collect()
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("platelens_train=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("platelens_train=info"))
    };
    fmt().with_env_filter(filter).init();
}
