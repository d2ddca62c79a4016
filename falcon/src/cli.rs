//! One-shot command line interface.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, CommandFactory, Parser};
use falcon_core::config::resolve_api_key;
use falcon_core::format::{format_cost, format_relative_time, truncate};
use falcon_core::image::{self, generate_filename};
use falcon_core::jobs::{
    self, base_prompt, BackgroundJob, GenerateJob, JobOutcome, UpscaleJob, MAX_IMAGES, MAX_SCALE,
};
use falcon_core::models::{self, ModelConfig};
use falcon_core::{AspectRatio, FalClient, FalconConfig, Resolution, Store};
use indicatif::{ProgressBar, ProgressStyle};

use crate::preset;
use crate::validate::{validate_edit_path, validate_output_path};

/// Images generated by `--vary` unless `-n` says otherwise.
const VARIATION_COUNT: u32 = 4;

#[derive(Parser, Debug)]
#[command(name = "falcon")]
#[command(about = "Generate, edit and upscale images with fal.ai. Run without arguments for the studio.")]
#[command(version)]
#[command(group(ArgGroup::new("action").args(["last", "vary", "up", "rmbg"]).multiple(false)))]
pub struct Args {
    /// Prompt, or an image path with --up
    pub prompt: Option<String>,

    /// Model id (gpt, banana, gemini, gemini3)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Edit an existing PNG, JPG or WebP image
    #[arg(short, long, value_name = "FILE")]
    pub edit: Option<PathBuf>,

    /// Aspect ratio, e.g. 16:9
    #[arg(short, long)]
    pub aspect: Option<AspectRatio>,

    /// Resolution: 1K, 2K or 4K
    #[arg(short, long)]
    pub resolution: Option<Resolution>,

    /// Output file, inside the current directory
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of images (1-4)
    #[arg(short, long)]
    pub num: Option<u32>,

    /// Kindle/eBook cover (2:3, 2K)
    #[arg(long, help_heading = "Presets")]
    pub cover: bool,
    /// Square (1:1)
    #[arg(long, help_heading = "Presets")]
    pub square: bool,
    /// Landscape (16:9)
    #[arg(long, help_heading = "Presets")]
    pub landscape: bool,
    /// Portrait (2:3)
    #[arg(long, help_heading = "Presets")]
    pub portrait: bool,
    /// Instagram/TikTok Story (9:16)
    #[arg(long, help_heading = "Presets")]
    pub story: bool,
    /// Instagram Reel (9:16)
    #[arg(long, help_heading = "Presets")]
    pub reel: bool,
    /// Instagram Feed portrait (4:5)
    #[arg(long, help_heading = "Presets")]
    pub feed: bool,
    /// Open Graph / social share (16:9)
    #[arg(long, help_heading = "Presets")]
    pub og: bool,
    /// Phone wallpaper (9:16, 2K)
    #[arg(long, help_heading = "Presets")]
    pub wallpaper: bool,
    /// Cinematic wide (21:9)
    #[arg(long, help_heading = "Presets")]
    pub wide: bool,
    /// Ultra-wide banner (21:9, 2K)
    #[arg(long, help_heading = "Presets")]
    pub ultra: bool,

    /// Transparent background (models that support it)
    #[arg(long)]
    pub transparent: bool,

    /// Show the last generation
    #[arg(long)]
    pub last: bool,

    /// Variations of the last generation
    #[arg(long)]
    pub vary: bool,

    /// Upscale the last generation, or the image given as the prompt
    #[arg(long)]
    pub up: bool,

    /// Remove the background of the last generation
    #[arg(long)]
    pub rmbg: bool,

    /// Upscale factor for --up
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=MAX_SCALE as i64))]
    pub scale: u32,

    /// Don't open the result
    #[arg(long)]
    pub no_open: bool,
}

impl Args {
    fn enabled_presets(&self) -> Vec<&'static str> {
        [
            ("cover", self.cover),
            ("square", self.square),
            ("landscape", self.landscape),
            ("portrait", self.portrait),
            ("story", self.story),
            ("reel", self.reel),
            ("feed", self.feed),
            ("og", self.og),
            ("wallpaper", self.wallpaper),
            ("wide", self.wide),
            ("ultra", self.ultra),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }

    fn has_work(&self) -> bool {
        self.prompt.is_some() || self.edit.is_some() || self.vary || self.up || self.rmbg
    }
}

/// Everything a command needs besides its arguments.
pub struct CommandEnv {
    pub store: Store,
    pub config: FalconConfig,
    pub base_url: String,
    pub cwd: PathBuf,
}

/// Run one command.
pub async fn run(args: Args, ctx: &CommandEnv) -> Result<()> {
    if args.last {
        print_last(&ctx.store);
        return Ok(());
    }
    if !args.has_work() {
        Args::command().print_help()?;
        println!();
        return Ok(());
    }

    let api_key = resolve_api_key(None, &ctx.config)?;
    let client = FalClient::with_base_url(&api_key, &ctx.base_url)
        .context("failed to create API client")?;

    let outcome = if args.vary {
        vary(&args, ctx, &client).await?
    } else if args.up {
        upscale(&args, ctx, &client).await?
    } else if args.rmbg {
        remove_background(&args, ctx, &client).await?
    } else {
        generate(&args, ctx, &client).await?
    };

    report(&outcome, !args.no_open && ctx.config.open_after_generate)
}

fn print_last(store: &Store) {
    let Some(last) = store.last_generation() else {
        println!("No previous generations found");
        return;
    };

    println!();
    println!("Last Generation:");
    println!("  Prompt: {}", truncate(&last.prompt, 60));
    println!("  Model:  {}", models::display_name(&last.model));
    println!("  Aspect: {} | Resolution: {}", last.aspect, last.resolution);
    println!("  Output: {}", last.output.display());
    println!("  Cost:   {}", format_cost(last.cost));
    println!(
        "  Time:   {} ({})",
        last.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        format_relative_time(last.timestamp)
    );
}

// ============================================
// Commands
// ============================================

async fn generate(args: &Args, ctx: &CommandEnv, client: &FalClient) -> Result<JobOutcome> {
    let prompt = match args.prompt.as_deref().map(str::trim) {
        Some(prompt) if !prompt.is_empty() => prompt.to_string(),
        _ => bail!("A prompt is required"),
    };
    let model = generation_model(args.model.as_deref().unwrap_or(&ctx.config.default_model))?;

    let mut aspect = args.aspect.unwrap_or(ctx.config.default_aspect);
    let mut resolution = args.resolution.unwrap_or(ctx.config.default_resolution);
    apply_presets(args, &mut aspect, &mut resolution);

    let edit_source = args
        .edit
        .as_deref()
        .map(|path| validate_edit_path(path, &ctx.cwd))
        .transpose()?;
    let prefix = if edit_source.is_some() { "edit" } else { "fal" };

    let job = GenerateJob {
        prompt,
        model: model.id.to_string(),
        aspect,
        resolution,
        num_images: args.num.unwrap_or(1).clamp(1, MAX_IMAGES),
        edit_source,
        transparent: args.transparent,
        output: output_path(args, ctx, prefix)?,
    };
    print_plan(&job, model);

    let message = if job.edit_source.is_some() { "Editing..." } else { "Generating..." };
    Ok(with_spinner(message, jobs::run_generate(client, &ctx.store, &job)).await?)
}

async fn vary(args: &Args, ctx: &CommandEnv, client: &FalClient) -> Result<JobOutcome> {
    let last = ctx
        .store
        .last_generation()
        .context("No previous generation to create variations of")?;

    let prompt = match args.prompt.as_deref().map(str::trim) {
        Some(prompt) if !prompt.is_empty() => prompt.to_string(),
        _ => base_prompt(&last.prompt).to_string(),
    };
    let model_id = match args.model.as_deref() {
        Some(id) => id,
        None if models::find(&last.model).is_some_and(ModelConfig::is_generation) => {
            last.model.as_str()
        }
        None => ctx.config.default_model.as_str(),
    };
    let model = generation_model(model_id)?;

    let mut aspect = args.aspect.unwrap_or(last.aspect);
    let mut resolution = args.resolution.unwrap_or(last.resolution);
    apply_presets(args, &mut aspect, &mut resolution);

    let job = GenerateJob {
        prompt,
        model: model.id.to_string(),
        aspect,
        resolution,
        num_images: args.num.unwrap_or(VARIATION_COUNT).clamp(1, MAX_IMAGES),
        edit_source: None,
        transparent: args.transparent,
        output: output_path(args, ctx, "var")?,
    };
    print_plan(&job, model);

    Ok(with_spinner("Generating variations...", jobs::run_generate(client, &ctx.store, &job)).await?)
}

async fn upscale(args: &Args, ctx: &CommandEnv, client: &FalClient) -> Result<JobOutcome> {
    let model = args.model.clone().unwrap_or_else(|| ctx.config.upscaler.clone());
    let mut job = match args.prompt.as_deref() {
        Some(path) => {
            let source = validate_edit_path(Path::new(path), &ctx.cwd)?;
            UpscaleJob {
                source,
                source_prompt: None,
                aspect: AspectRatio::Square,
                resolution: Resolution::OneK,
                model,
                scale: args.scale,
                output: None,
            }
        }
        None => {
            let last = ctx
                .store
                .last_generation()
                .context("No previous generation to upscale")?;
            UpscaleJob::from_generation(&last, model, args.scale)
        }
    };
    if let Some(output) = &args.output {
        job.output = Some(validate_output_path(output, &ctx.cwd)?);
    }

    println!("Upscaling: {}", job.source.display());
    println!(
        "Model: {} | Scale: {}x | Est. cost: {}",
        models::display_name(&job.model),
        job.scale,
        format_cost(models::estimate_cost(&job.model, None, 1))
    );

    Ok(with_spinner("Upscaling...", jobs::run_upscale(client, &ctx.store, &job)).await?)
}

async fn remove_background(args: &Args, ctx: &CommandEnv, client: &FalClient) -> Result<JobOutcome> {
    let last = ctx
        .store
        .last_generation()
        .context("No previous generation to remove background from")?;
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| ctx.config.background_remover.clone());

    let mut job = BackgroundJob::from_generation(&last, model);
    if let Some(output) = &args.output {
        job.output = Some(validate_output_path(output, &ctx.cwd)?);
    }

    println!("Removing background: {}", job.source.display());
    println!(
        "Model: {} | Est. cost: {}",
        models::display_name(&job.model),
        format_cost(models::estimate_cost(&job.model, None, 1))
    );

    Ok(with_spinner(
        "Removing background...",
        jobs::run_remove_background(client, &ctx.store, &job),
    )
    .await?)
}

// ============================================
// Helpers
// ============================================

fn generation_model(id: &str) -> Result<&'static ModelConfig> {
    match models::find(id) {
        Some(model) if model.is_generation() => Ok(model),
        _ => bail!(
            "Unknown model: {}. Available models: {}",
            id,
            models::generation_models().join(", ")
        ),
    }
}

fn apply_presets(args: &Args, aspect: &mut AspectRatio, resolution: &mut Resolution) {
    if let Some(preset) = preset::pick(args.enabled_presets()) {
        tracing::debug!(preset = preset.name, "Applying preset");
        preset.apply(aspect, resolution);
    }
}

fn output_path(args: &Args, ctx: &CommandEnv, prefix: &str) -> Result<PathBuf> {
    match &args.output {
        Some(path) => Ok(validate_output_path(path, &ctx.cwd)?),
        None => Ok(ctx.cwd.join(generate_filename(prefix))),
    }
}

fn print_plan(job: &GenerateJob, model: &ModelConfig) {
    let cost = models::estimate_cost(model.id, Some(job.resolution), job.num_images.clamp(1, MAX_IMAGES));

    println!("Model: {} ({})", model.name, model.pricing_label);
    if model.capabilities.supports_resolution {
        println!("Aspect: {} | Resolution: {}", job.aspect, job.resolution);
    } else {
        println!("Aspect: {}", job.aspect);
    }
    println!("Prompt: {}", truncate(&job.prompt, 60));
    if job.num_images > 1 {
        println!("Images: {}", job.num_images);
    }
    println!("Est. cost: {}", format_cost(cost));
    if let Some(source) = &job.edit_source {
        println!("Editing: {}", source.display());
    }
}

async fn with_spinner<T>(
    message: &str,
    work: impl Future<Output = falcon_core::Result<T>>,
) -> falcon_core::Result<T> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = work.await;
    pb.finish_and_clear();
    result
}

fn report(outcome: &JobOutcome, open_after: bool) -> Result<()> {
    for saved in &outcome.images {
        let dims = saved
            .dimensions
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!("✓ Saved: {} ({}, {})", saved.path.display(), dims, saved.size);
    }

    let totals = outcome.history.total_cost;
    println!(
        "Session: {} | Today: {}",
        format_cost(totals.session),
        format_cost(totals.today)
    );

    if open_after {
        if let Some(path) = outcome.first_path() {
            image::open(path).context("failed to open image")?;
        }
    }
    Ok(())
}
