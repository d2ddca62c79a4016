//! Job runners shared by the CLI and the studio
//!
//! Each runner performs one remote operation end to end: prepare the source
//! image, call the gateway, download every result, and record one
//! [`Generation`] per saved file.

use std::path::{Path, PathBuf};

use crate::api::{FalClient, FalImage, GenerateRequest, RemoveBackgroundRequest, UpscaleRequest};
use crate::error::{Error, Result};
use crate::image::{self, Dimensions};
use crate::models::{self, AspectRatio, Resolution};
use crate::store::Store;
use crate::types::{Generation, History};

/// Longest side of an edit source before upload.
pub const EDIT_MAX_SIZE: u32 = 1024;

/// Maximum images per generate request.
pub const MAX_IMAGES: u32 = 4;

/// Largest upscale factor offered.
pub const MAX_SCALE: u32 = 8;

/// Generate new images, or edit `edit_source` when set.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateJob {
    pub prompt: String,
    pub model: String,
    pub aspect: AspectRatio,
    pub resolution: Resolution,
    /// Clamped to 1..=4
    pub num_images: u32,
    pub edit_source: Option<PathBuf>,
    pub transparent: bool,
    /// Output path; numbered `-1`, `-2`, ... when more than one image is requested
    pub output: PathBuf,
}

/// Upscale an existing image.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleJob {
    pub source: PathBuf,
    /// Prompt of the source generation, if known
    pub source_prompt: Option<String>,
    pub aspect: AspectRatio,
    pub resolution: Resolution,
    pub model: String,
    pub scale: u32,
    /// Defaults to `<source>-up<scale>x.png`
    pub output: Option<PathBuf>,
}

/// Remove the background of an existing image.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundJob {
    pub source: PathBuf,
    pub source_prompt: Option<String>,
    pub aspect: AspectRatio,
    pub resolution: Resolution,
    pub model: String,
    /// Defaults to `<source>-nobg.png`
    pub output: Option<PathBuf>,
}

impl UpscaleJob {
    /// Upscale a recorded generation, keeping its metadata.
    pub fn from_generation(generation: &Generation, model: impl Into<String>, scale: u32) -> Self {
        Self {
            source: generation.output.clone(),
            source_prompt: Some(generation.prompt.clone()),
            aspect: generation.aspect,
            resolution: generation.resolution,
            model: model.into(),
            scale,
            output: None,
        }
    }

    pub fn label(&self) -> String {
        format!("[upscale {}x] {}", self.scale, source_label(&self.source, &self.source_prompt))
    }
}

impl BackgroundJob {
    pub fn from_generation(generation: &Generation, model: impl Into<String>) -> Self {
        Self {
            source: generation.output.clone(),
            source_prompt: Some(generation.prompt.clone()),
            aspect: generation.aspect,
            resolution: generation.resolution,
            model: model.into(),
            output: None,
        }
    }

    pub fn label(&self) -> String {
        format!("[rmbg] {}", source_label(&self.source, &self.source_prompt))
    }
}

/// Strip derived labels such as `[upscale 2x] ` from a recorded prompt.
pub fn base_prompt(prompt: &str) -> &str {
    let mut rest = prompt.trim_start();
    while rest.starts_with('[') {
        match rest.find("] ") {
            Some(end) => rest = rest[end + 2..].trim_start(),
            None => break,
        }
    }
    rest
}

fn source_label(source: &Path, prompt: &Option<String>) -> String {
    match prompt {
        Some(prompt) => prompt.clone(),
        None => source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

/// One file written by a job.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub dimensions: Option<Dimensions>,
    /// Human-readable file size
    pub size: String,
    pub generation: Generation,
}

/// Everything a job produced, plus the history as saved after the last record.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub images: Vec<SavedImage>,
    pub history: History,
}

impl JobOutcome {
    pub fn first_path(&self) -> Option<&Path> {
        self.images.first().map(|img| img.path.as_path())
    }
}

/// Run a generate (or edit) job.
pub async fn run_generate(client: &FalClient, store: &Store, job: &GenerateJob) -> Result<JobOutcome> {
    let num_images = job.num_images.clamp(1, MAX_IMAGES);
    let mut request = GenerateRequest::new(&job.prompt, &job.model);
    request.aspect = Some(job.aspect);
    request.resolution = Some(job.resolution);
    request.num_images = Some(num_images);
    request.transparent = job.transparent;

    // Surface model errors before touching the source image
    if job.edit_source.is_some() {
        request.edit_image = Some(String::new());
    }
    request.prepare()?;

    let edit_source = match &job.edit_source {
        Some(source) => Some(image::absolute(source)?),
        None => None,
    };
    if let Some(source) = &edit_source {
        request.edit_image = Some(edit_payload(source).await?);
    }

    tracing::info!(model = %job.model, num_images, edit = edit_source.is_some(), "Generating");
    let response = client.generate(&request).await?;
    let images = non_empty(response.images)?;

    let cost = models::estimate_cost(&job.model, Some(job.resolution), 1);
    let mut saved = Vec::with_capacity(images.len());
    let mut history = None;
    for (i, remote) in images.iter().enumerate() {
        let path = if num_images > 1 {
            numbered(&job.output, i + 1)
        } else {
            job.output.clone()
        };
        let mut generation = Generation::new(
            &job.prompt,
            &job.model,
            job.aspect,
            job.resolution,
            PathBuf::new(),
            cost,
        );
        if let Some(source) = &edit_source {
            generation = generation.with_source(source);
        }
        let (image, doc) = save(store, remote, &path, generation).await?;
        saved.push(image);
        history = Some(doc);
    }

    Ok(JobOutcome {
        images: saved,
        history: history.unwrap_or_else(|| store.load_history()),
    })
}

/// Run an upscale job.
pub async fn run_upscale(client: &FalClient, store: &Store, job: &UpscaleJob) -> Result<JobOutcome> {
    let request = UpscaleRequest::new(String::new())
        .model(&job.model)
        .scale(job.scale);
    request.prepare()?;

    let source = image::absolute(&job.source)?;
    let request = UpscaleRequest {
        image_url: image::to_data_url(&source).await?,
        ..request
    };

    tracing::info!(model = %job.model, scale = job.scale, "Upscaling");
    let response = client.upscale(&request).await?;
    let images = non_empty(response.images)?;

    let output = job
        .output
        .clone()
        .unwrap_or_else(|| image::sibling(&source, &format!("-up{}x", job.scale), "png"));
    let generation = Generation::new(
        job.label(),
        &job.model,
        job.aspect,
        job.resolution,
        PathBuf::new(),
        models::estimate_cost(&job.model, None, 1),
    )
    .with_source(&source);

    let (image, history) = save(store, &images[0], &output, generation).await?;
    Ok(JobOutcome {
        images: vec![image],
        history,
    })
}

/// Run a background-removal job.
pub async fn run_remove_background(
    client: &FalClient,
    store: &Store,
    job: &BackgroundJob,
) -> Result<JobOutcome> {
    let request = RemoveBackgroundRequest::new(String::new()).model(&job.model);
    request.prepare()?;

    let source = image::absolute(&job.source)?;
    let request = RemoveBackgroundRequest {
        image_url: image::to_data_url(&source).await?,
        ..request
    };

    tracing::info!(model = %job.model, "Removing background");
    let response = client.remove_background(&request).await?;
    let images = non_empty(response.images)?;

    let output = job
        .output
        .clone()
        .unwrap_or_else(|| image::sibling(&source, "-nobg", "png"));
    let generation = Generation::new(
        job.label(),
        &job.model,
        job.aspect,
        job.resolution,
        PathBuf::new(),
        models::estimate_cost(&job.model, None, 1),
    )
    .with_source(&source);

    let (image, history) = save(store, &images[0], &output, generation).await?;
    Ok(JobOutcome {
        images: vec![image],
        history,
    })
}

/// Resize, encode and clean up an edit source.
async fn edit_payload(source: &Path) -> Result<String> {
    let resized = image::resize(source, EDIT_MAX_SIZE).await;
    let encoded = image::to_data_url(&resized).await;
    if resized != source {
        image::delete_temp_file(&resized);
    }
    encoded
}

fn non_empty(images: Vec<FalImage>) -> Result<Vec<FalImage>> {
    if images.is_empty() {
        return Err(Error::Transport("response contained no images".to_string()));
    }
    Ok(images)
}

/// `out.png` -> `out-2.png`
fn numbered(path: &Path, index: usize) -> PathBuf {
    let ext = image::extension(path).unwrap_or_else(|| "png".to_string());
    image::sibling(path, &format!("-{}", index), &ext)
}

/// Download one result and record it.
async fn save(
    store: &Store,
    remote: &FalImage,
    path: &Path,
    mut generation: Generation,
) -> Result<(SavedImage, History)> {
    image::download(&remote.url, path).await?;
    let path = image::absolute(path)?;

    let dimensions = match (remote.width, remote.height) {
        (Some(width), Some(height)) => Some(Dimensions { width, height }),
        _ => image::dimensions(&path).await,
    };
    let size = image::file_size(&path).await?;

    generation.output = path.clone();
    let history = store.append_generation(generation.clone())?;
    tracing::info!(path = %path.display(), "Saved image");

    Ok((
        SavedImage {
            path,
            dimensions,
            size,
            generation,
        },
        history,
    ))
}
