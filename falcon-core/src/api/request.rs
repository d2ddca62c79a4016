//! Request types and pure body builders.

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::models::{self, AspectRatio, ModelConfig, Resolution};

/// Aspect used when a generate request leaves it unset.
pub const DEFAULT_ASPECT: AspectRatio = AspectRatio::Story;
pub const DEFAULT_RESOLUTION: Resolution = Resolution::TwoK;
pub const DEFAULT_UPSCALER: &str = "clarity";
pub const DEFAULT_BACKGROUND_REMOVER: &str = "rmbg";
pub const DEFAULT_SCALE: u32 = 2;

/// A prepared POST: endpoint path relative to the API host, plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub path: String,
    pub body: Value,
}

/// Text-to-image or edit request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: String,
    pub aspect: Option<AspectRatio>,
    pub resolution: Option<Resolution>,
    pub num_images: Option<u32>,
    /// Source image (URL or data URL); switches to the `/edit` endpoint
    pub edit_image: Option<String>,
    pub transparent: bool,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            aspect: None,
            resolution: None,
            num_images: None,
            edit_image: None,
            transparent: false,
        }
    }

    /// Build the endpoint path and body for this request.
    pub fn prepare(&self) -> Result<Prepared> {
        let model = models::get(&self.model)?;
        if !model.is_generation() {
            return Err(Error::InvalidModel {
                model: self.model.clone(),
                purpose: "generation",
            });
        }
        let caps = model.capabilities;
        let aspect = self.aspect.unwrap_or(DEFAULT_ASPECT);
        let resolution = self.resolution.unwrap_or(DEFAULT_RESOLUTION);

        let mut body = Map::new();
        body.insert("prompt".into(), json!(self.prompt));

        if caps.explicit_size {
            body.insert("image_size".into(), json!(models::aspect_to_size(aspect)));
            insert_defaults(&mut body, model);
            if self.transparent {
                if caps.supports_transparency {
                    body.insert("background".into(), json!("transparent"));
                    body.insert("output_format".into(), json!("png"));
                } else {
                    tracing::debug!(model = model.id, "Transparency not supported, ignoring");
                }
            }
        } else {
            if caps.supports_aspect {
                body.insert("aspect_ratio".into(), json!(aspect.as_str()));
            }
            if caps.supports_resolution {
                body.insert("resolution".into(), json!(resolution.as_str()));
            }
            insert_defaults(&mut body, model);
            if self.transparent {
                tracing::debug!(model = model.id, "Transparency not supported, ignoring");
            }
        }

        if caps.supports_num_images {
            body.insert("num_images".into(), json!(self.num_images.unwrap_or(1)));
        }

        let mut path = model.endpoint.to_string();
        if let Some(source) = &self.edit_image {
            if !caps.supports_edit {
                return Err(Error::UnsupportedOperation(format!(
                    "Model {} does not support image editing",
                    model.id
                )));
            }
            path.push_str("/edit");
            body.insert("image_urls".into(), json!([source]));
        }

        Ok(Prepared {
            path,
            body: Value::Object(body),
        })
    }
}

/// Upscale request.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleRequest {
    /// Image URL or data URL
    pub image_url: String,
    pub model: String,
    pub scale_factor: u32,
    pub creativity: f64,
}

impl UpscaleRequest {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            model: DEFAULT_UPSCALER.to_string(),
            scale_factor: DEFAULT_SCALE,
            creativity: 0.0,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn scale(mut self, scale_factor: u32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn prepare(&self) -> Result<Prepared> {
        let model = utility_model(&self.model, "upscale")?;

        let mut body = Map::new();
        body.insert("image_url".into(), json!(self.image_url));
        if model.capabilities.supports_scale_controls {
            body.insert("scale_factor".into(), json!(self.scale_factor));
            body.insert("creativity".into(), json!(self.creativity));
        }

        Ok(Prepared {
            path: model.endpoint.to_string(),
            body: Value::Object(body),
        })
    }
}

/// Background-removal request.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveBackgroundRequest {
    pub image_url: String,
    pub model: String,
}

impl RemoveBackgroundRequest {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            model: DEFAULT_BACKGROUND_REMOVER.to_string(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn prepare(&self) -> Result<Prepared> {
        let model = utility_model(&self.model, "background removal")?;
        Ok(Prepared {
            path: model.endpoint.to_string(),
            body: json!({ "image_url": self.image_url }),
        })
    }
}

fn insert_defaults(body: &mut Map<String, Value>, model: &ModelConfig) {
    for (key, value) in model.default_params {
        body.insert((*key).to_string(), json!(value));
    }
}

fn utility_model(id: &str, purpose: &'static str) -> Result<&'static ModelConfig> {
    match models::find(id) {
        Some(model) if model.is_utility() => Ok(model),
        _ => Err(Error::InvalidModel {
            model: id.to_string(),
            purpose,
        }),
    }
}
