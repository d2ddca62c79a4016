//! fal.ai HTTP gateway
//!
//! Three operations, each a single JSON POST:
//! - **generate** - text-to-image, or image editing via the model's `/edit` endpoint
//! - **upscale** - utility upscaler models
//! - **remove_background** - utility background-removal models
//!
//! Request bodies are built by pure functions in [`request`] that branch on the
//! model's capability flags; [`FalClient`] only sends them. Validation happens
//! while building, so an invalid request never reaches the network.

mod client;
pub mod request;

use serde::{Deserialize, Serialize};

pub use client::{FalClient, DEFAULT_BASE_URL};
pub use request::{GenerateRequest, RemoveBackgroundRequest, UpscaleRequest};

/// One image in a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalImage {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Successful response body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalResponse {
    pub images: Vec<FalImage>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Bodies that `upscale` and `remove_background` may return with a single
/// `image` instead of an `images` array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ResponseBody {
    Many(FalResponse),
    Single {
        image: FalImage,
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl From<ResponseBody> for FalResponse {
    fn from(body: ResponseBody) -> Self {
        match body {
            ResponseBody::Many(response) => response,
            ResponseBody::Single { image, seed } => FalResponse {
                images: vec![image],
                seed,
                prompt: None,
            },
        }
    }
}
