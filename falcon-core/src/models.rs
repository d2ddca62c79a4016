//! Model registry
//!
//! A static table of the hosted models falcon can drive, keyed by a short id.
//! Request shaping is data: each model carries capability flags that the
//! gateway branches on, rather than per-model code paths.
//!
//! | Term | Definition |
//! |------|------------|
//! | **Generation model** | Synthesizes new images from a prompt (optionally editing a source) |
//! | **Utility model** | Post-processes an existing image (upscale, background removal) |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================
// Aspect ratio / resolution
// ============================================

/// Supported aspect ratios, serialized as `"W:H"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "21:9")]
    Ultrawide,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "3:2")]
    Photo,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "5:4")]
    Large,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    Feed,
    #[serde(rename = "3:4")]
    ClassicPortrait,
    #[serde(rename = "2:3")]
    PhotoPortrait,
    #[serde(rename = "9:16")]
    Story,
}

/// Aspect ratios ordered by popularity: square first, then common ratios.
pub const ASPECT_RATIOS: [AspectRatio; 10] = [
    AspectRatio::Square,
    AspectRatio::Classic,
    AspectRatio::ClassicPortrait,
    AspectRatio::Widescreen,
    AspectRatio::Story,
    AspectRatio::Photo,
    AspectRatio::PhotoPortrait,
    AspectRatio::Feed,
    AspectRatio::Large,
    AspectRatio::Ultrawide,
];

impl AspectRatio {
    /// The `"W:H"` form used on the wire and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Ultrawide => "21:9",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Photo => "3:2",
            AspectRatio::Classic => "4:3",
            AspectRatio::Large => "5:4",
            AspectRatio::Square => "1:1",
            AspectRatio::Feed => "4:5",
            AspectRatio::ClassicPortrait => "3:4",
            AspectRatio::PhotoPortrait => "2:3",
            AspectRatio::Story => "9:16",
        }
    }

    /// Taller than wide.
    pub fn is_portrait(&self) -> bool {
        matches!(
            self,
            AspectRatio::Story
                | AspectRatio::PhotoPortrait
                | AspectRatio::Feed
                | AspectRatio::ClassicPortrait
        )
    }

    /// Wider than tall.
    pub fn is_landscape(&self) -> bool {
        !self.is_portrait() && *self != AspectRatio::Square
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ASPECT_RATIOS
            .iter()
            .copied()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Invalid aspect ratio: {} (expected one of {})",
                    s,
                    ASPECT_RATIOS.map(|a| a.as_str()).join(", ")
                ))
            })
    }
}

/// Output resolution class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

pub const RESOLUTIONS: [Resolution; 3] = [Resolution::OneK, Resolution::TwoK, Resolution::FourK];

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::OneK => "1K",
            Resolution::TwoK => "2K",
            Resolution::FourK => "4K",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RESOLUTIONS
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::Validation(format!("Invalid resolution: {} (expected 1K, 2K or 4K)", s))
            })
    }
}

/// Map an aspect ratio to the nearest discrete `image_size` for models that
/// lack arbitrary-aspect support.
pub fn aspect_to_size(aspect: AspectRatio) -> &'static str {
    if aspect.is_portrait() {
        "1024x1536"
    } else if aspect.is_landscape() {
        "1536x1024"
    } else {
        "1024x1024"
    }
}

// ============================================
// Model table
// ============================================

/// Whether a model synthesizes images or post-processes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Generation,
    Utility(UtilityRole),
}

/// What a utility model is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilityRole {
    Upscale,
    BackgroundRemoval,
}

/// Per-image price descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pricing {
    /// Same price at every resolution
    Flat(f64),
    /// Standard price, with a separate 4K price
    ByResolution { standard: f64, four_k: f64 },
}

impl Pricing {
    fn per_image(&self, resolution: Option<Resolution>) -> f64 {
        match *self {
            Pricing::Flat(price) => price,
            Pricing::ByResolution { standard, four_k } => {
                if resolution == Some(Resolution::FourK) {
                    four_k
                } else {
                    standard
                }
            }
        }
    }
}

/// Capability flags the gateway branches on when building a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Accepts `aspect_ratio`
    pub supports_aspect: bool,
    /// Accepts `resolution`
    pub supports_resolution: bool,
    /// Has an `/edit` endpoint variant taking `image_urls`
    pub supports_edit: bool,
    /// Accepts `num_images`
    pub supports_num_images: bool,
    /// Takes a discrete `image_size` derived from the aspect ratio instead
    pub explicit_size: bool,
    /// Can render a transparent PNG background
    pub supports_transparency: bool,
    /// Upscaler accepts `scale_factor` and `creativity`
    pub supports_scale_controls: bool,
}

/// Static description of a hosted model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Short id used in config, flags and history
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Endpoint path relative to the API host
    pub endpoint: &'static str,
    pub kind: ModelKind,
    /// Human-readable price range shown in menus
    pub pricing_label: &'static str,
    pub pricing: Pricing,
    pub capabilities: Capabilities,
    /// Fixed parameters always sent with generation requests
    pub default_params: &'static [(&'static str, &'static str)],
}

impl ModelConfig {
    pub fn is_generation(&self) -> bool {
        self.kind == ModelKind::Generation
    }

    pub fn is_utility(&self) -> bool {
        matches!(self.kind, ModelKind::Utility(_))
    }

    /// Whether the user picks an aspect ratio for this model at all.
    pub fn uses_aspect(&self) -> bool {
        self.capabilities.supports_aspect || self.capabilities.explicit_size
    }
}

const UTILITY: Capabilities = Capabilities {
    supports_aspect: false,
    supports_resolution: false,
    supports_edit: false,
    supports_num_images: false,
    explicit_size: false,
    supports_transparency: false,
    supports_scale_controls: false,
};

/// Every model falcon knows about. Generation models come first.
pub static MODELS: &[ModelConfig] = &[
    ModelConfig {
        id: "gpt",
        name: "GPT Image 1.5",
        endpoint: "fal-ai/gpt-image-1.5",
        kind: ModelKind::Generation,
        pricing_label: "$0.01-$0.20/image",
        // High quality default
        pricing: Pricing::Flat(0.13),
        capabilities: Capabilities {
            supports_aspect: false,
            supports_resolution: false,
            supports_edit: true,
            supports_num_images: true,
            explicit_size: true,
            supports_transparency: true,
            supports_scale_controls: false,
        },
        default_params: &[("quality", "high")],
    },
    ModelConfig {
        id: "banana",
        name: "Nano Banana Pro",
        endpoint: "fal-ai/nano-banana-pro",
        kind: ModelKind::Generation,
        pricing_label: "$0.15-$0.30/image",
        pricing: Pricing::ByResolution {
            standard: 0.15,
            four_k: 0.30,
        },
        capabilities: Capabilities {
            supports_aspect: true,
            supports_resolution: true,
            supports_edit: true,
            supports_num_images: true,
            ..UTILITY
        },
        default_params: &[],
    },
    ModelConfig {
        id: "gemini",
        name: "Gemini 2.5 Flash",
        endpoint: "fal-ai/gemini-25-flash-image",
        kind: ModelKind::Generation,
        pricing_label: "$0.039/image",
        pricing: Pricing::Flat(0.039),
        capabilities: Capabilities {
            supports_aspect: true,
            supports_edit: true,
            supports_num_images: true,
            ..UTILITY
        },
        default_params: &[],
    },
    ModelConfig {
        id: "gemini3",
        name: "Gemini 3 Pro",
        endpoint: "fal-ai/gemini-3-pro-image-preview",
        kind: ModelKind::Generation,
        pricing_label: "$0.15-$0.30/image",
        pricing: Pricing::ByResolution {
            standard: 0.15,
            four_k: 0.30,
        },
        capabilities: Capabilities {
            supports_aspect: true,
            supports_resolution: true,
            supports_edit: true,
            supports_num_images: true,
            ..UTILITY
        },
        default_params: &[],
    },
    ModelConfig {
        id: "clarity",
        name: "Clarity Upscaler",
        endpoint: "fal-ai/clarity-upscaler",
        kind: ModelKind::Utility(UtilityRole::Upscale),
        pricing_label: "~$0.02/image",
        pricing: Pricing::Flat(0.02),
        capabilities: UTILITY,
        default_params: &[],
    },
    ModelConfig {
        id: "crystal",
        name: "Crystal Upscaler",
        endpoint: "clarityai/crystal-upscaler",
        kind: ModelKind::Utility(UtilityRole::Upscale),
        pricing_label: "$0.016/megapixel",
        pricing: Pricing::Flat(0.02),
        capabilities: Capabilities {
            supports_scale_controls: true,
            ..UTILITY
        },
        default_params: &[],
    },
    ModelConfig {
        id: "rmbg",
        name: "BiRefNet (Background Removal)",
        endpoint: "fal-ai/birefnet",
        kind: ModelKind::Utility(UtilityRole::BackgroundRemoval),
        pricing_label: "~$0.02/image",
        pricing: Pricing::Flat(0.02),
        capabilities: UTILITY,
        default_params: &[],
    },
    ModelConfig {
        id: "bria",
        name: "Bria RMBG 2.0",
        endpoint: "fal-ai/bria/background/remove",
        kind: ModelKind::Utility(UtilityRole::BackgroundRemoval),
        pricing_label: "$0.018/image",
        pricing: Pricing::Flat(0.02),
        capabilities: UTILITY,
        default_params: &[],
    },
];

/// Look up a model by id.
pub fn get(id: &str) -> Result<&'static ModelConfig> {
    find(id).ok_or_else(|| Error::UnknownModel(id.to_string()))
}

/// Look up a model by id, returning `None` when absent.
pub fn find(id: &str) -> Option<&'static ModelConfig> {
    MODELS.iter().find(|m| m.id == id)
}

/// Display name for an id, falling back to the id itself.
pub fn display_name(id: &str) -> &str {
    find(id).map(|m| m.name).unwrap_or(id)
}

/// Ids of models that synthesize images.
pub fn generation_models() -> Vec<&'static str> {
    MODELS
        .iter()
        .filter(|m| m.is_generation())
        .map(|m| m.id)
        .collect()
}

/// Ids of post-processing models.
pub fn utility_models() -> Vec<&'static str> {
    MODELS.iter().filter(|m| m.is_utility()).map(|m| m.id).collect()
}

/// Ids of upscalers.
pub fn upscalers() -> Vec<&'static str> {
    by_role(UtilityRole::Upscale)
}

/// Ids of background removers.
pub fn background_removers() -> Vec<&'static str> {
    by_role(UtilityRole::BackgroundRemoval)
}

fn by_role(role: UtilityRole) -> Vec<&'static str> {
    MODELS
        .iter()
        .filter(|m| m.kind == ModelKind::Utility(role))
        .map(|m| m.id)
        .collect()
}

/// Estimate the cost of a request. Unknown ids cost nothing rather than failing.
pub fn estimate_cost(model: &str, resolution: Option<Resolution>, num_images: u32) -> f64 {
    match find(model) {
        Some(config) => config.pricing.per_image(resolution) * f64::from(num_images),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        assert_eq!(get("banana").unwrap().name, "Nano Banana Pro");
        assert!(matches!(get("dalle"), Err(Error::UnknownModel(id)) if id == "dalle"));
    }

    #[test]
    fn test_model_lists() {
        assert_eq!(generation_models(), vec!["gpt", "banana", "gemini", "gemini3"]);
        assert_eq!(utility_models(), vec!["clarity", "crystal", "rmbg", "bria"]);
        assert_eq!(upscalers(), vec!["clarity", "crystal"]);
        assert_eq!(background_removers(), vec!["rmbg", "bria"]);
    }

    #[test]
    fn test_cost_scales_linearly_with_count() {
        for model in MODELS {
            for res in RESOLUTIONS {
                let single = estimate_cost(model.id, Some(res), 1);
                for n in 1..=4 {
                    let many = estimate_cost(model.id, Some(res), n);
                    assert!(
                        (many - single * f64::from(n)).abs() < 1e-12,
                        "{} {} x{}",
                        model.id,
                        res,
                        n
                    );
                }
            }
        }
    }

    #[test]
    fn test_cost_by_resolution() {
        assert_eq!(estimate_cost("banana", Some(Resolution::TwoK), 1), 0.15);
        assert_eq!(estimate_cost("banana", Some(Resolution::FourK), 1), 0.30);
        assert_eq!(estimate_cost("gemini3", None, 2), 0.30);
        assert_eq!(estimate_cost("gpt", Some(Resolution::FourK), 1), 0.13);
        assert_eq!(estimate_cost("nope", Some(Resolution::OneK), 3), 0.0);
    }

    #[test]
    fn test_aspect_to_size_buckets() {
        for aspect in ASPECT_RATIOS {
            let size = aspect_to_size(aspect);
            if aspect == AspectRatio::Square {
                assert_eq!(size, "1024x1024");
            } else if aspect.is_portrait() {
                assert_eq!(size, "1024x1536", "{}", aspect);
            } else {
                assert_eq!(size, "1536x1024", "{}", aspect);
            }
        }
        assert_eq!(aspect_to_size(AspectRatio::Story), "1024x1536");
        assert_eq!(aspect_to_size(AspectRatio::Ultrawide), "1536x1024");
    }

    #[test]
    fn test_parse_aspect_and_resolution() {
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::Story);
        assert!("7:3".parse::<AspectRatio>().is_err());
        assert_eq!("4k".parse::<Resolution>().unwrap(), Resolution::FourK);
        assert!("8K".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_aspect_serializes_as_ratio_string() {
        let json = serde_json::to_string(&AspectRatio::Widescreen).unwrap();
        assert_eq!(json, "\"16:9\"");
        let res: Resolution = serde_json::from_str("\"2K\"").unwrap();
        assert_eq!(res, Resolution::TwoK);
    }
}
