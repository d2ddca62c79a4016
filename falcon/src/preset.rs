//! Named aspect/resolution bundles.

use falcon_core::{AspectRatio, Resolution};

/// A named bundle applied in one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    /// Flag name without the leading `--`
    pub name: &'static str,
    pub description: &'static str,
    pub aspect: AspectRatio,
    /// Only set when the preset pins a resolution
    pub resolution: Option<Resolution>,
}

/// Every preset, in the priority order used when several flags are given.
pub const PRESETS: &[Preset] = &[
    Preset {
        name: "cover",
        description: "Kindle/eBook cover",
        aspect: AspectRatio::PhotoPortrait,
        resolution: Some(Resolution::TwoK),
    },
    Preset {
        name: "story",
        description: "Instagram/TikTok Story",
        aspect: AspectRatio::Story,
        resolution: None,
    },
    Preset {
        name: "reel",
        description: "Instagram Reel",
        aspect: AspectRatio::Story,
        resolution: None,
    },
    Preset {
        name: "feed",
        description: "Instagram Feed portrait",
        aspect: AspectRatio::Feed,
        resolution: None,
    },
    Preset {
        name: "og",
        description: "Open Graph / social share",
        aspect: AspectRatio::Widescreen,
        resolution: None,
    },
    Preset {
        name: "wallpaper",
        description: "Phone wallpaper",
        aspect: AspectRatio::Story,
        resolution: Some(Resolution::TwoK),
    },
    Preset {
        name: "ultra",
        description: "Ultra-wide banner",
        aspect: AspectRatio::Ultrawide,
        resolution: Some(Resolution::TwoK),
    },
    Preset {
        name: "wide",
        description: "Cinematic wide",
        aspect: AspectRatio::Ultrawide,
        resolution: None,
    },
    Preset {
        name: "square",
        description: "Square",
        aspect: AspectRatio::Square,
        resolution: None,
    },
    Preset {
        name: "landscape",
        description: "Landscape",
        aspect: AspectRatio::Widescreen,
        resolution: None,
    },
    Preset {
        name: "portrait",
        description: "Portrait",
        aspect: AspectRatio::PhotoPortrait,
        resolution: None,
    },
];

/// The highest-priority preset among `enabled` names.
pub fn pick<'a>(enabled: impl IntoIterator<Item = &'a str>) -> Option<&'static Preset> {
    let enabled: Vec<&str> = enabled.into_iter().collect();
    PRESETS.iter().find(|p| enabled.contains(&p.name))
}

impl Preset {
    /// Apply to an aspect/resolution pair.
    pub fn apply(&self, aspect: &mut AspectRatio, resolution: &mut Resolution) {
        *aspect = self.aspect;
        if let Some(res) = self.resolution {
            *resolution = res;
        }
    }

    /// `2:3, 2K` style summary for menus and help.
    pub fn summary(&self) -> String {
        match self.resolution {
            Some(res) => format!("{}, {}", self.aspect, res),
            None => self.aspect.to_string(),
        }
    }
}
