//! # falcon-core
//!
//! Core library for falcon - a fal.ai image generation client.
//!
//! This library provides:
//! - The model registry (capabilities, aspect ratios, pricing)
//! - An HTTP gateway for the fal.ai generation, upscale and background-removal endpoints
//! - The local persistence store for configuration and generation history
//! - Image file helpers and the job runners shared by the CLI and the studio
//! - Logging infrastructure
//!
//! ## Files
//!
//! - **Config:** `~/.falcon/config.json`, overridden field-by-field by `./.falconrc`
//! - **History:** `~/.falcon/history.json` (oldest generation first, capped at 100)
//! - **Logs:** `~/.falcon/logs/`
//!
//! ## Example
//!
//! ```rust,no_run
//! use falcon_core::{config, FalClient, Store};
//!
//! # async fn run() -> falcon_core::Result<()> {
//! let store = Store::open_default()?;
//! let config = store.load_config();
//! let client = FalClient::new(config::resolve_api_key(None, &config)?)?;
//! let last = store.last_generation();
//! # let _ = (client, last);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use api::{FalClient, FalImage, FalResponse};
pub use config::FalconConfig;
pub use error::{Error, Result};
pub use models::{AspectRatio, ModelConfig, ModelKind, Resolution};
pub use store::Store;
pub use types::*;

// Public modules
pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod image;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod store;
pub mod types;
