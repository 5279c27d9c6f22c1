//! Core domain types and shared logic for the armature rigging service.
//!
//! This crate defines the canonical data model used across all other crates:
//! - GLB container analysis
//! - Subscription tier policy snapshots
//! - Rig session identifiers and pipeline state
//! - Temporary and persisted avatar records
//! - HTTP request/response bodies
//! - Application configuration

pub mod api;
pub mod avatar;
pub mod config;
pub mod error;
pub mod glb;
pub mod session;
pub mod tier;

pub use avatar::{PersistedAvatar, TempAvatarRecord};
pub use error::{Error, Result};
pub use glb::{GlbAnalysis, analyze, extract_embedded_image};
pub use session::{RigOutcome, RigState, SessionId};
pub use tier::{TierConfig, TrackingPrecision};

/// Hard ceiling for model uploads, independent of subscription tier: 100 MiB.
pub const MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// Default time-to-live for cached rig artifacts: 1 hour.
pub const DEFAULT_RIG_TTL_SECS: u64 = 3600;

/// Canonical content type for GLB payloads.
pub const GLB_CONTENT_TYPE: &str = "model/gltf-binary";

/// Thumbnail reference recorded when no image could be derived from a model.
pub const PLACEHOLDER_THUMBNAIL: &str = "placeholder://avatar-thumbnail";
