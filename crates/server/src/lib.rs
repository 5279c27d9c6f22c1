//! HTTP surface and rig pipeline for the armature service.
//!
//! Wires the domain crates together: uploads spool through the temp store,
//! rig attempts run through the inference engine into the preview cache,
//! and saves finalize cached rigs into object storage plus the metadata
//! store.

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod sweep;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
