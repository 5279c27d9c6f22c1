//! Ephemeral rig-session state for the armature service.
//!
//! Two stores live here:
//!
//! - [`RigCache`]: session-keyed rigged artifacts, memory-first with a
//!   per-entry disk mirror (binary plus JSON sidecar) so entries survive
//!   a restart. Expired entries are reaped by a periodic sweep.
//! - [`TempAvatarStore`]: uploads that were analyzed but not yet rigged,
//!   purely in-memory.
//!
//! Neither store is durable storage. Durability happens only when an
//! avatar is saved, through the object store and metadata crates.

pub mod entry;
pub mod error;
pub mod rig;
pub mod temp;

pub use entry::{CachedRig, RigSidecar};
pub use error::{CacheError, CacheResult};
pub use rig::RigCache;
pub use temp::TempAvatarStore;
