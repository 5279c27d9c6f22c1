//! Client for the external rigging inference collaborator.
//!
//! The collaborator receives the source model plus its structural analysis
//! and the tier limits to rig under, and returns the rigged container with
//! skeleton metadata. `RigEngine` is the seam the pipeline depends on;
//! `HttpRigEngine` is the production implementation, and tests substitute
//! scriptable engines.

pub mod error;
pub mod http;
pub mod traits;

pub use error::{InferenceError, InferenceResult};
pub use http::HttpRigEngine;
pub use traits::{RigEngine, RigJob, RiggedModel};
