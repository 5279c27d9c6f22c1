//! Repository trait definitions.

pub mod avatars;
pub mod plans;

pub use avatars::AvatarRepo;
pub use plans::PlanRepo;
