//! HTTP request handlers.

pub mod admin;
pub mod avatars;
pub mod common;
pub mod health;
pub mod rigs;

pub use admin::*;
pub use avatars::*;
pub use health::*;
pub use rigs::*;
