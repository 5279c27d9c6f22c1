//! Common test utilities and fixtures.

pub mod fixtures;
pub mod inference;
pub mod server;
pub mod storage;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use inference::*;
#[allow(unused_imports)]
pub use server::*;
#[allow(unused_imports)]
pub use storage::*;
