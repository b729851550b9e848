//! SeaORM entity definitions

pub mod license;
pub mod session;

pub use license::{Status, Tier};
