//! Service layer: license store, session manager and quota engine.

pub mod license;
pub mod quota;
pub mod session;

pub use license::License;
pub use quota::Quota;
pub use session::Session;
