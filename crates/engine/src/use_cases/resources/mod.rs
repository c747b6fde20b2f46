//! Resource tracker use cases.

mod error;
mod ops;

pub use error::ResourceError;
pub use ops::ResourceOps;
