mod buffer;
mod error;
mod library;
mod normalize;
mod sidecar;
mod target;

pub use buffer::*;
pub use error::*;
pub use library::*;
pub use normalize::*;
pub use sidecar::*;
pub use target::*;
