mod error;
mod traits;

pub mod llm;
pub mod models;
pub mod utils;

pub use error::*;
pub use traits::*;
