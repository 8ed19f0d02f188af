pub mod default;
pub mod traits;
