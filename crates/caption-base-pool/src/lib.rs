mod context;
mod error;
mod notification;
mod pool;
mod state;

pub use context::CaptionBaseCtx;
pub use error::StartRunError;
pub use notification::{CaptionNotification, CaptionStatus};
pub use pool::CaptionPool;
pub use state::{CaptionFailure, CaptionJobState, RunPhase};
