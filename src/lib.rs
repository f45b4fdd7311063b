// Library surface for the binary, headless integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod record;
pub mod runtime;
pub mod session;
pub mod store;
pub mod template;
pub mod util;

pub use error::{Error, Result, SessionError, StoreError, TemplateError};
pub use record::WorkoutRecord;
pub use session::{initialize, SetValues, WorkoutSessionState};
pub use store::{finish_session, FinishOutcome, SessionStore};
pub use template::{TemplateProvider, WorkoutTemplate};

/// Default interval of the terminal driver's tick source
pub const TICK_RATE_MS: u64 = 1000;
