//! Out-of-process Together backend.
//!
//! The child side lives in `plugins/together/together_chat.py`.

mod error;
mod runner;

pub use error::RunnerError;
pub use runner::TogetherRunner;
