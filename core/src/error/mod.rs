#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;
pub mod handler;

pub use error::CliError;
pub use executor::ExecutorError;
pub use handler::{ContextError, HandlerError};
