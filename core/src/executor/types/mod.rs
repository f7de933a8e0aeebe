pub mod config;
pub mod phase;
pub mod result;

pub use config::*;
pub use phase::*;
pub use result::*;
