pub mod handler;
pub mod renderer;

pub use handler::*;
pub use renderer::*;
