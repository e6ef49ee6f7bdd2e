pub mod engine;
mod routes;

pub use engine::ProgressEngine;
pub use routes::routes;
