mod routes;
pub mod service;

pub use routes::routes;
pub use service::QuizService;
