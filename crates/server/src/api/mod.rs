pub mod handlers;
pub mod merge;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
