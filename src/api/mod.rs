pub mod dashboard;
pub mod routes;

pub use routes::create_router;
