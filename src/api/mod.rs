pub mod filter;
pub mod health;
pub mod instances;
pub mod routes;
pub mod stats;

pub use routes::create_router;
