//! API server and routes

mod middleware;
pub mod routes;
mod server;

pub use server::{ApiServer, build_router};
