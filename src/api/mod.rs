//! HTTP API module - routes, handlers and request bodies

pub mod handlers;
pub mod models;
pub mod routes;
