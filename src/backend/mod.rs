//! Backend module - Adapter traits, engine client, adapters and registry

pub mod adapter;
pub mod geometry;
pub mod http_engine;
pub mod lightweight;
pub mod registry;
pub mod texture;
pub mod traits;
