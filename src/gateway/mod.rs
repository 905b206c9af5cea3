//! Gateway module - request handling and backend routing

pub mod request_gateway;
pub mod router;
