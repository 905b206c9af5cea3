//! Queue module - admission control for generation requests

pub mod admission;
