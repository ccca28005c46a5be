// Request middleware - viewer resolution and host filtering

pub mod allowed_hosts;
pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use allowed_hosts::*;
pub use viewer_context_extractor::Vc;
pub use viewer_context_middleware::*;
