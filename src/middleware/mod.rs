/// Middleware module
///
/// Custom middleware for session authorization and CORS.

mod authorize_middleware;
mod cors;

pub use authorize_middleware::Authorize;
pub use cors::Cors;
