//! HTTP middleware

mod jwt_middleware;

pub use jwt_middleware::RequireAuth;
