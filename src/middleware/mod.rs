pub mod auth;
pub mod response;
pub mod security;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use security::{security_headers, strip_csp_from_proxied, weak_etag, Proxied};
