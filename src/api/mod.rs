pub mod auth;
pub mod http;

pub use auth::{AuthApi, AuthResponse};
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
