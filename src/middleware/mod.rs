pub mod auth;
pub mod csrf;
pub mod request_id;

pub use auth::AuthUser;
pub use csrf::{csrf_protection, CsrfPolicy};
pub use request_id::{request_id, RequestId};
