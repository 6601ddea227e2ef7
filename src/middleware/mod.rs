pub mod auth;
pub mod error_handler;
pub mod rate_limit;
pub mod request_id;

pub use auth::{
    authenticate, hash_secret, verify_secret, ApiKeyRecord, CredentialStore,
    MySqlCredentialStore, OperatorAuth,
};
pub use error_handler::{json_error_handler, path_error_handler, query_error_handler, ErrorHandler};
pub use rate_limit::RateLimiter;
pub use request_id::{RequestId, RequestIdValue};
