pub mod access;

pub use access::{access_middleware, session_token, CurrentSession};
