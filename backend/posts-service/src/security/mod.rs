/// Account security helpers
///
/// - `password`: Argon2id hashing for stored credentials
/// - `session`: HS256-signed session tokens carried in a cookie
pub mod password;
pub mod session;

pub use password::{hash_password, verify_password};
pub use session::{SessionClaims, SessionTokens};
