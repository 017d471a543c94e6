//! Authentication module
//!
//! Password hashing, access-token signing, refresh-token identifiers and the
//! per-call authentication gate.

mod authenticator;
mod claims;
mod jwt;
mod password;
mod refresh_token;

pub use authenticator::bearer_token;
pub use authenticator::{AuthContext, RequestAuthenticator};
pub use claims::Claims;
pub use jwt::{JwtSigner, TokenSigner};
pub use password::{BcryptHasher, HashError, PasswordHasher, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
pub use refresh_token::generate_refresh_token;
pub use refresh_token::hash_token;
