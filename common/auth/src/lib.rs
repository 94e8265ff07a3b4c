pub mod authenticator;
pub mod claims;
pub mod error;
pub mod keys;
pub mod roles;

pub use authenticator::Authenticator;
pub use claims::Claims;
pub use error::{AuthError, AuthResult};
pub use keys::{key_pair_from_private_pem, KeyLookup, SingleKeyStore};
pub use roles::{ROLE_ADMIN, ROLE_USER};
