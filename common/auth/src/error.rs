use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token missing kid header")]
    MissingKeyId,
    #[error("no verification key registered for kid '{0}'")]
    UnknownKeyId(String),
    #[error("token verification failed: {0}")]
    Verification(String),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("failed to parse RSA key material: {0}")]
    KeyParse(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::Verification(value.to_string())
    }
}
