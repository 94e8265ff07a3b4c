use std::sync::Arc;

use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::debug;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::keys::{KeyLookup, SingleKeyStore};

/// Issues and verifies RS256 signed tokens.
///
/// Key material is immutable after construction, so a single instance is
/// shared across request workers without coordination.
#[derive(Clone)]
pub struct Authenticator {
    key_id: String,
    encoding_key: EncodingKey,
    lookup: Arc<dyn KeyLookup>,
}

impl Authenticator {
    pub fn new(
        key_id: impl Into<String>,
        encoding_key: EncodingKey,
        lookup: Arc<dyn KeyLookup>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            encoding_key,
            lookup,
        }
    }

    /// Builds an authenticator whose lookup recognizes exactly the key pair
    /// it signs with.
    pub fn with_single_key(
        key_id: impl Into<String>,
        encoding_key: EncodingKey,
        decoding_key: DecodingKey,
    ) -> Self {
        let key_id = key_id.into();
        let store = SingleKeyStore::new(key_id.clone(), decoding_key);
        Self::new(key_id, encoding_key, Arc::new(store))
    }

    /// Signs `claims` into a compact token carrying the configured key
    /// identifier in its header. Fails only on internal signing errors.
    pub fn generate_token(&self, claims: &Claims) -> AuthResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());
        encode(&header, claims, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    /// Verifies `token` and decodes its payload.
    ///
    /// Resolves the verification key by the token's `kid` header, checks the
    /// signature and expiry, and rejects anything malformed. Callers treat
    /// every failure the same way; none of the variants is client-visible.
    pub fn parse_claims(&self, token: &str) -> AuthResult<Claims> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.lookup.public_key(&kid)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &key, &validation)?;
        debug!(kid, "verified token");
        Ok(token_data.claims)
    }
}
