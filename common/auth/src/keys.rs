use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

use crate::error::{AuthError, AuthResult};

/// Resolves the public verification key registered for a token's `kid`
/// header. Lookup must fail for unrecognized identifiers, never fall back
/// to a default key.
pub trait KeyLookup: Send + Sync {
    fn public_key(&self, kid: &str) -> AuthResult<DecodingKey>;
}

/// Key store holding exactly one active verification key.
///
/// Key material is loaded once at process start and never rotated in-process.
/// Multi-key rotation slots in behind [`KeyLookup`] without touching callers.
#[derive(Clone)]
pub struct SingleKeyStore {
    key_id: String,
    key: DecodingKey,
}

impl SingleKeyStore {
    pub fn new(key_id: impl Into<String>, key: DecodingKey) -> Self {
        Self {
            key_id: key_id.into(),
            key,
        }
    }
}

impl KeyLookup for SingleKeyStore {
    fn public_key(&self, kid: &str) -> AuthResult<DecodingKey> {
        if kid == self.key_id {
            Ok(self.key.clone())
        } else {
            Err(AuthError::UnknownKeyId(kid.to_string()))
        }
    }
}

/// Derives the signing and verification keys from a single RSA private key
/// in PEM form. Accepts both PKCS#8 and PKCS#1 encodings.
pub fn key_pair_from_private_pem(pem: &str) -> AuthResult<(EncodingKey, DecodingKey)> {
    let encoding = EncodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|err| AuthError::KeyParse(err.to_string()))?;

    let private = RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|err| AuthError::KeyParse(err.to_string()))?;
    let public_pem = private
        .to_public_key()
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|err| AuthError::KeyParse(err.to_string()))?;
    let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())
        .map_err(|err| AuthError::KeyParse(err.to_string()))?;

    Ok((encoding, decoding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1::EncodeRsaPrivateKey;
    use rsa::pkcs8::EncodePrivateKey;
    use rsa::rand_core::OsRng;

    #[test]
    fn single_key_store_resolves_only_its_own_kid() {
        let store = SingleKeyStore::new("1", DecodingKey::from_secret(b"secret"));

        assert!(store.public_key("1").is_ok());
        let err = store
            .public_key("2")
            .map(|_| ())
            .expect_err("lookup should fail");
        match err {
            AuthError::UnknownKeyId(kid) => assert_eq!(kid, "2"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn key_pair_parses_pkcs8_and_pkcs1_pems() {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");

        let pkcs8 = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .expect("pkcs8 pem");
        let pkcs1 = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("pkcs1 pem");

        assert!(key_pair_from_private_pem(&pkcs8).is_ok());
        assert!(key_pair_from_private_pem(&pkcs1).is_ok());
    }

    #[test]
    fn key_pair_rejects_garbage_pem() {
        let err = key_pair_from_private_pem("not a pem")
            .map(|_| ())
            .expect_err("parse should fail");
        match err {
            AuthError::KeyParse(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
