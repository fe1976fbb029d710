//! # rr-auth-jwt
//!
//! HS256 JSON Web Token implementation of `AuthProvider`.
//! The `sub` claim carries the user id; `exp` is enforced with no leeway.

use std::time::Duration;

use jsonwebtoken::{decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rr_core::traits::AuthProvider;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("token secret must not be empty")]
    EmptySecret,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    iat: u64,
    exp: u64,
}

pub struct JwtAuthProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtAuthProvider {
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self, AuthError> {
        let secret = secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(AuthError::EmptySecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    fn sign(&self, claims: &Claims) -> Option<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| error!("failed to sign token: {e}"))
            .ok()
    }
}

impl AuthProvider for JwtAuthProvider {
    fn verify_token(&self, token: &str) -> Option<Uuid> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims.sub),
            Err(e) => {
                debug!("rejected token: {e}");
                None
            }
        }
    }

    fn issue_token(&self, user_id: Uuid) -> Option<String> {
        let now = get_current_timestamp();
        self.sign(&Claims {
            sub: user_id,
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
        })
    }
}
