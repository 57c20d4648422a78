use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::OnceLock;
use tracing::error;

use crate::models::{AdminCredential, SessionClaims};

pub use bcrypt::DEFAULT_COST;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

/// Issues and validates HS256 session tokens and checks admin passwords.
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
    cost: u32,
    dummy_hash: OnceLock<String>,
}

/// A freshly issued bearer token.
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

impl Authenticator {
    pub fn new(secret: &[u8], ttl_secs: u64, cost: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
            cost,
            dummy_hash: OnceLock::new(),
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        hash_password(password, self.cost)
    }

    /// Check `password` against a stored hash. With no stored hash (unknown
    /// email) a fixed dummy hash is verified instead so both paths cost the same.
    pub fn check_password(&self, password: &str, stored: Option<&str>) -> bool {
        match stored {
            Some(stored) => verify_password(password, stored).unwrap_or(false),
            None => {
                if let Some(dummy) = self.dummy_hash() {
                    let _ = verify_password(password, dummy);
                }
                false
            }
        }
    }

    /// Cached on first success; a failure is logged and retried on the next login.
    fn dummy_hash(&self) -> Option<&str> {
        if let Some(dummy) = self.dummy_hash.get() {
            return Some(dummy);
        }
        match hash_password("not-a-real-password", self.cost) {
            Ok(dummy) => Some(self.dummy_hash.get_or_init(|| dummy)),
            Err(e) => {
                error!(error = %e, "cannot hash dummy password, unknown-email logins are not timing-equalised");
                None
            }
        }
    }

    pub fn issue(&self, admin: &AdminCredential) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp() as usize;
        let ttl = usize::try_from(self.ttl_secs).unwrap_or(usize::MAX);
        let claims = SessionClaims {
            sub: admin.id,
            email: admin.email.clone(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken {
            token,
            expires_in: self.ttl_secs,
        })
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let token_data = decode::<SessionClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn admin(auth: &Authenticator) -> AdminCredential {
        AdminCredential {
            id: Uuid::now_v7(),
            email: "ops@travel.in".to_string(),
            name: "Ops".to_string(),
            password_hash: auth.hash_password("s3cret").unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_is_salted_and_verifies() {
        let auth = Authenticator::new(b"test", 60, 4);
        let a = auth.hash_password("s3cret").unwrap();
        let b = auth.hash_password("s3cret").unwrap();
        assert_ne!(a, b);
        assert!(auth.check_password("s3cret", Some(&a)));
        assert!(!auth.check_password("wrong", Some(&a)));
        assert!(!auth.check_password("s3cret", None));
    }

    #[test]
    fn token_round_trip_carries_admin_id() {
        let auth = Authenticator::new(b"test", 60, 4);
        let admin = admin(&auth);
        let issued = auth.issue(&admin).unwrap();
        assert_eq!(issued.expires_in, 60);

        let claims = auth.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, admin.id);
        assert_eq!(claims.email, admin.email);
    }

    #[test]
    fn unknown_email_check_caches_the_dummy_hash() {
        let auth = Authenticator::new(b"test", 60, 4);
        assert!(auth.dummy_hash.get().is_none());
        assert!(!auth.check_password("s3cret", None));
        let cached = auth.dummy_hash.get().cloned().unwrap();
        assert!(cached.starts_with("$2"));
        assert!(!auth.check_password("other", None));
        assert_eq!(auth.dummy_hash.get(), Some(&cached));
    }

    #[test]
    fn huge_lifetime_saturates_expiry() {
        let auth = Authenticator::new(b"test", u64::MAX, 4);
        let issued = auth.issue(&admin(&auth)).unwrap();
        assert_eq!(issued.expires_in, u64::MAX);
        let claims = auth.validate(&issued.token).unwrap();
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = Authenticator::new(b"one", 60, 4);
        let other = Authenticator::new(b"two", 60, 4);
        let token = issuer.issue(&admin(&issuer)).unwrap().token;
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = Authenticator::new(b"test", 60, 4);
        let past = (Utc::now().timestamp() - 3600) as usize;
        let claims = SessionClaims {
            sub: Uuid::now_v7(),
            email: "ops@travel.in".to_string(),
            iat: past - 60,
            exp: past,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test")).unwrap();
        assert!(auth.validate(&token).is_err());
    }
}
