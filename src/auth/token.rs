use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mongodb::bson::oid::ObjectId;
use rocket::time::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Role;

/// Claims carried by a session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (hex ObjectId).
    pub sub: String,
    pub role: Role,
    /// Username for admins, display name for everyone else.
    pub name: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(role: Role, account_id: ObjectId, name: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: account_id.to_hex(),
            role,
            name: name.into(),
            jti: uuid::Uuid::new_v4().simple().to_string(),
            iat: now,
            exp: now + ttl.whole_seconds(),
        }
    }

    pub fn account_id(&self) -> Option<ObjectId> {
        ObjectId::parse_str(&self.sub).ok()
    }
}

/// HS256 signing and verification keyed by the shared secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    /// `None` for a bad signature, an expired token or malformed claims.
    pub fn decode<C: DeserializeOwned>(&self, token: &str) -> Option<C> {
        decode::<C>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_claims_decode_with_the_same_secret() {
        let keys = TokenKeys::new("secret");
        let id = ObjectId::new();
        let claims = Claims::new(Role::Admin, id, "root", Duration::days(1));

        let token = keys.sign(&claims).unwrap();
        let decoded: Claims = keys.decode(&token).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.account_id(), Some(id));
        assert_eq!(decoded.exp - decoded.iat, 86_400);
    }

    #[test]
    fn other_secret_is_rejected() {
        let claims = Claims::new(Role::Mentor, ObjectId::new(), "Ada", Duration::days(7));
        let token = TokenKeys::new("secret").sign(&claims).unwrap();

        assert!(TokenKeys::new("other").decode::<Claims>(&token).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new("secret");
        let mut claims = Claims::new(Role::DsocMentee, ObjectId::new(), "Lin", Duration::days(7));
        claims.iat -= 3_600;
        claims.exp = Utc::now().timestamp() - 60;

        let token = keys.sign(&claims).unwrap();
        assert!(keys.decode::<Claims>(&token).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = TokenKeys::new("secret");
        assert!(keys.decode::<Claims>("").is_none());
        assert!(keys.decode::<Claims>("not.a.jwt").is_none());
    }

    #[test]
    fn token_ids_are_unique() {
        let id = ObjectId::new();
        let a = Claims::new(Role::Admin, id, "root", Duration::days(1));
        let b = Claims::new(Role::Admin, id, "root", Duration::days(1));
        assert_ne!(a.jti, b.jti);
    }
}
