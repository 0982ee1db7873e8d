use chrono::Utc;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::time::{Duration, OffsetDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::directory::AccountDirectory;
use super::token::{Claims, TokenKeys};
use super::{Role, password};
use crate::config::Settings;
use crate::errors::{ApiError, ApiResult};

pub const ACCESS_CODE_COOKIE: &str = "admin-code-verified";
const ACCESS_CODE_TTL: Duration = Duration::hours(1);
const ACCESS_CODE_SCOPE: &str = "admin-access-code";

/// Login form body. Admins send `username`, every other role sends `email`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn into_credentials(self, role: Role) -> ApiResult<Credentials> {
        let identifier = match role {
            Role::Admin => self.username,
            _ => self.email,
        }
        .filter(|value| !value.trim().is_empty());
        let password = self.password.filter(|value| !value.is_empty());

        match (identifier, password) {
            (Some(identifier), Some(password)) => Ok(Credentials {
                identifier,
                password,
            }),
            (identifier, password) => {
                let mut missing = Vec::new();
                if identifier.is_none() {
                    missing.push(role.identifier_field());
                }
                if password.is_none() {
                    missing.push("password");
                }
                Err(ApiError::missing_fields(&missing))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionGrant {
    pub success: bool,
    pub role: Role,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessCodeClaims {
    scope: String,
    iat: i64,
    exp: i64,
}

pub struct SessionService {
    keys: TokenKeys,
    secure: bool,
    access_code_digest: Option<[u8; 32]>,
}

impl SessionService {
    pub fn new(secret: &str, secure: bool, access_code: Option<&str>) -> Self {
        Self {
            keys: TokenKeys::new(secret),
            secure,
            access_code_digest: access_code.map(digest),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.jwt_secret,
            settings.secure_cookies,
            settings.admin_access_code.as_deref(),
        )
    }

    /// Checks the credentials against `directory` and, on success, sets the
    /// role's session cookie.
    ///
    /// Unknown accounts and wrong passwords both yield
    /// [`ApiError::InvalidCredentials`]; a deactivated account yields
    /// [`ApiError::Deactivated`] before the password is looked at.
    pub async fn issue<D>(
        &self,
        role: Role,
        directory: &D,
        credentials: &Credentials,
        cookies: &CookieJar<'_>,
    ) -> ApiResult<SessionGrant>
    where
        D: AccountDirectory + ?Sized,
    {
        let identifier = role.normalize_identifier(&credentials.identifier);

        let Some(account) = directory.find_account(role, &identifier).await? else {
            tracing::warn!(%role, %identifier, "login rejected: unknown account");
            return Err(ApiError::InvalidCredentials);
        };

        if !account.is_active {
            tracing::warn!(%role, %identifier, "login rejected: account deactivated");
            return Err(ApiError::Deactivated);
        }

        let stored = account.password_hash.as_deref();
        if !password_matches(role, &identifier, &credentials.password, stored).await {
            return Err(ApiError::InvalidCredentials);
        }

        let claims = Claims::new(role, account.id, account.name.clone(), role.max_age());
        let token = self.keys.sign(&claims)?;
        cookies.add(self.session_cookie(role, token));

        if let Err(e) = directory.record_login(role, account.id).await {
            tracing::warn!(%role, error = %e, "failed to record last login");
        }

        tracing::info!(%role, %identifier, jti = %claims.jti, "session issued");

        Ok(SessionGrant {
            success: true,
            role,
            id: account.id.to_hex(),
            name: account.name,
        })
    }

    /// Claims of a valid session cookie for `role`, if any.
    pub fn verify(&self, role: Role, cookies: &CookieJar<'_>) -> Option<Claims> {
        let cookie = cookies.get(role.cookie_name())?;
        let claims: Claims = self.keys.decode(cookie.value())?;
        (claims.role == role).then_some(claims)
    }

    pub fn revoke(&self, role: Role, cookies: &CookieJar<'_>) {
        cookies.add(self.expired_cookie(role.cookie_name()));
    }

    pub fn session_cookie(&self, role: Role, token: String) -> Cookie<'static> {
        self.cookie(role.cookie_name(), token, role.max_age())
    }

    /// Compares digests of the submitted and configured codes; with no code
    /// configured every attempt fails.
    pub fn access_code_matches(&self, submitted: &str) -> bool {
        match &self.access_code_digest {
            Some(expected) => digest(submitted.trim()) == *expected,
            None => false,
        }
    }

    pub fn grant_access_code(&self, cookies: &CookieJar<'_>) -> ApiResult<()> {
        let now = Utc::now().timestamp();
        let claims = AccessCodeClaims {
            scope: ACCESS_CODE_SCOPE.to_string(),
            iat: now,
            exp: now + ACCESS_CODE_TTL.whole_seconds(),
        };
        let token = self.keys.sign(&claims)?;
        cookies.add(self.cookie(ACCESS_CODE_COOKIE, token, ACCESS_CODE_TTL));
        Ok(())
    }

    pub fn access_code_verified(&self, cookies: &CookieJar<'_>) -> bool {
        cookies
            .get(ACCESS_CODE_COOKIE)
            .and_then(|cookie| self.keys.decode::<AccessCodeClaims>(cookie.value()))
            .is_some_and(|claims| claims.scope == ACCESS_CODE_SCOPE)
    }

    pub fn revoke_access_code(&self, cookies: &CookieJar<'_>) {
        cookies.add(self.expired_cookie(ACCESS_CODE_COOKIE));
    }

    fn cookie(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(max_age)
            .build()
    }

    fn expired_cookie(&self, name: &'static str) -> Cookie<'static> {
        Cookie::build((name, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}

/// A missing or unreadable stored hash counts as a mismatch, so such accounts
/// answer exactly like unknown ones.
async fn password_matches(
    role: Role,
    identifier: &str,
    submitted: &str,
    stored: Option<&str>,
) -> bool {
    let Some(stored) = stored else {
        tracing::warn!(%role, %identifier, "login rejected: account has no password");
        return false;
    };

    match password::verify(submitted, stored).await {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!(%role, %identifier, "login rejected: wrong password");
            false
        }
        Err(e) => {
            tracing::warn!(
                %role,
                %identifier,
                error = %e,
                "login rejected: stored password is not a valid hash"
            );
            false
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
