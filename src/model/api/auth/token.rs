use std::ops::Deref;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::warn;
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    common::UserId,
    db::user::User,
    store::Backend,
};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific user with a specific role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: UserId,
    pub rol: String,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given user, with that user's role.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            rol: user.rol.clone(),
        }
    }

    /// Serialize this token into a signed cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build((AUTH_TOKEN_COOKIE, token))
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .build())
    }

    /// Deserialize a token from a cookie, checking its signature and expiry.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Resolve the user behind the request's auth cookie, if it is valid and the
/// user still holds the role the token was issued for.
async fn authenticated_user(req: &Request<'_>) -> Option<Result<User>> {
    let config = req.guard::<&State<Config>>().await.succeeded()?;
    let backend = req.guard::<&State<Backend>>().await.succeeded()?;

    let cookie = req.cookies().get(AUTH_TOKEN_COOKIE)?;
    let token = match AuthToken::from_cookie(cookie, config) {
        Ok(token) => token,
        Err(e) => {
            warn!("Rejected auth cookie: {e}");
            return None;
        }
    };

    match backend.user_by_id(token.id).await {
        Ok(Some(user)) if user.rol == token.rol => Some(Ok(user)),
        Ok(_) => None,
        Err(e) => Some(Err(e)),
    }
}

/// A request guard admitting only logged-in admins.
pub struct Admin(pub User);

impl Deref for Admin {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match authenticated_user(req).await {
            Some(Ok(user)) if user.is_admin() => Outcome::Success(Admin(user)),
            Some(Err(e)) => Outcome::Error((Status::InternalServerError, e)),
            _ => Outcome::Forward(Status::Unauthorized),
        }
    }
}
