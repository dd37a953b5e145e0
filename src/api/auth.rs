use log::info;
use rocket::{http::CookieJar, http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    logging::RequestId,
    model::{
        api::auth::{AuthToken, Credentials, RegisterRequest, UserDesc, AUTH_TOKEN_COOKIE},
        db::user::NewUser,
        store::Backend,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![login, register, logout]
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    backend: &State<Backend>,
    config: &State<Config>,
    request_id: &RequestId,
) -> Result<Json<UserDesc>> {
    let user = backend
        .user_by_email(credentials.correo.trim())
        .await?
        .filter(|user| user.verify_password(&credentials.contrasena))
        .ok_or_else(|| Error::unauthorized("Credenciales inválidas"))?;

    cookies.add(AuthToken::new(&user).into_cookie(config)?);
    info!("req{request_id}: user {} logged in as `{}`", user.id, user.rol);

    Ok(Json(UserDesc::new(&user, "Login exitoso")))
}

#[post("/auth/register", data = "<request>", format = "json")]
pub async fn register(
    request: Json<RegisterRequest>,
    backend: &State<Backend>,
    request_id: &RequestId,
) -> Result<Json<UserDesc>> {
    let user = backend
        .insert_user(NewUser::try_from(request.into_inner())?)
        .await?;
    info!("req{request_id}: registered user {} as `{}`", user.id, user.rol);

    Ok(Json(UserDesc::new(&user, "Usuario registrado exitosamente")))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(AUTH_TOKEN_COOKIE);
    Status::Ok
}
