use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::UserId,
    db::user::{NewUser, User, DEFAULT_ROLE},
};

/// Login credentials, received from a user. The password is in plaintext, so
/// these are never stored.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub correo: String,
    pub contrasena: String,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// A request to create a user account.
#[derive(Clone, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub correo: String,
    pub contrasena: String,
    #[serde(default = "default_role")]
    pub rol: String,
}

/// A minimal syntactic check: one `@`, something before it, and a dotted
/// domain after it.
fn is_valid_email(correo: &str) -> bool {
    let Some((local, domain)) = correo.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !correo.chars().any(char::is_whitespace)
}

impl TryFrom<RegisterRequest> for NewUser {
    type Error = Error;

    /// Hash the password, after checking the email is well formed, the
    /// password non-empty and the role the default one.
    ///
    /// Public registration never grants elevated roles; administrators only
    /// come from the bootstrap account.
    fn try_from(request: RegisterRequest) -> Result<Self> {
        let correo = request.correo.trim();
        if !is_valid_email(correo) {
            return Err(Error::conflict(format!("Correo inválido: {correo}")));
        }
        if request.contrasena.is_empty() {
            return Err(Error::conflict("La contraseña no puede estar vacía"));
        }
        if request.rol != DEFAULT_ROLE {
            return Err(Error::conflict(format!("Rol no permitido: {}", request.rol)));
        }
        NewUser::new(correo, &request.contrasena, DEFAULT_ROLE)
    }
}

/// A user account as shown to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDesc {
    pub id_usuario: UserId,
    pub correo: String,
    pub rol: String,
    pub message: String,
}

impl UserDesc {
    pub fn new(user: &User, message: impl Into<String>) -> Self {
        Self {
            id_usuario: user.id,
            correo: user.correo.clone(),
            rol: user.rol.clone(),
            message: message.into(),
        }
    }
}


#[cfg(test)]
mod tests {
    use crate::model::db::user::ADMIN_ROLE;

    use super::*;

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("mesa@onpe.gob.pe"));
        assert!(is_valid_email("a.b@c.pe"));
        assert!(!is_valid_email("mesa"));
        assert!(!is_valid_email("@onpe.gob.pe"));
        assert!(!is_valid_email("mesa@localhost"));
        assert!(!is_valid_email("mesa@@onpe.pe"));
        assert!(!is_valid_email("me sa@onpe.pe"));
        assert!(!is_valid_email("mesa@.pe"));
    }

    #[test]
    fn register_request_hashes_password() {
        let user = NewUser::try_from(RegisterRequest::example()).unwrap();
        assert_eq!(user.rol, DEFAULT_ROLE);
        assert!(user.verify_password("clave-segura"));

        let mut invalid = RegisterRequest::example();
        invalid.correo = "no-es-un-correo".into();
        assert_eq!(
            NewUser::try_from(invalid).unwrap_err().status(),
            rocket::http::Status::BadRequest
        );
    }

    #[test]
    fn elevated_role_refused() {
        let request = RegisterRequest {
            rol: ADMIN_ROLE.into(),
            ..RegisterRequest::example()
        };
        let err = NewUser::try_from(request).unwrap_err();
        assert_eq!(err.status(), rocket::http::Status::BadRequest);
        assert_eq!(err.to_string(), "Rol no permitido: admin");
    }

    #[test]
    fn role_defaults_to_user() {
        let request: RegisterRequest = rocket::serde::json::serde_json::from_str(
            r#"{"correo": "a@b.pe", "contrasena": "x"}"#,
        )
        .unwrap();
        assert_eq!(request.rol, DEFAULT_ROLE);
    }
}
