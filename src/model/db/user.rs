use std::ops::{Deref, DerefMut};

use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::common::UserId;

/// Role granting administrative rights, e.g. creating candidates.
pub const ADMIN_ROLE: &str = "admin";
/// Role given to accounts registered without one.
pub const DEFAULT_ROLE: &str = "usuario";

/// Core user account data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub correo: String,
    pub password_hash: String,
    pub rol: String,
}

impl UserCore {
    /// Create a user account, hashing the plaintext password.
    pub fn new(correo: &str, contrasena: &str, rol: &str) -> Result<Self> {
        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash = argon2::hash_encoded(contrasena.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            correo: correo.trim().to_string(),
            password_hash,
            rol: rol.to_string(),
        })
    }

    /// Check whether the given password is correct.
    /// A malformed stored hash never verifies.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.rol == ADMIN_ROLE
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user account from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verification() {
        let user = NewUser::example();
        assert_ne!(user.password_hash, "mesa-de-sufragio");
        assert!(user.verify_password("mesa-de-sufragio"));
        assert!(!user.verify_password("mesa-de-sufragi0"));
        assert!(!user.is_admin());
    }

    #[test]
    fn malformed_hash_rejects() {
        let user = NewUser {
            correo: "x@y.pe".to_string(),
            password_hash: "5e884898da28047151d0e56f8dc6292773603d0d".to_string(),
            rol: ADMIN_ROLE.to_string(),
        };
        assert!(!user.verify_password("password"));
        assert!(user.is_admin());
    }
}
