mod request;
mod token;

pub use request::{Credentials, RegisterRequest, UserDesc};
pub use token::{Admin, AuthToken, AUTH_TOKEN_COOKIE};
