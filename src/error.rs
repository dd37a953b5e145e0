use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use mongodb::{
    bson::{de::Error as BsonDeError, extjson::de::Error as ExtJsonError, ser::Error as BsonSerError},
    error::Error as DbError,
};
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::{serde_json::Error as JsonError, Json},
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::common::UnknownCategory;
use crate::voting::VoteError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    /// The database aborted a transaction that may succeed if run again.
    #[error("Transaction aborted by a concurrent write: {0}")]
    Transient(#[source] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Store file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed store file: {0}")]
    Json(#[from] JsonError),
    #[error("Malformed store file: {0}")]
    ExtJson(#[from] ExtJsonError),
    #[error(transparent)]
    BsonSer(#[from] BsonSerError),
    #[error(transparent)]
    BsonDe(#[from] BsonDeError),
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Something (usually given by `what`) could not be found.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, format!("No encontrado: {}", what.into()))
    }

    /// The request clashes with existing state or is malformed.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, msg.into())
    }

    /// Missing or bad credentials.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, msg.into())
    }

    /// Whether the whole unit of work can be retried from the start.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Status(status, _) => *status,
            Self::Vote(err) => err.status(),
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Transient(_) => Status::ServiceUnavailable,
            Self::Db(_)
            | Self::Argon2(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::ExtJson(_)
            | Self::BsonSer(_)
            | Self::BsonDe(_) => Status::InternalServerError,
        }
    }
}

impl From<UnknownCategory> for Error {
    fn from(err: UnknownCategory) -> Self {
        Self::not_found(format!("Categoría '{}'", err.0))
    }
}


/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub detail: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let detail = match status.class() {
            StatusClass::ServerError => {
                error!("{self}");
                if req.rocket().config().profile == rocket::Config::RELEASE_PROFILE {
                    "Internal server error".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => {
                warn!("{self}");
                self.to_string()
            }
        };
        (status, Json(ErrorBody { detail })).respond_to(req)
    }
}
