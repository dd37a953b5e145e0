use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};
use serde::{Deserialize, Serialize};

use crate::error::ErrorBody;

pub mod analysis;
pub mod auth;
pub mod candidates;
pub mod results;
pub mod voters;
pub mod votes;

pub fn routes() -> Vec<Route> {
    let mut routes = routes![root];
    routes.extend(auth::routes());
    routes.extend(voters::routes());
    routes.extend(candidates::routes());
    routes.extend(votes::routes());
    routes.extend(results::routes());
    routes.extend(analysis::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Liveness banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
    pub version: String,
}

#[get("/")]
fn root() -> Json<Banner> {
    Json(Banner {
        message: "API del Sistema Electoral activa".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Errors raised by Rocket itself (no matching route, failed guards, bad
/// bodies) get the same JSON shape as our own.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Json<ErrorBody>) {
    let detail = status.reason_lossy().to_string();
    (status, Json(ErrorBody { detail }))
}

#[cfg(test)]
mod tests {
    use rocket::local::asynchronous::Client;

    use super::*;

    #[backend_test]
    async fn banner(client: Client) {
        let response = client.get(uri!(root)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let banner: Banner = response.into_json().await.unwrap();
        assert_eq!(banner.message, "API del Sistema Electoral activa");
        assert_eq!(banner.version, env!("CARGO_PKG_VERSION"));
    }

    #[backend_test]
    async fn unknown_route_is_json(client: Client) {
        let response = client.get("/no/existe").dispatch().await;

        assert_eq!(Status::NotFound, response.status());
        let body = response.into_string().await.unwrap();
        assert!(body.contains("\"detail\""));
    }
}
