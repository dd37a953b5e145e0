use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Status},
    Request, Response, Route,
};

pub fn routes() -> Vec<Route> {
    routes![preflight]
}

/// Answer any CORS preflight request. The headers are added by [`CorsFairing`].
#[options("/<_..>")]
fn preflight() -> Status {
    Status::NoContent
}

/// Whether `origin` is a local development frontend, i.e. `http://localhost`
/// or `http://127.0.0.1` with an optional port.
pub fn is_localhost_origin(origin: &str) -> bool {
    let Some(authority) = origin.strip_prefix("http://") else {
        return false;
    };
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };
    let port_ok = match port {
        Some(port) => !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()),
        None => true,
    };
    (host == "localhost" || host == "127.0.0.1") && port_ok
}

/// A fairing reflecting local origins back in CORS headers, with credentials
/// allowed.
#[derive(Debug, Copy, Clone)]
pub struct CorsFairing;

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let Some(origin) = req.headers().get_one("Origin") else {
            return;
        };
        if !is_localhost_origin(origin) {
            return;
        }
        res.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
        res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        res.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, PATCH, DELETE, OPTIONS",
        ));
        let requested = req
            .headers()
            .get_one("Access-Control-Request-Headers")
            .unwrap_or("*");
        res.set_header(Header::new(
            "Access-Control-Allow-Headers",
            requested.to_string(),
        ));
        res.set_header(Header::new("Vary", "Origin"));
    }
}
