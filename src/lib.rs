#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod model;
pub mod reporting;
pub mod voting;

pub use config::Config;

use config::{BootstrapFairing, ConfigFairing, StoreFairing};
use cors::CorsFairing;
use logging::LoggerFairing;
use model::store::{Backend, Store};

/// Build the server, connecting to whichever storage backend is configured.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(BootstrapFairing)
        .attach(CorsFairing)
        .attach(LoggerFairing)
        .mount("/", api::routes())
        .mount("/", cors::routes())
        .register("/", api::catchers())
}

/// Build the server around an already constructed storage backend.
pub fn rocket_for_store(store: Box<dyn Store>) -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .manage(Backend::new(store))
        .attach(BootstrapFairing)
        .attach(CorsFairing)
        .attach(LoggerFairing)
        .mount("/", api::routes())
        .mount("/", cors::routes())
        .register("/", api::catchers())
}

/// A fresh in-memory server for route tests.
#[cfg(test)]
pub(crate) async fn test_client() -> (
    rocket::local::asynchronous::Client,
    model::store::JsonStore,
) {
    let store = model::store::JsonStore::in_memory();
    let rocket = rocket_for_store(Box::new(store.clone()));
    let client = rocket::local::asynchronous::Client::tracked(rocket)
        .await
        .expect("valid rocket instance");
    (client, store)
}
