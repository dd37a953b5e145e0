use std::path::PathBuf;

use chrono::Duration;
use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    db::user::{NewUser, ADMIN_ROLE},
    store::{Backend, JsonStore, MongoStore},
};
use crate::voting::VotePolicy;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default)]
    vote_isolation: Isolation,
    #[serde(default)]
    stamp_policy: StampPolicy,
    admin_correo: String,
    // secrets
    jwt_secret: String,
    admin_contrasena: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// How the eligibility check is isolated from concurrent votes.
    pub fn vote_isolation(&self) -> Isolation {
        self.vote_isolation
    }

    /// Which votes stamp the voter's last-vote timestamp.
    pub fn stamp_policy(&self) -> StampPolicy {
        self.stamp_policy
    }

    /// How votes are recorded.
    pub fn vote_policy(&self) -> VotePolicy {
        VotePolicy {
            isolation: self.vote_isolation,
            stamp: self.stamp_policy,
        }
    }

    /// Email of the admin account created when none exists.
    pub fn admin_correo(&self) -> &str {
        &self.admin_correo
    }

    /// Password of the admin account created when none exists.
    pub fn admin_contrasena(&self) -> &str {
        &self.admin_contrasena
    }
}

/// Isolation of the check-then-act vote sequence.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Counts, ledger append, tally and stamp run in one transaction, backed
    /// by a uniqueness constraint on (voter, category) where the store has one.
    #[default]
    Serializable,
    /// Counts are read outside the write transaction. Concurrent votes for the
    /// same voter and category can both be recorded.
    Racy,
}

/// Which successful votes update `last_vote_at`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampPolicy {
    #[default]
    EveryVote,
    /// Only presidential and null votes stamp the voter.
    PresidentialAndNull,
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if config.vote_isolation == Isolation::Racy {
            warn!("Vote isolation is `racy`: concurrent votes may double count");
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Which storage backend to connect to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreKind {
    Mongodb,
    Json,
}

/// Configuration for the storage backend.
#[derive(Deserialize)]
struct StoreConfig {
    store: StoreKind,
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: Option<String>,
    json_path: Option<PathBuf>,
}

fn default_db_name() -> String {
    "electoral".to_string()
}

/// A fairing that loads the storage config, connects to the chosen backend,
/// performs any setup necessary, and places the [`Backend`] into managed state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let isolation = match rocket.state::<Config>() {
            Some(app_config) => app_config.vote_isolation(),
            None => {
                error!("Store fairing requires the application config");
                return Err(rocket);
            }
        };

        let backend = match config.store {
            StoreKind::Mongodb => {
                let Some(db_uri) = config.db_uri else {
                    error!("`db_uri` must be set when `store` is `mongodb`");
                    return Err(rocket);
                };
                info!("Loaded database config, connecting...");
                match MongoStore::connect(&db_uri, &config.db_name, isolation).await {
                    Ok(store) => Backend::new(Box::new(store)),
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
            StoreKind::Json => match config.json_path {
                Some(path) => {
                    info!("Loading JSON store from {}", path.display());
                    match JsonStore::open(path).await {
                        Ok(store) => Backend::new(Box::new(store)),
                        Err(e) => {
                            error!("Failed to load JSON store: {e}");
                            return Err(rocket);
                        }
                    }
                }
                None => {
                    warn!("No `json_path` set, votes will only be kept in memory");
                    Backend::new(Box::new(JsonStore::in_memory()))
                }
            },
        };
        info!("...store online!");

        // Manage the state.
        rocket = rocket.manage(backend);
        Ok(rocket)
    }
}

/// A fairing that ensures at least one admin account exists, creating the
/// configured one if not. Must be attached after the config and store.
pub struct BootstrapFairing;

#[rocket::async_trait]
impl Fairing for BootstrapFairing {
    fn info(&self) -> Info {
        Info {
            name: "Admin bootstrap",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (Some(config), Some(backend)) = (rocket.state::<Config>(), rocket.state::<Backend>())
        else {
            error!("Admin bootstrap requires the config and store to be managed");
            return Err(rocket);
        };

        let result = match backend.count_admins().await {
            Ok(0) => {
                warn!(
                    "No admin account found, creating `{}` from config",
                    config.admin_correo()
                );
                match NewUser::new(config.admin_correo(), config.admin_contrasena(), ADMIN_ROLE) {
                    Ok(admin) => backend.insert_user(admin).await.map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("Failed to ensure an admin account exists: {e}");
                Err(rocket)
            }
        }
    }
}
