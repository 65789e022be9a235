use std::sync::Arc;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    data::{ByteUnit, ToByteUnit},
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::bridge::{log_permission_error, PermissionDiagnostics, PermissionErrorBridge};
use crate::import::{RosterConfig, RosterRegistry};
use crate::model::{
    api::admin::AdminCredentials,
    db::admin::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default = "default_upload_size")]
    max_upload_size: ByteUnit,
    // secrets
    jwt_secret: String,
}

fn default_upload_size() -> ByteUnit {
    4_u64.mebibytes()
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Largest spreadsheet accepted for import.
    pub fn max_upload_size(&self) -> ByteUnit {
        self.max_upload_size
    }

    /// Secret key used to encrypt JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
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

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the primary database.
#[derive(Deserialize)]
struct DbConfig {
    // non-secrets
    admin_username: String,
    // secrets
    db_uri: String,
    admin_password: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }

        // Ensure there is at least one admin, with a voting room.
        let bootstrap = AdminCredentials {
            username: config.admin_username,
            password: config.admin_password,
        };
        let admins = Coll::from_db(&db);
        let new_admins = Coll::from_db(&db);
        let salas = Coll::from_db(&db);
        if let Err(e) = ensure_admin_exists(&admins, &new_admins, &salas, bootstrap).await {
            error!("Failed to set up database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "sala_admin".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// A fairing that builds the permission-error bridge, subscribes the
/// logging and diagnostics handlers, and manages the bridge and the
/// diagnostics feed.
pub struct BridgeFairing;

#[rocket::async_trait]
impl Fairing for BridgeFairing {
    fn info(&self) -> Info {
        Info {
            name: "Permission-error bridge",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let bridge = PermissionErrorBridge::new();
        let diagnostics = Arc::new(PermissionDiagnostics::default());

        bridge.subscribe(log_permission_error);
        let feed = diagnostics.clone();
        bridge.subscribe(move |error| feed.record(error));
        debug!("Permission-error bridge has {} subscribers", bridge.subscriber_count());

        Ok(rocket.manage(bridge).manage(diagnostics))
    }
}

/// A fairing that reads the optional `[roster]` table and manages a
/// [`RosterRegistry`]. A missing or unusable table does not stop launch;
/// roster imports fail with a configuration error instead.
pub struct RosterFairing;

#[rocket::async_trait]
impl Fairing for RosterFairing {
    fn info(&self) -> Info {
        Info {
            name: "Roster app",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = if rocket.figment().contains("roster") {
            match rocket.figment().extract_inner::<RosterConfig>("roster") {
                Ok(config) => {
                    if let Err(e) = config.check_shape() {
                        warn!("{e}");
                    }
                    Some(config)
                }
                Err(e) => {
                    warn!("Ignoring malformed roster config");
                    rocket::config::pretty_print_error(e);
                    None
                }
            }
        } else {
            info!("No roster app configured, roster imports are disabled");
            None
        };

        Ok(rocket.manage(Arc::new(RosterRegistry::new(config))))
    }
}
