#[macro_use]
extern crate rocket;

use rocket::{Build, Rocket};

use crate::config::{BridgeFairing, ConfigFairing, DatabaseFairing, RosterFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod model;

/// Assemble the server: configuration, database, bridge and roster fairings,
/// request logging, and every route.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(BridgeFairing)
        .attach(RosterFairing)
        .attach(LoggerFairing)
        .mount("/", api::routes())
}
