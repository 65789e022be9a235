use std::ops::{Deref, DerefMut};

use mongodb::bson::doc;
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::admin::AdminCredentials,
    db::sala::Sala,
    mongodb::{Coll, Id},
};

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Ensure there is at least one admin, creating one from `bootstrap` if the
/// collection is empty, and ensure every admin has a voting room.
pub async fn ensure_admin_exists(
    admins: &Coll<Admin>,
    new_admins: &Coll<NewAdmin>,
    salas: &Coll<Sala>,
    bootstrap: AdminCredentials,
) -> Result<()> {
    if admins.count_documents(None, None).await? == 0 {
        let username = bootstrap.username.clone();
        let admin: NewAdmin = bootstrap.try_into().map_err(|_| {
            Error::Status(
                Status::BadRequest,
                "Bootstrap admin credentials are not acceptable".to_string(),
            )
        })?;
        new_admins.insert_one(admin, None).await?;
        warn!("No admins found, created bootstrap admin {username}");
    }

    let admin = admins
        .find_one(None, None)
        .await?
        .ok_or_else(|| Error::not_found("bootstrap admin"))?;
    let existing = salas
        .find_one(doc! { "admin_id": admin.id }, None)
        .await?;
    if existing.is_none() {
        salas.insert_one(Sala::for_admin(&admin), None).await?;
        info!("Created voting room for admin {}", admin.username);
    }

    Ok(())
}
