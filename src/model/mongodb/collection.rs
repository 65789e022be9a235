use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    admin::{Admin, NewAdmin},
    group::Group,
    poll::{Poll, PollLookup},
    sala::Sala,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Admin collections
const ADMINS: &str = "admins";
impl MongoCollection for Admin {
    const NAME: &'static str = ADMINS;
}
impl MongoCollection for NewAdmin {
    const NAME: &'static str = ADMINS;
}

// Room directory
const SALAS: &str = "salas";
impl MongoCollection for Sala {
    const NAME: &'static str = SALAS;
}

// Voter group collections
const GROUPS: &str = "groups";
impl MongoCollection for Group {
    const NAME: &'static str = GROUPS;
}

// Poll collections
const POLLS: &str = "polls";
impl MongoCollection for Poll {
    const NAME: &'static str = POLLS;
}

// Denormalised poll lookup
const POLL_LOOKUP: &str = "poll_lookup";
impl MongoCollection for PollLookup {
    const NAME: &'static str = POLL_LOOKUP;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Admin collection.
    let admin_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<Admin>::from_db(db)
        .create_index(admin_index, None)
        .await?;

    // One room per admin.
    let sala_index = IndexModel::builder()
        .keys(doc! {"admin_id": 1})
        .options(unique)
        .build();
    Coll::<Sala>::from_db(db)
        .create_index(sala_index, None)
        .await?;

    // Group membership lookups from the voter inbox.
    let group_index = IndexModel::builder()
        .keys(doc! {"admin_id": 1, "voters.id": 1})
        .build();
    Coll::<Group>::from_db(db)
        .create_index(group_index, None)
        .await?;

    // Newest-first poll listings.
    let poll_index = IndexModel::builder()
        .keys(doc! {"admin_id": 1, "created_at": -1})
        .build();
    Coll::<Poll>::from_db(db)
        .create_index(poll_index, None)
        .await?;

    Ok(())
}
