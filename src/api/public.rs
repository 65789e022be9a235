use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{inbox::InboxRequest, poll::PollDescription, sala::SalaDescription},
        db::{group::Group, poll::Poll, sala::Sala},
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_salas, inbox]
}

/// The public room directory.
#[get("/salas")]
async fn get_salas(salas: Coll<Sala>) -> Result<Json<Vec<SalaDescription>>> {
    let by_name = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let salas: Vec<Sala> = salas.find(None, by_name).await?.try_collect().await?;
    Ok(Json(salas.into_iter().map(SalaDescription::from).collect()))
}

/// Polls in a room addressed to a group the voter is enabled in.
#[post("/inbox", data = "<request>", format = "json")]
async fn inbox(
    request: Json<InboxRequest>,
    salas: Coll<Sala>,
    groups: Coll<Group>,
    polls: Coll<Poll>,
) -> Result<Json<Vec<PollDescription>>> {
    let (sala_id, voter_id) = request.trimmed().ok_or_else(|| {
        Error::Status(
            Status::BadRequest,
            "Both a room ID and a voter ID are required".to_string(),
        )
    })?;
    let not_found = || Error::not_found(format!("Sala {sala_id}"));

    let admin_id: Id = sala_id.parse().map_err(|_| not_found())?;
    salas
        .find_one(doc! { "admin_id": admin_id }, None)
        .await?
        .ok_or_else(not_found)?;

    let membership = doc! {
        "admin_id": admin_id,
        "voters": { "$elemMatch": { "id": voter_id, "enabled": true } },
    };
    let groups: Vec<Group> = groups.find(membership, None).await?.try_collect().await?;
    if groups.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let group_ids: Vec<Id> = groups.iter().map(|group| group.id).collect();
    let addressed: Document = doc! {
        "admin_id": admin_id,
        "group_id": { "$in": group_ids },
    };
    let newest_first = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
    let polls: Vec<Poll> = polls.find(addressed, newest_first).await?.try_collect().await?;
    Ok(Json(polls.into_iter().map(PollDescription::from).collect()))
}
