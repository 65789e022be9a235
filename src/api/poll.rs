use mongodb::{bson::doc, error::Error as DbError, options::FindOptions, Client};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use super::common::{ensure_owner, write_failure};
use crate::{
    bridge::{Operation, PermissionError, PermissionErrorBridge},
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            poll::{PollDescription, PollSpec},
        },
        db::{
            group::Group,
            poll::{poll_path, polls_path, NewPoll, Poll, PollLookup},
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_polls, create_poll, delete_poll]
}

#[get("/admins/<admin_id>/polls")]
async fn get_polls(
    token: AuthToken,
    admin_id: Id,
    polls: Coll<Poll>,
    bridge: &State<PermissionErrorBridge>,
) -> Result<Json<Vec<PollDescription>>> {
    ensure_owner(&token, &admin_id, bridge, || {
        PermissionError::new(polls_path(&admin_id), Operation::Read)
    })?;

    let newest_first = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
    let polls: Vec<Poll> = polls
        .find(doc! { "admin_id": admin_id }, newest_first)
        .await?
        .try_collect()
        .await?;
    Ok(Json(polls.into_iter().map(PollDescription::from).collect()))
}

#[post("/admins/<admin_id>/polls", data = "<spec>", format = "json")]
async fn create_poll(
    token: AuthToken,
    admin_id: Id,
    spec: Json<PollSpec>,
    polls: Coll<Poll>,
    lookups: Coll<PollLookup>,
    groups: Coll<Group>,
    db_client: &State<Client>,
    bridge: &State<PermissionErrorBridge>,
) -> Result<Json<PollDescription>> {
    let denied = || PermissionError::new(polls_path(&admin_id), Operation::Create);
    ensure_owner(&token, &admin_id, bridge, denied)?;

    let (question, options) = spec.normalised().ok_or_else(|| {
        Error::Status(
            Status::BadRequest,
            "A poll needs a question and at least two options".to_string(),
        )
    })?;

    // The target group must belong to this admin.
    let group_id: Id = spec.group_id.parse()?;
    groups
        .find_one(doc! { "_id": group_id, "admin_id": admin_id }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Group {group_id}")))?;

    let poll = NewPoll::new(admin_id, question, options, group_id).with_id(Id::new());
    let lookup = PollLookup::for_poll(&poll);
    let write = async {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;
        polls
            .insert_one_with_session(&poll, None, &mut session)
            .await?;
        lookups
            .insert_one_with_session(&lookup, None, &mut session)
            .await?;
        session.commit_transaction().await?;
        Ok::<_, DbError>(())
    };
    write
        .await
        .map_err(|err| write_failure(err, bridge, denied))?;
    info!("Admin {admin_id} created poll {}", poll.id);

    Ok(Json(poll.into()))
}

#[delete("/admins/<admin_id>/polls/<poll_id>")]
async fn delete_poll(
    token: AuthToken,
    admin_id: Id,
    poll_id: Id,
    polls: Coll<Poll>,
    lookups: Coll<PollLookup>,
    db_client: &State<Client>,
    bridge: &State<PermissionErrorBridge>,
) -> Result<()> {
    let denied = || PermissionError::new(poll_path(&admin_id, &poll_id), Operation::Delete);
    ensure_owner(&token, &admin_id, bridge, denied)?;

    // The poll and its lookup entry go together or not at all.
    let delete = async {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;
        let owned_poll = doc! { "_id": poll_id, "admin_id": admin_id };
        let result = polls
            .delete_one_with_session(owned_poll, None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }
        lookups
            .delete_one_with_session(poll_id.as_doc(), None, &mut session)
            .await?;
        session.commit_transaction().await?;
        Ok::<_, DbError>(true)
    };

    match delete.await {
        Ok(true) => {
            info!("Admin {admin_id} deleted poll {poll_id}");
            Ok(())
        }
        Ok(false) => Err(Error::not_found(format!("Poll {poll_id}"))),
        Err(err) => Err(write_failure(err, bridge, denied)),
    }
}
