use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use super::common::{ensure_owner, write_failure};
use crate::{
    bridge::{Operation, PermissionError, PermissionErrorBridge},
    error::Result,
    import::GroupDraft,
    model::{
        api::{
            auth::AuthToken,
            group::{GroupDescription, GroupRequest},
        },
        db::group::{groups_path, Group},
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![create_group, get_groups]
}

#[post("/admins/<admin_id>/groups", data = "<request>", format = "json")]
async fn create_group(
    token: AuthToken,
    admin_id: Id,
    request: Json<GroupRequest>,
    groups: Coll<Group>,
    bridge: &State<PermissionErrorBridge>,
) -> Result<Json<GroupDescription>> {
    let denied = || {
        PermissionError::new(groups_path(&admin_id), Operation::Create)
            .with_data(request.attempted_data())
    };
    ensure_owner(&token, &admin_id, bridge, denied)?;

    let mut draft = GroupDraft::new();
    draft.set_name(request.name.as_str());
    let dropped = draft.set_voters(request.source, request.voters.clone());
    if dropped > 0 {
        info!(
            "Dropped {dropped} incomplete voter record(s) from group {:?} ({:?} import)",
            request.name,
            draft.source()
        );
    }

    // The ID is assigned here so the group is written in a single insert.
    let group = draft.submit(admin_id)?.with_id(Id::new());
    groups
        .insert_one(&group, None)
        .await
        .map_err(|err| write_failure(err, bridge, denied))?;
    info!(
        "Admin {admin_id} created group {} with {} voter(s)",
        group.id,
        group.voters.len()
    );

    Ok(Json(group.into()))
}

#[get("/admins/<admin_id>/groups")]
async fn get_groups(
    token: AuthToken,
    admin_id: Id,
    groups: Coll<Group>,
    bridge: &State<PermissionErrorBridge>,
) -> Result<Json<Vec<GroupDescription>>> {
    ensure_owner(&token, &admin_id, bridge, || {
        PermissionError::new(groups_path(&admin_id), Operation::Read)
    })?;

    let newest_first = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
    let groups: Vec<Group> = groups
        .find(doc! { "admin_id": admin_id }, newest_first)
        .await?
        .try_collect()
        .await?;
    Ok(Json(groups.into_iter().map(GroupDescription::from).collect()))
}

/// These need a MongoDB deployment reachable at the configured `db_uri`.
#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::json,
    };

    use super::*;
    use crate::model::{
        api::admin::{AdminCredentials, AdminSession},
        common::VoterRecord,
    };

    async fn signed_in_client() -> (Client, AdminSession) {
        let client = Client::tracked(crate::build()).await.unwrap();
        let response = client
            .post(uri!(crate::api::auth::authenticate))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example1()).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let session = response.into_json::<AdminSession>().await.unwrap();
        (client, session)
    }

    #[rocket::async_test]
    #[ignore = "needs MongoDB"]
    async fn create_and_list_groups() {
        let (client, session) = signed_in_client().await;
        let admin_id: Id = session.admin_id.parse().unwrap();

        let response = client
            .post(uri!(create_group(admin_id)))
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": "Equipo de Desarrollo",
                    "source": "spreadsheet",
                    "voters": [VoterRecord::example1(), VoterRecord::new("", "Sin", "Id")],
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let created = response.into_json::<GroupDescription>().await.unwrap();
        assert_eq!(created.voters, vec![VoterRecord::example1()]);

        let response = client.get(uri!(get_groups(admin_id))).dispatch().await;
        let listed = response.into_json::<Vec<GroupDescription>>().await.unwrap();
        assert_eq!(listed.first(), Some(&created));
    }

    #[rocket::async_test]
    #[ignore = "needs MongoDB"]
    async fn foreign_admin_is_forbidden() {
        let (client, _) = signed_in_client().await;
        let response = client
            .post(uri!(create_group(Id::new())))
            .header(ContentType::JSON)
            .body(json!({ "name": "Intruso", "voters": [VoterRecord::example1()] }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    #[ignore = "needs MongoDB"]
    async fn short_name_is_rejected() {
        let (client, session) = signed_in_client().await;
        let admin_id: Id = session.admin_id.parse().unwrap();
        let response = client
            .post(uri!(create_group(admin_id)))
            .header(ContentType::JSON)
            .body(json!({ "name": "ab", "voters": [VoterRecord::example1()] }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }
}
