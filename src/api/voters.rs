use log::info;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    logging::RequestId,
    model::{
        api::{
            pagination::{Paginated, PaginationRequest},
            voter::{Registered, VoterDesc, VoterSpec},
        },
        common::VoterStatus,
        store::Backend,
    },
    voting::{self, VoteError},
};

pub fn routes() -> Vec<Route> {
    routes![register, voters, voter, voter_status]
}

#[post("/votantes", data = "<spec>", format = "json")]
async fn register(
    spec: Json<VoterSpec>,
    backend: &State<Backend>,
    request_id: &RequestId,
) -> Result<Json<Registered>> {
    let voter = backend.insert_voter(spec.into_inner().into()).await?;
    info!("req{request_id}: registered voter {}", voter.id);

    Ok(Json(Registered {
        id_votantes: voter.id,
        message: "Votante registrado exitosamente".to_string(),
    }))
}

#[get("/votantes?<page..>")]
async fn voters(
    page: PaginationRequest,
    backend: &State<Backend>,
) -> Result<Json<Paginated<VoterDesc>>> {
    let (voters, total) = backend.voters_page(page.limit, page.offset).await?;
    let voters = voters.into_iter().map(VoterDesc::from).collect();
    Ok(Json(page.wrap(voters, total)))
}

#[get("/votantes/<dni>")]
async fn voter(dni: &str, backend: &State<Backend>) -> Result<Json<VoterDesc>> {
    let voter = backend
        .voter_by_national_id(dni.trim())
        .await?
        .ok_or(VoteError::VoterNotFound)?;
    Ok(Json(voter.into()))
}

#[get("/votantes/<dni>/status")]
async fn voter_status(dni: &str, backend: &State<Backend>) -> Result<Json<VoterStatus>> {
    let status = voting::voter_status(backend.store(), dni.trim()).await?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::model::{
        common::Category,
        db::{candidate::NewCandidate, voter::NewVoter},
        store::{JsonStore, Store},
    };
    use crate::voting::VotePolicy;

    use super::*;

    #[backend_test]
    async fn register_and_fetch(client: Client) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(VoterSpec::example()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let registered: Registered = response.into_json().await.unwrap();
        assert_eq!(registered.message, "Votante registrado exitosamente");

        let dni = VoterSpec::example().dni;
        let response = client.get(uri!(voter(dni.as_str()))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let voter: VoterDesc = response.into_json().await.unwrap();
        assert_eq!(voter.id_votantes, registered.id_votantes);
        assert_eq!(voter.nombres, "Rosa Elvira");
        assert_eq!(voter.fecha_voto, None);
    }

    #[backend_test]
    async fn duplicate_dni_rejected(client: Client) {
        let mut responses = Vec::new();
        for _ in 0..2 {
            let response = client
                .post(uri!(register))
                .header(ContentType::JSON)
                .body(json!(VoterSpec::example()).to_string())
                .dispatch()
                .await;
            responses.push((response.status(), response.into_string().await.unwrap()));
        }

        assert_eq!(Status::Ok, responses[0].0);
        assert_eq!(Status::BadRequest, responses[1].0);
        assert!(responses[1].1.contains("El DNI ya está registrado"));
    }

    #[backend_test]
    async fn malformed_birth_date_rejected(client: Client) {
        let mut body = json!(VoterSpec::example());
        body["fecha_nacimiento"] = json!("21/03/1988");
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;

        assert!(response.status().class().is_client_error());
    }

    #[backend_test]
    async fn unknown_dni(client: Client) {
        let response = client.get(uri!(voter("00000000"))).dispatch().await;

        assert_eq!(Status::NotFound, response.status());
        let body = response.into_string().await.unwrap();
        assert!(body.contains("Votante no encontrado"));
    }

    #[backend_test]
    async fn status_follows_votes(client: Client, store: JsonStore) {
        let dni = NewVoter::example().national_id;

        // Unregistered voters may vote everywhere.
        let response = client.get(uri!(voter_status(dni.as_str()))).dispatch().await;
        let status: VoterStatus = response.into_json().await.unwrap();
        assert_eq!(status, VoterStatus::unregistered());

        let voter = store.insert_voter(NewVoter::example()).await.unwrap();
        let candidate = store
            .insert_candidate(NewCandidate::example(Category::Regional))
            .await
            .unwrap();
        voting::cast_vote(
            &store,
            VotePolicy::default(),
            Category::Regional,
            voter.id,
            candidate.id,
        )
        .await
        .unwrap();

        let response = client.get(uri!(voter_status(dni.as_str()))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let status: VoterStatus = response.into_json().await.unwrap();
        assert!(status.can_vote_presidencial);
        assert!(!status.can_vote_regional);
        assert!(status.can_vote_distrital);
        assert!(!status.has_all_votes);
    }

    #[backend_test]
    async fn list_newest_first(client: Client, store: JsonStore) {
        let first = store.insert_voter(NewVoter::example()).await.unwrap();
        let second = store.insert_voter(NewVoter::example2()).await.unwrap();

        let response = client.get("/votantes").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let page: Paginated<VoterDesc> = response.into_json().await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset, 0);
        let ids: Vec<_> = page.items.iter().map(|v| v.id_votantes).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let response = client.get("/votantes?limit=1&offset=1").dispatch().await;
        let page: Paginated<VoterDesc> = response.into_json().await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id_votantes, first.id);
    }

    #[backend_test]
    async fn empty_page_size_refused(client: Client, store: JsonStore) {
        store.insert_voter(NewVoter::example()).await.unwrap();

        let response = client.get("/votantes?limit=0").dispatch().await;
        assert!(response.status().class().is_client_error());
        let body: Value = response.into_json().await.unwrap();
        assert!(body["detail"].is_string());
        assert!(body.get("items").is_none());
    }
}
