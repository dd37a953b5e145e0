use log::info;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    logging::RequestId,
    model::{
        api::vote::{Message, NullVoteSpec, VoteSpec},
        common::{Category, UnknownCategory},
        store::Backend,
    },
    voting, Config,
};

pub fn routes() -> Vec<Route> {
    routes![cast_null_vote, cast_vote]
}

/// Takes priority over [`cast_vote`], as `nulo` is a static segment.
#[post("/votos/nulo", data = "<vote>", format = "json")]
async fn cast_null_vote(
    vote: Json<NullVoteSpec>,
    backend: &State<Backend>,
    config: &State<Config>,
    request_id: &RequestId,
) -> Result<Json<Message>> {
    let NullVoteSpec { id_votantes, dni } = vote.into_inner();
    let vote =
        voting::cast_null_vote(backend.store(), config.vote_policy(), id_votantes, dni).await?;
    info!("req{request_id}: voter {} cast a null vote", vote.voter_id);

    Ok(Json(Message::new("Voto nulo registrado exitosamente")))
}

#[post("/votos/<category>", data = "<vote>", format = "json")]
async fn cast_vote(
    category: std::result::Result<Category, UnknownCategory>,
    vote: Json<VoteSpec>,
    backend: &State<Backend>,
    config: &State<Config>,
    request_id: &RequestId,
) -> Result<Json<Message>> {
    let category = category?;
    let vote = voting::cast_vote(
        backend.store(),
        config.vote_policy(),
        category,
        vote.id_votantes,
        vote.id_candidato,
    )
    .await?;
    info!(
        "req{request_id}: voter {} cast a {category} vote for candidate {}",
        vote.voter_id, vote.candidate_id
    );

    Ok(Json(Message::new(format!(
        "Voto {category} registrado exitosamente"
    ))))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{serde_json::json, Value},
    };

    use crate::model::{
        db::{
            candidate::{Candidate, NewCandidate},
            voter::{NewVoter, Voter},
        },
        store::{JsonStore, Store},
    };

    use super::*;

    /// A registered voter and one candidate per category.
    async fn setup(store: &JsonStore) -> (Voter, [Candidate; 3]) {
        let voter = store.insert_voter(NewVoter::example()).await.unwrap();
        let mut candidates = Vec::new();
        for category in Category::ALL {
            candidates.push(
                store
                    .insert_candidate(NewCandidate::example(category))
                    .await
                    .unwrap(),
            );
        }
        (voter, candidates.try_into().unwrap())
    }

    async fn post<'c>(client: &'c Client, path: &str, body: Value) -> LocalResponse<'c> {
        client
            .post(path.to_string())
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await
    }

    async fn message(response: LocalResponse<'_>) -> String {
        let body: Value = response.into_json().await.unwrap();
        body["message"]
            .as_str()
            .or(body["detail"].as_str())
            .unwrap()
            .to_string()
    }

    #[backend_test]
    async fn one_vote_per_category(client: Client, store: JsonStore) {
        let (voter, [presidential, _, _]) = setup(&store).await;
        let vote = json!({"id_votantes": voter.id, "id_candidato": presidential.id});

        let response = post(&client, "/votos/presidencial", vote.clone()).await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            message(response).await,
            "Voto presidencial registrado exitosamente"
        );

        let response = post(&client, "/votos/presidencial", vote).await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(
            message(response).await,
            "El votante ya ha ejercido su voto presidencial"
        );

        let candidates = store.candidates(Category::Presidential).await.unwrap();
        assert_eq!(candidates[0].votes, 1);
        let voter = store.voter_by_id(voter.id).await.unwrap().unwrap();
        assert!(voter.last_vote_at.is_some());
    }

    #[backend_test]
    async fn category_field_names(client: Client, store: JsonStore) {
        let (voter, [_, regional, district]) = setup(&store).await;

        let response = post(
            &client,
            "/votos/regional",
            json!({"id_votantes": voter.id, "id_candidato_regional": regional.id, "region": "Cusco"}),
        )
        .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(message(response).await, "Voto regional registrado exitosamente");

        let response = post(
            &client,
            "/votos/distrital",
            json!({"id_votantes": voter.id, "id_candidato_distrital": district.id, "distrito": "Wanchaq"}),
        )
        .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(message(response).await, "Voto distrital registrado exitosamente");
    }

    #[backend_test]
    async fn exhausted_voter_refused(client: Client, store: JsonStore) {
        let (voter, candidates) = setup(&store).await;
        for (category, candidate) in Category::ALL.into_iter().zip(&candidates) {
            let response = post(
                &client,
                &format!("/votos/{category}"),
                json!({"id_votantes": voter.id, "id_candidato": candidate.id}),
            )
            .await;
            assert_eq!(Status::Ok, response.status());
        }

        let response = post(
            &client,
            "/votos/regional",
            json!({"id_votantes": voter.id, "id_candidato": candidates[1].id}),
        )
        .await;
        assert_eq!(Status::BadRequest, response.status());
        assert!(message(response).await.contains("todos sus votos"));
    }

    #[backend_test]
    async fn unknown_voter_and_candidate(client: Client, store: JsonStore) {
        let (voter, [presidential, regional, _]) = setup(&store).await;

        let response = post(
            &client,
            "/votos/presidencial",
            json!({"id_votantes": 999, "id_candidato": presidential.id}),
        )
        .await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(message(response).await, "Votante no encontrado");

        // A regional candidate does not stand in the presidential ballot.
        let response = post(
            &client,
            "/votos/presidencial",
            json!({"id_votantes": voter.id, "id_candidato": regional.id}),
        )
        .await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(message(response).await, "Candidato presidencial no encontrado");

        let snapshot = store.snapshot().await.unwrap();
        assert!(snapshot.votes.is_empty());
    }

    #[backend_test]
    async fn null_votes(client: Client, store: JsonStore) {
        let (voter, _) = setup(&store).await;
        let vote = json!({"id_votantes": voter.id, "dni": voter.national_id});

        for _ in 0..2 {
            let response = post(&client, "/votos/nulo", vote.clone()).await;
            assert_eq!(Status::Ok, response.status());
            assert_eq!(message(response).await, "Voto nulo registrado exitosamente");
        }

        let response = post(
            &client,
            "/votos/nulo",
            json!({"id_votantes": 999, "dni": "00000000"}),
        )
        .await;
        assert_eq!(Status::NotFound, response.status());

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.null_votes.len(), 2);
        assert!(snapshot.votes.is_empty());
        // Null votes never close a category.
        let counts = store.vote_counts(voter.id).await.unwrap();
        assert!(!counts.has_voted(Category::Presidential));
    }

    #[backend_test]
    async fn malformed_vote_rejected(client: Client, store: JsonStore) {
        setup(&store).await;

        let response = post(&client, "/votos/presidencial", json!({"id_votantes": 1})).await;
        assert!(response.status().class().is_client_error());

        let response = post(&client, "/votos/senado", json!({"id_votantes": 1, "id_candidato": 1})).await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(message(response).await, "No encontrado: Categoría 'senado'");
    }

    #[backend_test]
    async fn plural_ballot_path_refused(client: Client, store: JsonStore) {
        let (voter, [presidential, _, _]) = setup(&store).await;

        let response = post(
            &client,
            "/votos/presidenciales",
            json!({"id_votantes": voter.id, "id_candidato": presidential.id}),
        )
        .await;
        assert_eq!(Status::NotFound, response.status());

        let snapshot = store.snapshot().await.unwrap();
        assert!(snapshot.votes.is_empty());
    }
}
