use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        common::{Category, UnknownCategory},
        store::Backend,
    },
    reporting::{self, Results, ResultsStatus, ResultsSummary},
};

pub fn routes() -> Vec<Route> {
    routes![results, results_status, results_summary]
}

#[get("/resultados/<category>")]
async fn results(
    category: std::result::Result<Category, UnknownCategory>,
    backend: &State<Backend>,
) -> Result<Json<Results>> {
    let category = category?;
    let snapshot = backend.snapshot().await?;
    Ok(Json(reporting::results(&snapshot, category)))
}

#[get("/results/status")]
async fn results_status(backend: &State<Backend>) -> Result<Json<ResultsStatus>> {
    let snapshot = backend.snapshot().await?;
    Ok(Json(reporting::results_status(&snapshot, Utc::now())))
}

#[get("/results/summary")]
async fn results_summary(backend: &State<Backend>) -> Result<Json<ResultsSummary>> {
    let snapshot = backend.snapshot().await?;
    Ok(Json(reporting::results_summary(&snapshot)))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::Status,
        local::asynchronous::Client,
        serde::json::Value,
    };

    use crate::model::{
        db::{candidate::NewCandidate, voter::NewVoter},
        store::{JsonStore, Store},
    };
    use crate::reporting::{PresidentialResults, TallyResult};
    use crate::voting::{self, VotePolicy};

    use super::*;

    /// Two voters, both voting for the second presidential candidate, and
    /// one regional vote.
    async fn election(store: &JsonStore) {
        let voters = [
            store.insert_voter(NewVoter::example()).await.unwrap(),
            store.insert_voter(NewVoter::example2()).await.unwrap(),
        ];
        store
            .insert_candidate(NewCandidate::example(Category::Presidential))
            .await
            .unwrap();
        let favourite = store
            .insert_candidate(NewCandidate::example2(Category::Presidential))
            .await
            .unwrap();
        let regional = store
            .insert_candidate(NewCandidate::example(Category::Regional))
            .await
            .unwrap();

        for voter in &voters {
            voting::cast_vote(
                store,
                VotePolicy::default(),
                Category::Presidential,
                voter.id,
                favourite.id,
            )
            .await
            .unwrap();
        }
        voting::cast_vote(
            store,
            VotePolicy::default(),
            Category::Regional,
            voters[0].id,
            regional.id,
        )
        .await
        .unwrap();
    }

    #[backend_test]
    async fn presidential_results(client: Client, store: JsonStore) {
        election(&store).await;

        let response = client.get("/resultados/presidencial").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results: PresidentialResults = response.into_json().await.unwrap();
        assert_eq!(results.total_votos, 2);
        let rows: Vec<_> = results
            .candidatos
            .iter()
            .map(|row| (row.nombre.as_str(), row.votos, row.porcentaje))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Pedro Castañeda Vera", 2, 100.0),
                ("Ana María Flores Rojas", 0, 0.0),
            ]
        );
    }

    #[backend_test]
    async fn regional_results_are_a_list(client: Client, store: JsonStore) {
        election(&store).await;

        let response = client.get("/resultados/regional").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results: Vec<TallyResult> = response.into_json().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].votos, 1);

        let response = client.get("/resultados/distrital").dispatch().await;
        let results: Value = response.into_json().await.unwrap();
        assert_eq!(results, Value::Array(vec![]));
    }

    #[backend_test]
    async fn empty_election(client: Client) {
        let response = client.get("/resultados/presidencial").dispatch().await;
        let results: PresidentialResults = response.into_json().await.unwrap();
        assert_eq!(results.total_votos, 0);
        assert!(results.candidatos.is_empty());

        let response = client.get(uri!(results_summary)).dispatch().await;
        let summary: ResultsSummary = response.into_json().await.unwrap();
        assert_eq!(summary.participation_rate, 0.0);
    }

    #[backend_test]
    async fn status_and_summary(client: Client, store: JsonStore) {
        election(&store).await;
        store
            .insert_voter(NewVoter {
                national_id: "11223344".to_string(),
                ..NewVoter::example()
            })
            .await
            .unwrap();

        let response = client.get(uri!(results_status)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let status: Value = response.into_json().await.unwrap();
        assert_eq!(status["hasNullData"], true);
        assert_eq!(status["nullCount"], 1);
        assert_eq!(status["naCount"], 0);
        assert_eq!(status["totalVotes"], 2);
        assert!(status["lastUpdated"].is_string());

        let response = client.get(uri!(results_summary)).dispatch().await;
        let summary: ResultsSummary = response.into_json().await.unwrap();
        assert_eq!(summary.total_votes, 2);
        assert_eq!(summary.participation_rate, 66.67);
        assert_eq!(summary.candidates[0].votes, 2);
    }

    #[backend_test]
    async fn unknown_category(client: Client) {
        let response = client.get("/resultados/nulo").dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let response = client.get("/resultados/regionales").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["detail"], "No encontrado: Categoría 'regionales'");
    }
}
