use chrono::Utc;
use log::info;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    logging::RequestId,
    model::store::Backend,
    reporting::{
        self, AnalysisStats, DataQualityReport, HourlyVotes, ProcessingStatus, TrainingStats,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        analyze_quality,
        processing_status,
        analysis_stats,
        voting_flow,
        training_stats
    ]
}

#[post("/processing/analyze-quality")]
async fn analyze_quality(
    backend: &State<Backend>,
    request_id: &RequestId,
) -> Result<Json<DataQualityReport>> {
    let snapshot = backend.snapshot().await?;
    let report = reporting::data_quality(&snapshot);
    info!(
        "req{request_id}: quality of {} voter records analysed, {} duplicates",
        report.total_records, report.duplicate_count
    );
    Ok(Json(report))
}

#[get("/processing/status")]
async fn processing_status(backend: &State<Backend>) -> Result<Json<ProcessingStatus>> {
    let snapshot = backend.snapshot().await?;
    Ok(Json(reporting::processing_status(&snapshot, Utc::now())))
}

#[get("/analysis/stats")]
async fn analysis_stats(backend: &State<Backend>) -> Result<Json<AnalysisStats>> {
    let snapshot = backend.snapshot().await?;
    Ok(Json(reporting::analysis_stats(&snapshot, Utc::now())))
}

#[get("/analysis/voting-flow")]
async fn voting_flow(backend: &State<Backend>) -> Result<Json<Vec<HourlyVotes>>> {
    let snapshot = backend.snapshot().await?;
    Ok(Json(reporting::voting_flow(&snapshot, Utc::now())))
}

#[get("/training/stats")]
async fn training_stats(backend: &State<Backend>) -> Result<Json<TrainingStats>> {
    let snapshot = backend.snapshot().await?;
    Ok(Json(reporting::training_stats(&snapshot)))
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;
    use rocket::{http::Status, local::asynchronous::Client, serde::json::Value};

    use crate::model::{
        common::Category,
        db::{candidate::NewCandidate, voter::NewVoter},
        store::{JsonStore, Store},
    };
    use crate::reporting::TRAINING_FEATURES;
    use crate::voting::{self, VotePolicy};

    use super::*;

    #[backend_test]
    async fn quality_report(client: Client, store: JsonStore) {
        store.insert_voter(NewVoter::example()).await.unwrap();
        store.insert_voter(NewVoter::example2()).await.unwrap();

        let response = client.post(uri!(analyze_quality)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let report: Value = response.into_json().await.unwrap();
        assert_eq!(report["totalRecords"], 2);
        assert_eq!(report["duplicateCount"], 0);
        assert_eq!(report["nullCounts"]["dni"], 0);
        assert_eq!(report["dataTypes"]["fecha_nacimiento"], "date");
    }

    #[backend_test]
    async fn idle_polling_day(client: Client) {
        let response = client.get(uri!(voting_flow)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let flow: Vec<HourlyVotes> = response.into_json().await.unwrap();
        assert_eq!(flow.len(), 10);
        assert_eq!(flow[0].hour, "08:00");
        assert_eq!(flow[9].hour, "17:00");
        assert!(flow.iter().all(|hour| hour.votes == 0));

        let response = client.get(uri!(analysis_stats)).dispatch().await;
        let stats: Value = response.into_json().await.unwrap();
        assert_eq!(stats["activeVoters"], 0);
        assert_eq!(stats["peakActivityTime"], Value::Null);

        let response = client.get(uri!(processing_status)).dispatch().await;
        let status: Value = response.into_json().await.unwrap();
        assert_eq!(status["voteCount"], 0);
        assert_eq!(status["hasNAData"], false);
        assert_eq!(status["processingHistory"], Value::Array(vec![]));

        let response = client.get(uri!(training_stats)).dispatch().await;
        let stats: TrainingStats = response.into_json().await.unwrap();
        assert_eq!(stats.valid_votes, 0);
        assert!(!stats.can_train);
        assert_eq!(stats.features, TRAINING_FEATURES);
    }

    #[backend_test]
    async fn todays_activity(client: Client, store: JsonStore) {
        let voter = store.insert_voter(NewVoter::example()).await.unwrap();
        store.insert_voter(NewVoter::example2()).await.unwrap();
        let candidate = store
            .insert_candidate(NewCandidate::example(Category::District))
            .await
            .unwrap();
        let vote = voting::cast_vote(
            &store,
            VotePolicy::default(),
            Category::District,
            voter.id,
            candidate.id,
        )
        .await
        .unwrap();
        let hour = format!("{:02}:00", vote.cast_at.hour());

        let response = client.get(uri!(analysis_stats)).dispatch().await;
        let stats: AnalysisStats = response.into_json().await.unwrap();
        // Allow for the test running across midnight.
        if Utc::now().date_naive() == vote.cast_at.date_naive() {
            assert_eq!(stats.active_voters, 1);
            assert_eq!(stats.peak_activity_time, Some(hour.clone()));

            let response = client.get(uri!(voting_flow)).dispatch().await;
            let flow: Vec<HourlyVotes> = response.into_json().await.unwrap();
            assert_eq!(flow, vec![HourlyVotes { hour, votes: 1 }]);
        }
        assert_eq!(stats.total_votes, 1);
        assert_eq!(stats.participation_rate, 50.0);

        let response = client.get(uri!(training_stats)).dispatch().await;
        let stats: TrainingStats = response.into_json().await.unwrap();
        assert_eq!(stats.valid_votes, 1);
        assert_eq!(stats.candidates, 1);
    }
}
