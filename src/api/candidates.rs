use log::info;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    logging::RequestId,
    model::{
        api::{
            auth::Admin,
            candidate::{CandidateCreated, CandidateDesc, CandidateSpec},
        },
        common::{CandidateCategory, UnknownCategory},
        store::Backend,
    },
};

pub fn routes() -> Vec<Route> {
    routes![candidates, create_candidate]
}

#[get("/candidatos/<category>")]
async fn candidates(
    category: std::result::Result<CandidateCategory, UnknownCategory>,
    backend: &State<Backend>,
) -> Result<Json<Vec<CandidateDesc>>> {
    let candidates = backend.candidates(category?.0).await?;
    Ok(Json(candidates.into_iter().map(CandidateDesc::from).collect()))
}

#[post("/candidatos/<category>", data = "<spec>", format = "json")]
async fn create_candidate(
    admin: Admin,
    category: std::result::Result<CandidateCategory, UnknownCategory>,
    spec: Json<CandidateSpec>,
    backend: &State<Backend>,
    request_id: &RequestId,
) -> Result<Json<CandidateCreated>> {
    let CandidateCategory(category) = category?;
    let candidate = backend
        .insert_candidate(spec.into_inner().into_candidate(category))
        .await?;
    info!(
        "req{request_id}: admin {} created {category} candidate {}",
        admin.id, candidate.id
    );

    Ok(Json(candidate.into()))
}
