use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, Category, VoterId},
    db::candidate::Candidate,
    mongodb::Id,
};

/// A ledger entry recording one voter's vote in one category.
///
/// The candidate's names are copied in at cast time and never follow later
/// edits to the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    pub voter_id: VoterId,
    pub category: Category,
    pub candidate_id: CandidateId,
    pub candidate_given_names: String,
    pub candidate_surnames: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl Vote {
    /// Record a vote by `voter_id` for `candidate`, in the candidate's category.
    pub fn new(voter_id: VoterId, candidate: &Candidate, cast_at: DateTime<Utc>) -> Self {
        Self {
            id: Id::new(),
            voter_id,
            category: candidate.category,
            candidate_id: candidate.id,
            candidate_given_names: candidate.given_names.clone(),
            candidate_surnames: candidate.surnames.clone(),
            cast_at,
        }
    }
}

/// A ledger entry recording an abstention. Not tied to any candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullVote {
    #[serde(rename = "_id")]
    pub id: Id,
    pub voter_id: VoterId,
    pub national_id: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl NullVote {
    pub fn new(voter_id: VoterId, national_id: String, cast_at: DateTime<Utc>) -> Self {
        Self {
            id: Id::new(),
            voter_id,
            national_id,
            cast_at,
        }
    }
}
