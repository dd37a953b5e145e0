use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, Category};

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub category: Category,
    pub given_names: String,
    pub surnames: String,
    /// Running tally. Only ever incremented, by recording a vote.
    pub votes: u64,
}

impl CandidateCore {
    /// A new candidate, with no votes yet.
    pub fn new(category: Category, given_names: String, surnames: String) -> Self {
        Self {
            category,
            given_names,
            surnames,
            votes: 0,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_names, self.surnames)
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: CandidateId,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}
