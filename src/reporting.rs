//! Read-side reports, computed from a single [`Snapshot`] of the store.
//!
//! Everything here is a pure function of the snapshot and the current time.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, Category},
    db::candidate::Candidate,
    store::Snapshot,
};

/// Voters needed before a model may be trained on the turnout data.
pub const MIN_TRAINING_VOTES: u64 = 10;

/// Features offered for model training.
pub const TRAINING_FEATURES: [&str; 3] = ["Edad", "Educación", "Género"];

/// Hours reported by the voting flow when nobody has voted today.
const DEFAULT_FLOW_HOURS: std::ops::RangeInclusive<u32> = 8..=17;

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part` as a percentage of `whole`, or zero if `whole` is zero.
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

/// Candidates of a category, most votes first. Ties keep creation order.
fn ranked(snapshot: &Snapshot, category: Category) -> Vec<&Candidate> {
    let mut candidates: Vec<_> = snapshot.candidates_in(category).collect();
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes));
    candidates
}

fn total_votes(snapshot: &Snapshot, category: Category) -> u64 {
    snapshot
        .candidates_in(category)
        .map(|candidate| candidate.votes)
        .sum()
}

/// Times at which voters were last stamped.
fn stamps(snapshot: &Snapshot) -> impl Iterator<Item = DateTime<Utc>> + '_ {
    snapshot.voters.iter().filter_map(|voter| voter.last_vote_at)
}

/// Stamps from the same UTC day as `now`, counted by hour.
fn todays_stamps_by_hour(snapshot: &Snapshot, now: DateTime<Utc>) -> BTreeMap<u32, u64> {
    let today = now.date_naive();
    let mut hours = BTreeMap::new();
    for stamp in stamps(snapshot).filter(|stamp| stamp.date_naive() == today) {
        *hours.entry(stamp.hour()).or_default() += 1;
    }
    hours
}

fn hour_label(hour: u32) -> String {
    format!("{hour:02}:00")
}

/// One row of the presidential results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresidentialResult {
    pub id: CandidateId,
    pub nombre: String,
    pub votos: u64,
    pub porcentaje: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresidentialResults {
    pub total_votos: u64,
    pub candidatos: Vec<PresidentialResult>,
}

/// One row of the regional or district results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub id: CandidateId,
    pub nombre: String,
    pub votos: u64,
}

/// Results of one category. Only presidential results carry percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Results {
    Presidential(PresidentialResults),
    Tally(Vec<TallyResult>),
}

pub fn results(snapshot: &Snapshot, category: Category) -> Results {
    match category {
        Category::Presidential => Results::Presidential(presidential_results(snapshot)),
        _ => Results::Tally(
            ranked(snapshot, category)
                .into_iter()
                .map(|candidate| TallyResult {
                    id: candidate.id,
                    nombre: candidate.full_name(),
                    votos: candidate.votes,
                })
                .collect(),
        ),
    }
}

pub fn presidential_results(snapshot: &Snapshot) -> PresidentialResults {
    let total = total_votes(snapshot, Category::Presidential);
    PresidentialResults {
        total_votos: total,
        candidatos: ranked(snapshot, Category::Presidential)
            .into_iter()
            .map(|candidate| PresidentialResult {
                id: candidate.id,
                nombre: candidate.full_name(),
                votos: candidate.votes,
                porcentaje: percentage(candidate.votes, total),
            })
            .collect(),
    }
}

/// Percentage of registered voters that have voted at least once.
pub fn participation_rate(snapshot: &Snapshot) -> f64 {
    percentage(stamps(snapshot).count() as u64, snapshot.voters.len() as u64)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullCounts {
    pub dni: u64,
    pub nombres: u64,
    pub fecha_nacimiento: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTypes {
    pub dni: String,
    pub nombres: String,
    pub fecha_nacimiento: String,
}

impl Default for DataTypes {
    fn default() -> Self {
        Self {
            dni: "varchar".to_string(),
            nombres: "varchar".to_string(),
            fecha_nacimiento: "date".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    pub total_records: u64,
    pub null_counts: NullCounts,
    pub duplicate_count: u64,
    pub data_types: DataTypes,
}

/// Missing values and duplicate national IDs on the electoral roll.
pub fn data_quality(snapshot: &Snapshot) -> DataQualityReport {
    let voters = &snapshot.voters;
    let blank = |value: &str| value.trim().is_empty();
    let distinct: HashSet<_> = voters
        .iter()
        .filter(|voter| !blank(&voter.national_id))
        .map(|voter| voter.national_id.as_str())
        .collect();
    let identified = voters.len() - voters.iter().filter(|v| blank(&v.national_id)).count();

    DataQualityReport {
        total_records: voters.len() as u64,
        null_counts: NullCounts {
            dni: voters.iter().filter(|v| blank(&v.national_id)).count() as u64,
            nombres: voters.iter().filter(|v| blank(&v.given_names)).count() as u64,
            // Birth dates are parsed at registration and cannot be blank.
            fecha_nacimiento: 0,
        },
        duplicate_count: identified.saturating_sub(distinct.len()) as u64,
        data_types: DataTypes::default(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsStatus {
    pub has_null_data: bool,
    /// Voters who have not voted yet.
    pub null_count: u64,
    pub na_count: u64,
    /// Voters who have voted.
    pub total_votes: u64,
    pub last_updated: DateTime<Utc>,
}

pub fn results_status(snapshot: &Snapshot, now: DateTime<Utc>) -> ResultsStatus {
    let voted = stamps(snapshot).count() as u64;
    let not_voted = snapshot.voters.len() as u64 - voted;
    ResultsStatus {
        has_null_data: not_voted > 0,
        null_count: not_voted,
        na_count: 0,
        total_votes: voted,
        last_updated: now,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryCandidate {
    pub id: CandidateId,
    pub name: String,
    pub votes: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub total_votes: u64,
    pub candidates: Vec<SummaryCandidate>,
    pub participation_rate: f64,
}

/// The presidential race, with presidential votes as a share of the roll.
pub fn results_summary(snapshot: &Snapshot) -> ResultsSummary {
    let results = presidential_results(snapshot);
    ResultsSummary {
        total_votes: results.total_votos,
        participation_rate: percentage(results.total_votos, snapshot.voters.len() as u64),
        candidates: results
            .candidatos
            .into_iter()
            .map(|result| SummaryCandidate {
                id: result.id,
                name: result.nombre,
                votes: result.votos,
                percentage: result.porcentaje,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatus {
    pub vote_count: u64,
    #[serde(rename = "hasNAData")]
    pub has_na_data: bool,
    pub last_processed: DateTime<Utc>,
    pub processing_history: Vec<String>,
}

pub fn processing_status(snapshot: &Snapshot, now: DateTime<Utc>) -> ProcessingStatus {
    ProcessingStatus {
        vote_count: stamps(snapshot).count() as u64,
        has_na_data: false,
        last_processed: now,
        processing_history: Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    /// Voters who voted today.
    pub active_voters: u64,
    pub participation_rate: f64,
    /// The busiest hour today, e.g. `"14:00"`.
    pub peak_activity_time: Option<String>,
    pub total_votes: u64,
}

pub fn analysis_stats(snapshot: &Snapshot, now: DateTime<Utc>) -> AnalysisStats {
    let hours = todays_stamps_by_hour(snapshot, now);
    // The earliest hour wins a tie.
    let peak = hours
        .iter()
        .max_by(|(a_hour, a), (b_hour, b)| a.cmp(b).then(b_hour.cmp(a_hour)))
        .map(|(hour, _)| hour_label(*hour));
    AnalysisStats {
        active_voters: hours.values().sum(),
        participation_rate: participation_rate(snapshot),
        peak_activity_time: peak,
        total_votes: stamps(snapshot).count() as u64,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyVotes {
    pub hour: String,
    pub votes: u64,
}

/// Today's votes by hour, or an empty polling day if there are none.
pub fn voting_flow(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<HourlyVotes> {
    let hours = todays_stamps_by_hour(snapshot, now);
    if hours.is_empty() {
        return DEFAULT_FLOW_HOURS
            .map(|hour| HourlyVotes {
                hour: hour_label(hour),
                votes: 0,
            })
            .collect();
    }
    hours
        .into_iter()
        .map(|(hour, votes)| HourlyVotes {
            hour: hour_label(hour),
            votes,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStats {
    pub valid_votes: u64,
    /// Candidates that received at least one vote, over all categories.
    pub candidates: u64,
    pub features: Vec<String>,
    pub can_train: bool,
}

pub fn training_stats(snapshot: &Snapshot) -> TrainingStats {
    let valid_votes = stamps(snapshot).count() as u64;
    let candidates: HashSet<_> = snapshot
        .votes
        .iter()
        .map(|vote| (vote.category, vote.candidate_id))
        .collect();
    TrainingStats {
        valid_votes,
        candidates: candidates.len() as u64,
        features: TRAINING_FEATURES.iter().map(|f| f.to_string()).collect(),
        can_train: valid_votes >= MIN_TRAINING_VOTES,
    }
}
