//! Vote eligibility and tallying.
//!
//! A voter may cast at most one vote in each [`Category`], plus any number
//! of null votes. Every accepted vote appends a ledger record, increments
//! the candidate's tally and stamps the voter, all in one transaction.
//! Transactions aborted by a concurrent write are run again from the start.

use std::{future::Future, time::Duration};

use chrono::Utc;
use log::{debug, info, warn};
use rocket::{http::Status, tokio::time::sleep};
use thiserror::Error;

use crate::config::{Isolation, StampPolicy};
use crate::error::Result;
use crate::model::{
    common::{CandidateId, Category, VoterId, VoterStatus},
    db::vote::{NullVote, Vote},
    store::{Store, VoteLedger},
};

/// Reasons a vote is refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VoteError {
    #[error("Votante no encontrado")]
    VoterNotFound,
    #[error("Candidato {0} no encontrado")]
    CandidateNotFound(Category),
    #[error("El votante ya ha ejercido su voto {0}")]
    CategoryAlreadyVoted(Category),
    #[error("El votante ya ha ejercido todos sus votos (presidencial, regional y distrital)")]
    AllCategoriesExhausted,
}

impl VoteError {
    pub fn status(&self) -> Status {
        match self {
            Self::VoterNotFound | Self::CandidateNotFound(_) => Status::NotFound,
            Self::CategoryAlreadyVoted(_) | Self::AllCategoriesExhausted => Status::BadRequest,
        }
    }
}

/// How votes are recorded.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct VotePolicy {
    pub isolation: Isolation,
    pub stamp: StampPolicy,
}

impl VotePolicy {
    fn stamps(&self, category: Category) -> bool {
        match self.stamp {
            StampPolicy::EveryVote => true,
            StampPolicy::PresidentialAndNull => category == Category::Presidential,
        }
    }
}

/// Attempts at one vote before a transient abort is reported to the caller.
pub const MAX_VOTE_ATTEMPTS: u32 = 5;

/// Run `attempt` until it succeeds, fails for good, or has been aborted
/// [`MAX_VOTE_ATTEMPTS`] times. Each run is a fresh transaction, so it
/// re-reads eligibility and sees whatever the conflicting one committed.
async fn retry_transient<T, F, Fut>(what: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(err) if err.is_transient() && tries < MAX_VOTE_ATTEMPTS => {
                warn!("{what} aborted on attempt {tries}, retrying: {err}");
                sleep(Duration::from_millis(10 * u64::from(tries))).await;
                tries += 1;
            }
            outcome => return outcome,
        }
    }
}

/// Record a vote by `voter_id` for `candidate_id` in `category`.
///
/// The eligibility checks run in order: the voter must exist, must not have
/// voted in every category, must not have voted in this one, and the
/// candidate must stand in this category. Nothing is written unless all of
/// them pass.
pub async fn cast_vote<L>(
    ledger: &L,
    policy: VotePolicy,
    category: Category,
    voter_id: VoterId,
    candidate_id: CandidateId,
) -> Result<Vote>
where
    L: VoteLedger + ?Sized,
{
    retry_transient("Vote", || {
        record_vote(ledger, policy, category, voter_id, candidate_id)
    })
    .await
}

async fn record_vote<L>(
    ledger: &L,
    policy: VotePolicy,
    category: Category,
    voter_id: VoterId,
    candidate_id: CandidateId,
) -> Result<Vote>
where
    L: VoteLedger + ?Sized,
{
    let mut txn = ledger.begin(policy.isolation).await?;

    let voter = txn
        .voter(voter_id)
        .await?
        .ok_or(VoteError::VoterNotFound)?;

    let counts = txn.vote_counts(voter.id).await?;
    if counts.all_exhausted() {
        return Err(VoteError::AllCategoriesExhausted.into());
    }
    if counts.has_voted(category) {
        return Err(VoteError::CategoryAlreadyVoted(category).into());
    }

    let candidate = txn
        .candidate(category, candidate_id)
        .await?
        .ok_or(VoteError::CandidateNotFound(category))?;

    let now = Utc::now();
    let vote = Vote::new(voter.id, &candidate, now);
    txn.append_vote(&vote).await?;
    txn.increment_tally(category, candidate.id).await?;
    if policy.stamps(category) {
        txn.stamp_voter(voter.id, now).await?;
    }
    txn.commit().await?;

    debug!("Recorded {category} vote {} for candidate {}", vote.id, candidate.id);
    Ok(vote)
}

/// Record a null vote. There is no eligibility check beyond the voter existing.
pub async fn cast_null_vote<L>(
    ledger: &L,
    policy: VotePolicy,
    voter_id: VoterId,
    national_id: String,
) -> Result<NullVote>
where
    L: VoteLedger + ?Sized,
{
    retry_transient("Null vote", || {
        record_null_vote(ledger, policy, voter_id, national_id.clone())
    })
    .await
}

async fn record_null_vote<L>(
    ledger: &L,
    policy: VotePolicy,
    voter_id: VoterId,
    national_id: String,
) -> Result<NullVote>
where
    L: VoteLedger + ?Sized,
{
    let mut txn = ledger.begin(policy.isolation).await?;

    let voter = txn
        .voter(voter_id)
        .await?
        .ok_or(VoteError::VoterNotFound)?;

    let now = Utc::now();
    let vote = NullVote::new(voter.id, national_id, now);
    txn.append_null_vote(&vote).await?;
    txn.stamp_voter(voter.id, now).await?;
    txn.commit().await?;

    info!("Recorded null vote {} by voter {}", vote.id, voter.id);
    Ok(vote)
}

/// Which ballots the holder of `national_id` may still cast. Unregistered
/// national IDs may cast all of them.
pub async fn voter_status(store: &dyn Store, national_id: &str) -> Result<VoterStatus> {
    match store.voter_by_national_id(national_id).await? {
        Some(voter) => Ok(store.vote_counts(voter.id).await?.status()),
        None => Ok(VoterStatus::unregistered()),
    }
}
