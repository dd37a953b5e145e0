//! Storage backends.
//!
//! Everything the server persists goes through [`Store`]. MongoDB is the
//! production backend; [`JsonStore`] keeps the same documents in memory,
//! optionally mirrored to a file, and backs the route tests.

use std::ops::Deref;

use chrono::{DateTime, Utc};

use crate::config::Isolation;
use crate::error::Result;
use crate::model::{
    common::{CandidateId, Category, UserId, VoteCounts, VoterId},
    db::{
        candidate::{Candidate, NewCandidate},
        user::{NewUser, User},
        vote::{NullVote, Vote},
        voter::{NewVoter, Voter},
    },
};

mod json;
mod mongo;

pub use json::JsonStore;
pub use mongo::MongoStore;

/// Something that can open a [`BallotTxn`].
#[rocket::async_trait]
pub trait VoteLedger: Send + Sync {
    /// Open a unit of work for recording one vote.
    ///
    /// Under [`Isolation::Serializable`] every read and write of the returned
    /// transaction is isolated from other transactions. Under
    /// [`Isolation::Racy`] reads see whatever is committed at the time, and
    /// only the writes are applied together.
    async fn begin<'a>(&'a self, isolation: Isolation) -> Result<Box<dyn BallotTxn + 'a>>;
}

/// A unit of work recording votes. Writes only become visible on
/// [`BallotTxn::commit`]; dropping the transaction discards them.
#[rocket::async_trait]
pub trait BallotTxn: Send {
    async fn voter(&mut self, id: VoterId) -> Result<Option<Voter>>;

    async fn vote_counts(&mut self, voter_id: VoterId) -> Result<VoteCounts>;

    async fn candidate(&mut self, category: Category, id: CandidateId)
        -> Result<Option<Candidate>>;

    async fn append_vote(&mut self, vote: &Vote) -> Result<()>;

    async fn increment_tally(&mut self, category: Category, id: CandidateId) -> Result<()>;

    async fn append_null_vote(&mut self, vote: &NullVote) -> Result<()>;

    async fn stamp_voter(&mut self, id: VoterId, at: DateTime<Utc>) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// A storage backend for every entity the server keeps.
#[rocket::async_trait]
pub trait Store: VoteLedger {
    async fn user_by_email(&self, correo: &str) -> Result<Option<User>>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Fails with a conflict if the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn count_admins(&self) -> Result<u64>;

    /// Fails with a conflict if the national ID is already registered.
    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter>;

    async fn voter_by_id(&self, id: VoterId) -> Result<Option<Voter>>;

    async fn voter_by_national_id(&self, national_id: &str) -> Result<Option<Voter>>;

    /// A page of voters, newest first, along with the total number of voters.
    async fn voters_page(&self, limit: u32, offset: u32) -> Result<(Vec<Voter>, u64)>;

    async fn vote_counts(&self, voter_id: VoterId) -> Result<VoteCounts>;

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate>;

    /// Candidates of one category, in creation order.
    async fn candidates(&self, category: Category) -> Result<Vec<Candidate>>;

    async fn candidate_by_id(&self, category: Category, id: CandidateId)
        -> Result<Option<Candidate>>;

    /// Read every voter, candidate and ledger entry at a single point in time.
    async fn snapshot(&self) -> Result<Snapshot>;
}

/// A consistent view of the whole electoral roll and all ledgers.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub voters: Vec<Voter>,
    pub candidates: Vec<Candidate>,
    pub votes: Vec<Vote>,
    pub null_votes: Vec<NullVote>,
}

impl Snapshot {
    pub fn candidates_in(&self, category: Category) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |candidate| candidate.category == category)
    }

    pub fn votes_in(&self, category: Category) -> impl Iterator<Item = &Vote> {
        self.votes
            .iter()
            .filter(move |vote| vote.category == category)
    }
}

/// The configured store, in Rocket managed state.
pub struct Backend(Box<dyn Store>);

impl Backend {
    pub fn new(store: Box<dyn Store>) -> Self {
        Self(store)
    }

    pub fn store(&self) -> &dyn Store {
        &*self.0
    }
}

impl Deref for Backend {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
