use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use mongodb::bson::{from_bson, to_bson, Bson};
use rocket::{
    serde::json::serde_json,
    tokio::{
        fs,
        sync::{Mutex, OwnedMutexGuard},
    },
};
use serde::{Deserialize, Serialize};

use crate::config::Isolation;
use crate::error::{Error, Result};
use crate::model::{
    common::{CandidateId, Category, UserId, VoteCounts, VoterId},
    db::{
        candidate::{Candidate, NewCandidate},
        user::{NewUser, User},
        vote::{NullVote, Vote},
        voter::{NewVoter, Voter},
    },
    mongodb::{Counter, CANDIDATE_COUNTER_ID, USER_COUNTER_ID, VOTER_COUNTER_ID},
};
use crate::voting::VoteError;

use super::{BallotTxn, Snapshot, Store, VoteLedger};

/// Every table of the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    users: Vec<User>,
    voters: Vec<Voter>,
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
    null_votes: Vec<NullVote>,
    counters: Vec<Counter>,
}

impl Tables {
    fn next_id(&mut self, id: &str) -> u32 {
        let index = match self.counters.iter().position(|counter| counter.id == id) {
            Some(index) => index,
            None => {
                self.counters.push(Counter::new(id));
                self.counters.len() - 1
            }
        };
        self.counters[index].take()
    }

    fn voter(&self, id: VoterId) -> Option<&Voter> {
        self.voters.iter().find(|voter| voter.id == id)
    }

    fn candidate(&self, category: Category, id: CandidateId) -> Option<&Candidate> {
        self.candidates
            .iter()
            .find(|candidate| candidate.category == category && candidate.id == id)
    }

    fn vote_counts(&self, voter_id: VoterId) -> VoteCounts {
        let mut counts = VoteCounts::default();
        for vote in self.votes.iter().filter(|vote| vote.voter_id == voter_id) {
            *counts.get_mut(vote.category) += 1;
        }
        counts
    }

    fn apply(&mut self, write: StagedWrite) -> Result<()> {
        match write {
            StagedWrite::Vote(vote) => self.votes.push(vote),
            StagedWrite::NullVote(vote) => self.null_votes.push(vote),
            StagedWrite::Tally(category, id) => {
                let candidate = self
                    .candidates
                    .iter_mut()
                    .find(|candidate| candidate.category == category && candidate.id == id)
                    .ok_or(VoteError::CandidateNotFound(category))?;
                candidate.votes += 1;
            }
            StagedWrite::Stamp(id, at) => {
                let voter = self
                    .voters
                    .iter_mut()
                    .find(|voter| voter.id == id)
                    .ok_or(VoteError::VoterNotFound)?;
                voter.last_vote_at = Some(at);
            }
        }
        Ok(())
    }
}

/// A write held back until its transaction commits.
#[derive(Debug)]
enum StagedWrite {
    Vote(Vote),
    Tally(Category, CandidateId),
    Stamp(VoterId, DateTime<Utc>),
    NullVote(NullVote),
}

/// A store holding every table in memory behind one lock, optionally
/// mirrored to a MongoDB Extended JSON file after every write.
#[derive(Clone)]
pub struct JsonStore {
    tables: Arc<Mutex<Tables>>,
    path: Option<Arc<PathBuf>>,
}

impl JsonStore {
    /// An empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            path: None,
        }
    }

    /// Load the store from `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tables = match fs::read(&path).await {
            Ok(bytes) => {
                let value: serde_json::Value = serde_json::from_slice(&bytes)?;
                let tables: Tables = from_bson(Bson::try_from(value)?)?;
                debug!(
                    "Loaded {} voters and {} votes from {}",
                    tables.voters.len(),
                    tables.votes.len(),
                    path.display()
                );
                tables
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store file at {}, starting empty", path.display());
                Tables::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
            path: Some(Arc::new(path)),
        })
    }

    /// Write the tables to disk, replacing the previous file in one step.
    async fn persist(&self, tables: &Tables) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = to_bson(tables)?.into_relaxed_extjson();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&json)?).await?;
        fs::rename(&tmp, &**path).await?;
        Ok(())
    }

    /// Apply `change` to a copy of the tables, and only keep it if both the
    /// change and persisting it succeed.
    async fn write<T>(&self, change: impl FnOnce(&mut Tables) -> Result<T> + Send) -> Result<T> {
        let mut tables = self.tables.lock().await;
        self.write_locked(&mut tables, change).await
    }

    async fn write_locked<T>(
        &self,
        tables: &mut Tables,
        change: impl FnOnce(&mut Tables) -> Result<T> + Send,
    ) -> Result<T> {
        let mut next = tables.clone();
        let result = change(&mut next)?;
        self.persist(&next).await?;
        *tables = next;
        Ok(result)
    }

    async fn read<T>(&self, query: impl FnOnce(&Tables) -> T + Send) -> T {
        query(&*self.tables.lock().await)
    }
}

#[rocket::async_trait]
impl VoteLedger for JsonStore {
    async fn begin<'a>(&'a self, isolation: Isolation) -> Result<Box<dyn BallotTxn + 'a>> {
        // A serializable transaction keeps everyone else out until it ends.
        let guard = match isolation {
            Isolation::Serializable => Some(self.tables.clone().lock_owned().await),
            Isolation::Racy => None,
        };
        Ok(Box::new(JsonTxn {
            store: self,
            guard,
            staged: Vec::new(),
        }))
    }
}

/// A transaction on a [`JsonStore`]. Writes are staged and applied together
/// on commit.
struct JsonTxn<'a> {
    store: &'a JsonStore,
    guard: Option<OwnedMutexGuard<Tables>>,
    staged: Vec<StagedWrite>,
}

impl JsonTxn<'_> {
    async fn read<T>(&self, query: impl FnOnce(&Tables) -> T + Send) -> T {
        match &self.guard {
            Some(tables) => query(&**tables),
            None => self.store.read(query).await,
        }
    }
}

#[rocket::async_trait]
impl BallotTxn for JsonTxn<'_> {
    async fn voter(&mut self, id: VoterId) -> Result<Option<Voter>> {
        Ok(self.read(|tables| tables.voter(id).cloned()).await)
    }

    async fn vote_counts(&mut self, voter_id: VoterId) -> Result<VoteCounts> {
        Ok(self.read(|tables| tables.vote_counts(voter_id)).await)
    }

    async fn candidate(
        &mut self,
        category: Category,
        id: CandidateId,
    ) -> Result<Option<Candidate>> {
        Ok(self
            .read(|tables| tables.candidate(category, id).cloned())
            .await)
    }

    async fn append_vote(&mut self, vote: &Vote) -> Result<()> {
        self.staged.push(StagedWrite::Vote(vote.clone()));
        Ok(())
    }

    async fn increment_tally(&mut self, category: Category, id: CandidateId) -> Result<()> {
        self.staged.push(StagedWrite::Tally(category, id));
        Ok(())
    }

    async fn append_null_vote(&mut self, vote: &NullVote) -> Result<()> {
        self.staged.push(StagedWrite::NullVote(vote.clone()));
        Ok(())
    }

    async fn stamp_voter(&mut self, id: VoterId, at: DateTime<Utc>) -> Result<()> {
        self.staged.push(StagedWrite::Stamp(id, at));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self {
            store,
            guard,
            staged,
        } = *self;
        let apply = move |tables: &mut Tables| {
            staged.into_iter().try_for_each(|write| tables.apply(write))
        };
        match guard {
            Some(mut tables) => store.write_locked(&mut *tables, apply).await,
            None => store.write(apply).await,
        }
    }
}

#[rocket::async_trait]
impl Store for JsonStore {
    async fn user_by_email(&self, correo: &str) -> Result<Option<User>> {
        Ok(self
            .read(|tables| tables.users.iter().find(|user| user.correo == correo).cloned())
            .await)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self
            .read(|tables| tables.users.iter().find(|user| user.id == id).cloned())
            .await)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        self.write(|tables| {
            if tables.users.iter().any(|other| other.correo == user.correo) {
                return Err(Error::conflict("El correo ya está registrado"));
            }
            let user = User {
                id: tables.next_id(USER_COUNTER_ID),
                user,
            };
            tables.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn count_admins(&self) -> Result<u64> {
        Ok(self
            .read(|tables| tables.users.iter().filter(|user| user.is_admin()).count() as u64)
            .await)
    }

    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter> {
        self.write(|tables| {
            if tables
                .voters
                .iter()
                .any(|other| other.national_id == voter.national_id)
            {
                return Err(Error::conflict("El DNI ya está registrado"));
            }
            let voter = Voter::new(tables.next_id(VOTER_COUNTER_ID), voter);
            tables.voters.push(voter.clone());
            Ok(voter)
        })
        .await
    }

    async fn voter_by_id(&self, id: VoterId) -> Result<Option<Voter>> {
        Ok(self.read(|tables| tables.voter(id).cloned()).await)
    }

    async fn voter_by_national_id(&self, national_id: &str) -> Result<Option<Voter>> {
        Ok(self
            .read(|tables| {
                tables
                    .voters
                    .iter()
                    .find(|voter| voter.national_id == national_id)
                    .cloned()
            })
            .await)
    }

    async fn voters_page(&self, limit: u32, offset: u32) -> Result<(Vec<Voter>, u64)> {
        Ok(self
            .read(|tables| {
                let mut voters: Vec<_> = tables.voters.iter().collect();
                voters.sort_by(|a, b| b.id.cmp(&a.id));
                let page = voters
                    .into_iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .cloned()
                    .collect();
                (page, tables.voters.len() as u64)
            })
            .await)
    }

    async fn vote_counts(&self, voter_id: VoterId) -> Result<VoteCounts> {
        Ok(self.read(|tables| tables.vote_counts(voter_id)).await)
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        self.write(|tables| {
            let candidate = Candidate {
                id: tables.next_id(CANDIDATE_COUNTER_ID),
                candidate,
            };
            tables.candidates.push(candidate.clone());
            Ok(candidate)
        })
        .await
    }

    async fn candidates(&self, category: Category) -> Result<Vec<Candidate>> {
        Ok(self
            .read(|tables| {
                tables
                    .candidates
                    .iter()
                    .filter(|candidate| candidate.category == category)
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn candidate_by_id(
        &self,
        category: Category,
        id: CandidateId,
    ) -> Result<Option<Candidate>> {
        Ok(self
            .read(|tables| tables.candidate(category, id).cloned())
            .await)
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        Ok(self
            .read(|tables| Snapshot {
                voters: tables.voters.clone(),
                candidates: tables.candidates.clone(),
                votes: tables.votes.clone(),
                null_votes: tables.null_votes.clone(),
            })
            .await)
    }
}
