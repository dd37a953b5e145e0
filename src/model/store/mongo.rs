use chrono::{DateTime, Utc};
use log::{debug, warn};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::{FindOptions, SessionOptions},
    Client, ClientSession, Database, SessionCursor,
};
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;

use crate::config::Isolation;
use crate::error::{Error, Result};
use crate::model::{
    common::{CandidateId, Category, UserId, VoteCounts, VoterId},
    db::{
        candidate::{Candidate, NewCandidate},
        user::{NewUser, User, ADMIN_ROLE},
        vote::{NullVote, Vote},
        voter::{NewVoter, Voter},
    },
    mongodb::{
        ensure_counters_exist, ensure_indexes_exist, is_duplicate_key_error, u32_id_filter, Coll,
        Counter, CANDIDATE_COUNTER_ID, USER_COUNTER_ID, VOTER_COUNTER_ID,
    },
};
use crate::voting::VoteError;

use super::{BallotTxn, Snapshot, Store, VoteLedger};

/// The production store: one MongoDB database, accessed through the driver's
/// connection pool.
pub struct MongoStore {
    client: Client,
    users: Coll<User>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    null_votes: Coll<NullVote>,
    counters: Coll<Counter>,
}

impl MongoStore {
    /// Connect to the database `db_name` at `uri` and make sure its indexes
    /// and counters exist.
    pub async fn connect(uri: &str, db_name: &str, isolation: Isolation) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db, isolation).await?;
        let store = Self::new(client, &db);
        ensure_counters_exist(&store.counters).await?;
        Ok(store)
    }

    fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            users: Coll::from_db(db),
            voters: Coll::from_db(db),
            candidates: Coll::from_db(db),
            votes: Coll::from_db(db),
            null_votes: Coll::from_db(db),
            counters: Coll::from_db(db),
        }
    }
}

fn category_filter(category: Category, id: CandidateId) -> Document {
    doc! {
        "_id": id,
        "category": category,
    }
}

/// How often a commit whose outcome is unknown is sent again.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Write conflicts and other aborts labelled transient become
/// [`Error::Transient`], so the caller can run the vote again.
fn txn_error(err: DbError) -> Error {
    if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        Error::Transient(err)
    } else {
        err.into()
    }
}

/// Drain a cursor opened within `session`.
async fn collect<T>(mut cursor: SessionCursor<T>, session: &mut ClientSession) -> Result<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    Ok(cursor.stream(session).try_collect().await?)
}

#[rocket::async_trait]
impl VoteLedger for MongoStore {
    async fn begin<'a>(&'a self, isolation: Isolation) -> Result<Box<dyn BallotTxn + 'a>> {
        let mut txn = MongoTxn {
            session: self.client.start_session(None).await?,
            in_transaction: false,
            voters: self.voters.clone(),
            candidates: self.candidates.clone(),
            votes: self.votes.clone(),
            null_votes: self.null_votes.clone(),
        };
        if isolation == Isolation::Serializable {
            txn.ensure_transaction().await?;
        }
        Ok(Box::new(txn))
    }
}

/// A vote transaction on its own session. Dropping the session aborts the
/// transaction if it was never committed.
struct MongoTxn {
    session: ClientSession,
    in_transaction: bool,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    null_votes: Coll<NullVote>,
}

impl MongoTxn {
    /// Racy transactions only start on their first write, so their reads
    /// see whatever is committed at the time.
    async fn ensure_transaction(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.session
                .start_transaction(None)
                .await
                .map_err(txn_error)?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl BallotTxn for MongoTxn {
    async fn voter(&mut self, id: VoterId) -> Result<Option<Voter>> {
        self.voters
            .find_one_with_session(u32_id_filter(id), None, &mut self.session)
            .await
            .map_err(txn_error)
    }

    async fn vote_counts(&mut self, voter_id: VoterId) -> Result<VoteCounts> {
        let mut counts = VoteCounts::default();
        for category in Category::ALL {
            let filter = doc! {
                "voter_id": voter_id,
                "category": category,
            };
            *counts.get_mut(category) = self
                .votes
                .count_documents_with_session(filter, None, &mut self.session)
                .await
                .map_err(txn_error)?;
        }
        Ok(counts)
    }

    async fn candidate(
        &mut self,
        category: Category,
        id: CandidateId,
    ) -> Result<Option<Candidate>> {
        self.candidates
            .find_one_with_session(category_filter(category, id), None, &mut self.session)
            .await
            .map_err(txn_error)
    }

    async fn append_vote(&mut self, vote: &Vote) -> Result<()> {
        self.ensure_transaction().await?;
        match self
            .votes
            .insert_one_with_session(vote, None, &mut self.session)
            .await
        {
            Ok(_) => Ok(()),
            // The unique ledger index caught a concurrent vote.
            Err(e) if is_duplicate_key_error(&e) => {
                Err(VoteError::CategoryAlreadyVoted(vote.category).into())
            }
            Err(e) => Err(txn_error(e)),
        }
    }

    async fn increment_tally(&mut self, category: Category, id: CandidateId) -> Result<()> {
        self.ensure_transaction().await?;
        let update = doc! {
            "$inc": { "votes": 1_i64 }
        };
        let result = self
            .candidates
            .update_one_with_session(category_filter(category, id), update, None, &mut self.session)
            .await
            .map_err(txn_error)?;
        if result.matched_count == 0 {
            return Err(VoteError::CandidateNotFound(category).into());
        }
        Ok(())
    }

    async fn append_null_vote(&mut self, vote: &NullVote) -> Result<()> {
        self.ensure_transaction().await?;
        self.null_votes
            .insert_one_with_session(vote, None, &mut self.session)
            .await
            .map_err(txn_error)?;
        Ok(())
    }

    async fn stamp_voter(&mut self, id: VoterId, at: DateTime<Utc>) -> Result<()> {
        self.ensure_transaction().await?;
        let update = doc! {
            "$set": { "last_vote_at": BsonDateTime::from_chrono(at) }
        };
        let result = self
            .voters
            .update_one_with_session(u32_id_filter(id), update, None, &mut self.session)
            .await
            .map_err(txn_error)?;
        if result.matched_count == 0 {
            return Err(VoteError::VoterNotFound.into());
        }
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        let mut attempt = 1;
        loop {
            match self.session.commit_transaction().await {
                Ok(()) => return Ok(()),
                // Committing again is safe: the server applies it at most once.
                Err(e)
                    if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                        && attempt < MAX_COMMIT_ATTEMPTS =>
                {
                    warn!("Commit outcome unknown after attempt {attempt}, retrying: {e}");
                    attempt += 1;
                }
                Err(e) => return Err(txn_error(e)),
            }
        }
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn user_by_email(&self, correo: &str) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "correo": correo }, None).await?)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.find_one(u32_id_filter(id), None).await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let user = User {
            id: Counter::next(&self.counters, USER_COUNTER_ID).await?,
            user,
        };
        match self.users.insert_one(&user, None).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key_error(&e) => {
                Err(Error::conflict("El correo ya está registrado"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn count_admins(&self) -> Result<u64> {
        Ok(self
            .users
            .count_documents(doc! { "rol": ADMIN_ROLE }, None)
            .await?)
    }

    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter> {
        let voter = Voter::new(Counter::next(&self.counters, VOTER_COUNTER_ID).await?, voter);
        match self.voters.insert_one(&voter, None).await {
            Ok(_) => {
                debug!("Inserted voter {}", voter.id);
                Ok(voter)
            }
            Err(e) if is_duplicate_key_error(&e) => {
                Err(Error::conflict("El DNI ya está registrado"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn voter_by_id(&self, id: VoterId) -> Result<Option<Voter>> {
        Ok(self.voters.find_one(u32_id_filter(id), None).await?)
    }

    async fn voter_by_national_id(&self, national_id: &str) -> Result<Option<Voter>> {
        Ok(self
            .voters
            .find_one(doc! { "national_id": national_id }, None)
            .await?)
    }

    async fn voters_page(&self, limit: u32, offset: u32) -> Result<(Vec<Voter>, u64)> {
        let total = self.voters.count_documents(None, None).await?;
        // MongoDB reads a zero limit as "no limit".
        if limit == 0 {
            return Ok((Vec::new(), total));
        }
        let options = FindOptions::builder()
            .sort(doc! { "_id": -1 })
            .skip(u64::from(offset))
            .limit(i64::from(limit))
            .build();
        let voters = self.voters.find(None, options).await?.try_collect().await?;
        Ok((voters, total))
    }

    async fn vote_counts(&self, voter_id: VoterId) -> Result<VoteCounts> {
        let mut counts = VoteCounts::default();
        for category in Category::ALL {
            let filter = doc! {
                "voter_id": voter_id,
                "category": category,
            };
            *counts.get_mut(category) = self.votes.count_documents(filter, None).await?;
        }
        Ok(counts)
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let candidate = Candidate {
            id: Counter::next(&self.counters, CANDIDATE_COUNTER_ID).await?,
            candidate,
        };
        self.candidates.insert_one(&candidate, None).await?;
        debug!("Inserted {} candidate {}", candidate.category, candidate.id);
        Ok(candidate)
    }

    async fn candidates(&self, category: Category) -> Result<Vec<Candidate>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        Ok(self
            .candidates
            .find(doc! { "category": category }, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn candidate_by_id(
        &self,
        category: Category,
        id: CandidateId,
    ) -> Result<Option<Candidate>> {
        Ok(self
            .candidates
            .find_one(category_filter(category, id), None)
            .await?)
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let session_options = SessionOptions::builder().snapshot(true).build();
        let mut session = self.client.start_session(Some(session_options)).await?;

        let cursor = self
            .voters
            .find_with_session(None, None, &mut session)
            .await?;
        let voters = collect(cursor, &mut session).await?;

        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let cursor = self
            .candidates
            .find_with_session(None, options, &mut session)
            .await?;
        let candidates = collect(cursor, &mut session).await?;

        let cursor = self
            .votes
            .find_with_session(None, None, &mut session)
            .await?;
        let votes = collect(cursor, &mut session).await?;

        let cursor = self
            .null_votes
            .find_with_session(None, None, &mut session)
            .await?;
        let null_votes = collect(cursor, &mut session).await?;

        Ok(Snapshot {
            voters,
            candidates,
            votes,
            null_votes,
        })
    }
}
