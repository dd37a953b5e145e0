mod category;
mod eligibility;

pub use category::{CandidateCategory, Category, UnknownCategory};
pub use eligibility::{VoteCounts, VoterStatus};

/// Our voter IDs are integers.
pub type VoterId = u32;
/// Our candidate IDs are integers, unique across all categories.
pub type CandidateId = u32;
/// Our user account IDs are integers.
pub type UserId = u32;
