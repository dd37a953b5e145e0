use serde::{Deserialize, Serialize};

use super::Category;

/// How many ledger records a voter has in each category.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct VoteCounts {
    pub presidential: u64,
    pub regional: u64,
    pub district: u64,
}

impl VoteCounts {
    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::Presidential => self.presidential,
            Category::Regional => self.regional,
            Category::District => self.district,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut u64 {
        match category {
            Category::Presidential => &mut self.presidential,
            Category::Regional => &mut self.regional,
            Category::District => &mut self.district,
        }
    }

    /// A single recorded vote closes the category, whichever candidate it was for.
    pub fn has_voted(&self, category: Category) -> bool {
        self.get(category) >= 1
    }

    pub fn all_exhausted(&self) -> bool {
        Category::ALL
            .into_iter()
            .all(|category| self.has_voted(category))
    }

    pub fn status(&self) -> VoterStatus {
        VoterStatus {
            can_vote_presidencial: !self.has_voted(Category::Presidential),
            can_vote_regional: !self.has_voted(Category::Regional),
            can_vote_distrital: !self.has_voted(Category::District),
            has_all_votes: self.all_exhausted(),
        }
    }
}

/// Which ballots a voter may still cast.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterStatus {
    pub can_vote_presidencial: bool,
    pub can_vote_regional: bool,
    pub can_vote_distrital: bool,
    pub has_all_votes: bool,
}

impl VoterStatus {
    /// Reported for national IDs nobody has registered: every ballot is open.
    pub fn unregistered() -> Self {
        VoteCounts::default().status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_voter_can_vote_everywhere() {
        assert_eq!(
            VoterStatus::unregistered(),
            VoterStatus {
                can_vote_presidencial: true,
                can_vote_regional: true,
                can_vote_distrital: true,
                has_all_votes: false,
            }
        );
    }

    #[test]
    fn partial_and_full_counts() {
        let mut counts = VoteCounts::default();
        *counts.get_mut(Category::Presidential) += 1;
        *counts.get_mut(Category::Regional) += 1;
        assert!(!counts.all_exhausted());
        assert_eq!(
            counts.status(),
            VoterStatus {
                can_vote_presidencial: false,
                can_vote_regional: false,
                can_vote_distrital: true,
                has_all_votes: false,
            }
        );

        // Duplicates recorded by a racing writer still count as voted.
        *counts.get_mut(Category::District) += 2;
        assert!(counts.has_voted(Category::District));
        assert!(counts.all_exhausted());
        assert!(counts.status().has_all_votes);
    }
}
