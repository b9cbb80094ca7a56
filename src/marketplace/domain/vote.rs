//! Auditor ballots and the majority rule.

use super::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of auditors on every dispute panel.
pub const AUDITOR_PANEL_SIZE: usize = 3;

/// One auditor's immutable ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    auditor: ParticipantId,
    in_favour_of_developer: bool,
    cast_at: DateTime<Utc>,
}

impl Ballot {
    /// Creates a ballot.
    #[must_use]
    pub const fn new(
        auditor: ParticipantId,
        in_favour_of_developer: bool,
        cast_at: DateTime<Utc>,
    ) -> Self {
        Self {
            auditor,
            in_favour_of_developer,
            cast_at,
        }
    }

    /// Returns the auditor who cast the ballot.
    #[must_use]
    pub const fn auditor(&self) -> &ParticipantId {
        &self.auditor
    }

    /// Returns `true` when the auditor ruled that the developer should be paid.
    #[must_use]
    pub const fn in_favour_of_developer(&self) -> bool {
        self.in_favour_of_developer
    }

    /// Returns when the ballot was cast.
    #[must_use]
    pub const fn cast_at(&self) -> DateTime<Utc> {
        self.cast_at
    }
}

/// Aggregate tally of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteStatus {
    /// Ballots in favour of the developer.
    pub votes_for: usize,
    /// Ballots cast so far.
    pub total_votes: usize,
    /// Whether the whole panel has voted.
    pub is_complete: bool,
}

impl VoteStatus {
    /// Returns the majority verdict once the tally is complete.
    ///
    /// `Some(true)` means the developer won.
    #[must_use]
    pub fn verdict(self) -> Option<bool> {
        self.is_complete
            .then(|| self.votes_for.saturating_mul(2) > self.total_votes)
    }
}

/// Ballots cast on one task, in casting order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditVotes {
    ballots: Vec<Ballot>,
}

impl AuditVotes {
    /// Returns every ballot in casting order.
    #[must_use]
    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    /// Returns the ballot cast by `auditor`, if any.
    #[must_use]
    pub fn ballot_of(&self, auditor: &ParticipantId) -> Option<&Ballot> {
        self.ballots.iter().find(|ballot| ballot.auditor() == auditor)
    }

    /// Returns the current tally.
    #[must_use]
    pub fn status(&self) -> VoteStatus {
        let votes_for = self
            .ballots
            .iter()
            .filter(|ballot| ballot.in_favour_of_developer())
            .count();
        let total_votes = self.ballots.len();
        VoteStatus {
            votes_for,
            total_votes,
            is_complete: total_votes >= AUDITOR_PANEL_SIZE,
        }
    }

    /// Appends a ballot; duplicate and panel checks belong to the caller.
    pub(super) fn record(&mut self, ballot: Ballot) -> VoteStatus {
        self.ballots.push(ballot);
        self.status()
    }

    /// Returns the panel members whose ballot matches `developer_won`, in
    /// panel order.
    pub(super) fn majority_in<'a>(
        &self,
        panel: &'a [ParticipantId],
        developer_won: bool,
    ) -> Vec<&'a ParticipantId> {
        panel
            .iter()
            .filter(|auditor| {
                self.ballot_of(auditor)
                    .is_some_and(|ballot| ballot.in_favour_of_developer() == developer_won)
            })
            .collect()
    }
}
