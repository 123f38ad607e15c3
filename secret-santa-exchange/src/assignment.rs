use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::ParticipantId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("{0} cannot give a gift to themselves")]
    SelfAssignment(ParticipantId),
    #[error("{0} appears more than once as giver")]
    DuplicateGiver(ParticipantId),
    #[error("{0} appears more than once as recipient")]
    DuplicateRecipient(ParticipantId),
    #[error("givers and recipients are not the same participants")]
    NotAPermutation,
}

#[derive(Deserialize)]
struct AssignmentPair {
    giver: ParticipantId,
    recipient: ParticipantId,
}

/// One giver buys a gift for one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AssignmentPair")]
pub struct Assignment {
    giver: ParticipantId,
    recipient: ParticipantId,
}

impl TryFrom<AssignmentPair> for Assignment {
    type Error = AssignmentError;

    fn try_from(value: AssignmentPair) -> Result<Self, Self::Error> {
        Self::new(value.giver, value.recipient)
    }
}

impl Assignment {
    pub const fn new(
        giver: ParticipantId,
        recipient: ParticipantId,
    ) -> Result<Self, AssignmentError> {
        if giver.0 == recipient.0 {
            return Err(AssignmentError::SelfAssignment(giver));
        }
        Ok(Self { giver, recipient })
    }

    #[must_use]
    pub const fn giver(&self) -> ParticipantId {
        self.giver
    }

    #[must_use]
    pub const fn recipient(&self) -> ParticipantId {
        self.recipient
    }
}

/// A complete draw: every participant gives exactly once and receives exactly once.
///
/// Replaced as a whole when assignments are generated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Assignment>", into = "Vec<Assignment>")]
pub struct AssignmentSet(Vec<Assignment>);

impl TryFrom<Vec<Assignment>> for AssignmentSet {
    type Error = AssignmentError;

    fn try_from(assignments: Vec<Assignment>) -> Result<Self, Self::Error> {
        let mut givers = BTreeSet::new();
        let mut recipients = BTreeSet::new();
        for assignment in &assignments {
            if !givers.insert(assignment.giver) {
                return Err(AssignmentError::DuplicateGiver(assignment.giver));
            }
            if !recipients.insert(assignment.recipient) {
                return Err(AssignmentError::DuplicateRecipient(assignment.recipient));
            }
        }
        if givers != recipients {
            return Err(AssignmentError::NotAPermutation);
        }
        Ok(Self(assignments))
    }
}

impl From<AssignmentSet> for Vec<Assignment> {
    fn from(value: AssignmentSet) -> Self {
        value.0
    }
}

impl AssignmentSet {
    /// Who `giver` buys for.
    #[must_use]
    pub fn recipient_of(&self, giver: ParticipantId) -> Option<ParticipantId> {
        self.0
            .iter()
            .find(|assignment| assignment.giver == giver)
            .map(Assignment::recipient)
    }

    /// Who buys for `recipient`.
    #[must_use]
    pub fn giver_of(&self, recipient: ParticipantId) -> Option<ParticipantId> {
        self.0
            .iter()
            .find(|assignment| assignment.recipient == recipient)
            .map(Assignment::giver)
    }

    pub fn givers(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.0.iter().map(Assignment::giver)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Assignment> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Assignment] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a AssignmentSet {
    type IntoIter = std::slice::Iter<'a, Assignment>;
    type Item = &'a Assignment;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(giver: u64, recipient: u64) -> Assignment {
        Assignment::new(ParticipantId(giver), ParticipantId(recipient)).unwrap()
    }

    #[test]
    fn self_assignment_is_impossible() {
        assert_eq!(
            Assignment::new(ParticipantId(2), ParticipantId(2)),
            Err(AssignmentError::SelfAssignment(ParticipantId(2)))
        );
        assert!(serde_json::from_str::<Assignment>(r#"{"giver":2,"recipient":2}"#).is_err());
    }

    #[test]
    fn cycle_is_a_valid_set() {
        let set = AssignmentSet::try_from(vec![pair(1, 2), pair(2, 3), pair(3, 1)]).unwrap();
        assert_eq!(set.recipient_of(ParticipantId(1)), Some(ParticipantId(2)));
        assert_eq!(set.giver_of(ParticipantId(1)), Some(ParticipantId(3)));
        assert_eq!(set.recipient_of(ParticipantId(7)), None);
    }

    #[test]
    fn structural_violations_are_reported() {
        assert_eq!(
            AssignmentSet::try_from(vec![pair(1, 2), pair(1, 3)]),
            Err(AssignmentError::DuplicateGiver(ParticipantId(1)))
        );
        assert_eq!(
            AssignmentSet::try_from(vec![pair(1, 2), pair(3, 2)]),
            Err(AssignmentError::DuplicateRecipient(ParticipantId(2)))
        );
        assert_eq!(
            AssignmentSet::try_from(vec![pair(1, 2), pair(2, 3)]),
            Err(AssignmentError::NotAPermutation)
        );
    }
}
