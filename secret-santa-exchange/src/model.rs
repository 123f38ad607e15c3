// these usually come from the persistence layer, ids are only unique within one exchange

use std::collections::BTreeSet;
use std::fmt;

pub use secret_santa_config::EmailFormat;
use serde::{Deserialize, Serialize};

use crate::assignment::AssignmentSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(pub u64);

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exchange {}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub name: String,
    pub address: String,
}

impl EmailAddress {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// The part after the last `@`, lowercased.
    #[must_use]
    pub fn domain(address: &str) -> Option<String> {
        let (_, domain) = address.trim().rsplit_once('@')?;
        (!domain.is_empty()).then(|| domain.to_ascii_lowercase())
    }
}

/// Values that replace the configured template defaults.
///
/// Set on an exchange or on a single participant, the participant wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOverrides {
    pub sender_name: Option<String>,
    pub email_format: Option<EmailFormat>,
    pub template_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub nickname: String,
    pub email_address: String,
    #[serde(default)]
    pub template_overrides: TemplateOverrides,
    /// Declared by either side, always applied in both directions.
    #[serde(default)]
    pub conflicts: BTreeSet<ParticipantId>,
    /// Participants sharing this marker live together or are a couple.
    #[serde(default)]
    pub household: Option<String>,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        name: impl Into<String>,
        nickname: impl Into<String>,
        email_address: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            nickname: nickname.into(),
            email_address: email_address.into(),
            template_overrides: TemplateOverrides::default(),
            conflicts: BTreeSet::new(),
            household: None,
        }
    }

    #[must_use]
    pub fn with_conflict(mut self, other: ParticipantId) -> Self {
        self.add_conflict(other);
        self
    }

    #[must_use]
    pub fn with_household(mut self, household: impl Into<String>) -> Self {
        self.household = Some(household.into());
        self
    }

    /// Returns false if the conflict was already recorded.
    pub fn add_conflict(&mut self, other: ParticipantId) -> bool {
        self.conflicts.insert(other)
    }

    pub fn remove_conflict(&mut self, other: ParticipantId) -> bool {
        self.conflicts.remove(&other)
    }

    #[must_use]
    pub fn email(&self) -> EmailAddress {
        EmailAddress::new(&self.name, &self.email_address)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("duplicate {0} in participant set")]
pub struct DuplicateParticipant(pub ParticipantId);

/// Participants of one exchange in the order the organizer entered them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Participant>", into = "Vec<Participant>")]
pub struct ParticipantSet(Vec<Participant>);

impl TryFrom<Vec<Participant>> for ParticipantSet {
    type Error = DuplicateParticipant;

    fn try_from(participants: Vec<Participant>) -> Result<Self, Self::Error> {
        let mut set = Self::default();
        for participant in participants {
            set.push(participant)?;
        }
        Ok(set)
    }
}

impl From<ParticipantSet> for Vec<Participant> {
    fn from(value: ParticipantSet) -> Self {
        value.0
    }
}

impl ParticipantSet {
    pub fn push(&mut self, participant: Participant) -> Result<(), DuplicateParticipant> {
        if self.contains(participant.id) {
            return Err(DuplicateParticipant(participant.id));
        }
        self.0.push(participant);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.0.iter().find(|participant| participant.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.0.iter().map(|participant| participant.id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Participant> {
        self.0.iter()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Participant> {
        self.0.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Participant] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ParticipantSet {
    type IntoIter = std::slice::Iter<'a, Participant>;
    type Item = &'a Participant;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organizer {
    pub name: String,
    pub email_address: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeState {
    #[default]
    New,
    Started,
    Sent,
}

const fn default_auto_detect() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: ExchangeId,
    #[serde(default)]
    pub state: ExchangeState,
    pub name: String,
    pub date_and_time: String,
    pub theme: String,
    pub cost: String,
    #[serde(default)]
    pub extra_info: String,
    pub organizer: Organizer,
    #[serde(default)]
    pub template_overrides: TemplateOverrides,
    /// Whether conflict policies and the reciprocal pair rule apply on top of explicit conflicts.
    #[serde(default = "default_auto_detect")]
    pub auto_detect: bool,
    #[serde(default)]
    pub participants: ParticipantSet,
    /// Only present once assignments were generated and stored.
    #[serde(default)]
    pub assignments: Option<AssignmentSet>,
}

impl Exchange {
    #[must_use]
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    #[must_use]
    pub fn next_participant_id(&self) -> ParticipantId {
        ParticipantId(
            self.participants
                .ids()
                .map(|ParticipantId(id)| id)
                .max()
                .unwrap_or(0)
                + 1,
        )
    }

    pub fn add_participant(&mut self, participant: Participant) -> Result<(), DuplicateParticipant> {
        self.participants.push(participant)
    }

    /// Swaps in the participant with the same id, returns false if there is none.
    pub fn replace_participant(&mut self, participant: Participant) -> bool {
        match self
            .participants
            .0
            .iter_mut()
            .find(|existing| existing.id == participant.id)
        {
            Some(existing) => {
                *existing = participant;
                true
            }
            None => false,
        }
    }

    /// Also drops every conflict pointing at the removed participant.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<Participant> {
        let index = self
            .participants
            .0
            .iter()
            .position(|participant| participant.id == id)?;
        let removed = self.participants.0.remove(index);
        for participant in &mut self.participants.0 {
            participant.remove_conflict(id);
        }
        Some(removed)
    }

    /// `None` if the organizer can only be reached by phone.
    #[must_use]
    pub fn organizer_email(&self) -> Option<EmailAddress> {
        (!self.organizer.email_address.trim().is_empty())
            .then(|| EmailAddress::new(&self.organizer.name, &self.organizer.email_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange() -> Exchange {
        Exchange {
            id: ExchangeId(1),
            state: ExchangeState::New,
            name: "Office".to_owned(),
            date_and_time: "Dec 20".to_owned(),
            theme: "Books".to_owned(),
            cost: "20 EUR".to_owned(),
            extra_info: String::new(),
            organizer: Organizer::default(),
            template_overrides: TemplateOverrides::default(),
            auto_detect: false,
            participants: ParticipantSet::try_from(vec![
                Participant::new(ParticipantId(1), "Ann", "ann", "ann@example.org")
                    .with_conflict(ParticipantId(3)),
                Participant::new(ParticipantId(3), "Bob", "bob", "bob@example.org")
                    .with_conflict(ParticipantId(1)),
            ])
            .unwrap(),
            assignments: None,
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = ParticipantSet::try_from(vec![
            Participant::new(ParticipantId(1), "Ann", "ann", "ann@example.org"),
            Participant::new(ParticipantId(1), "Bob", "bob", "bob@example.org"),
        ]);
        assert_eq!(result, Err(DuplicateParticipant(ParticipantId(1))));
    }

    #[test]
    fn duplicate_ids_are_rejected_when_deserializing() {
        let json = r#"[
            {"id": 4, "name": "Ann", "nickname": "ann", "email_address": "ann@example.org"},
            {"id": 4, "name": "Bob", "nickname": "bob", "email_address": "bob@example.org"}
        ]"#;
        assert!(serde_json::from_str::<ParticipantSet>(json).is_err());
    }

    #[test]
    fn auto_detect_defaults_to_enabled() {
        let json = r#"{
            "id": 2, "name": "Office", "date_and_time": "Dec 20", "theme": "Books",
            "cost": "20 EUR", "organizer": {"name": "Olivia", "email_address": "o@example.org"}
        }"#;
        let exchange: Exchange = serde_json::from_str(json).unwrap();
        assert!(exchange.auto_detect);
        assert_eq!(exchange.state, ExchangeState::New);
        assert!(exchange.participants.is_empty());
    }

    #[test]
    fn next_participant_id_follows_largest() {
        assert_eq!(exchange().next_participant_id(), ParticipantId(4));
        let mut empty = exchange();
        empty.remove_participant(ParticipantId(1));
        empty.remove_participant(ParticipantId(3));
        assert_eq!(empty.next_participant_id(), ParticipantId(1));
    }

    #[test]
    fn removing_a_participant_drops_references_to_it() {
        let mut exchange = exchange();
        let removed = exchange.remove_participant(ParticipantId(1)).unwrap();
        assert_eq!(removed.name, "Ann");
        assert!(exchange
            .participant(ParticipantId(3))
            .unwrap()
            .conflicts
            .is_empty());
        assert!(exchange.remove_participant(ParticipantId(1)).is_none());
    }

    #[test]
    fn replace_participant_keeps_position() {
        let mut exchange = exchange();
        let renamed = Participant::new(ParticipantId(1), "Anne", "anne", "anne@example.org");
        assert!(exchange.replace_participant(renamed));
        assert_eq!(exchange.participants.first().unwrap().name, "Anne");
        let unknown = Participant::new(ParticipantId(9), "Eve", "eve", "eve@example.org");
        assert!(!exchange.replace_participant(unknown));
    }

    #[test]
    fn email_domain_is_normalized() {
        assert_eq!(
            EmailAddress::domain("Ann@Example.ORG"),
            Some("example.org".to_owned())
        );
        assert_eq!(EmailAddress::domain("nobody"), None);
        assert_eq!(EmailAddress::domain("trailing@"), None);
    }
}
