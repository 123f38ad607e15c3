//! Who must not be drawn for whom.
//!
//! Explicit conflicts are always honored. Automatic detection is delegated to
//! [`ConflictPolicy`] implementations so the heuristic can be swapped without
//! touching the generator.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use itertools::Itertools;
use secret_santa_config::ExchangeConfig;
use tracing::debug;

use crate::model::{EmailAddress, ParticipantId, ParticipantSet};

/// Forbidden giver/recipient pairs, always symmetric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictGraph {
    forbidden: BTreeMap<ParticipantId, BTreeSet<ParticipantId>>,
}

impl ConflictGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forbids both directions. A participant can't conflict with themselves.
    pub fn forbid(&mut self, left: ParticipantId, right: ParticipantId) {
        if left == right {
            return;
        }
        self.forbidden.entry(left).or_default().insert(right);
        self.forbidden.entry(right).or_default().insert(left);
    }

    #[must_use]
    pub fn forbids(&self, giver: ParticipantId, recipient: ParticipantId) -> bool {
        self.forbidden
            .get(&giver)
            .is_some_and(|forbidden| forbidden.contains(&recipient))
    }

    pub fn forbidden_for(&self, giver: ParticipantId) -> impl Iterator<Item = ParticipantId> + '_ {
        self.forbidden.get(&giver).into_iter().flatten().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forbidden.is_empty()
    }

    /// Each symmetric pair counts once.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.forbidden.values().map(BTreeSet::len).sum::<usize>() / 2
    }
}

/// Infers additional conflicts when automatic detection is requested.
///
/// Implementations must be deterministic and must not depend on previous draws.
pub trait ConflictPolicy: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn infer(&self, participants: &ParticipantSet) -> Vec<(ParticipantId, ParticipantId)>;
}

fn pairs_within_groups<K: Eq + std::hash::Hash>(
    grouped: impl Iterator<Item = (K, ParticipantId)>,
) -> Vec<(ParticipantId, ParticipantId)> {
    grouped
        .into_group_map()
        .into_values()
        .flat_map(|members| {
            members
                .into_iter()
                .tuple_combinations::<(_, _)>()
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Participants with the same household marker are couples or flatmates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedHousehold;

impl ConflictPolicy for SharedHousehold {
    fn name(&self) -> &'static str {
        "shared-household"
    }

    fn infer(&self, participants: &ParticipantSet) -> Vec<(ParticipantId, ParticipantId)> {
        pairs_within_groups(participants.iter().filter_map(|participant| {
            let household = participant.household.as_deref()?.trim().to_lowercase();
            (!household.is_empty()).then_some((household, participant.id))
        }))
    }
}

/// Participants whose addresses share a domain, e.g. a family domain.
///
/// Public mail providers have to be listed in `ignored_domains`, otherwise
/// everybody using the same provider would conflict.
#[derive(Debug, Clone, Default)]
pub struct SameEmailDomain {
    ignored_domains: BTreeSet<String>,
}

impl SameEmailDomain {
    pub fn new<I, S>(ignored_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ignored_domains: ignored_domains
                .into_iter()
                .map(|domain| domain.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl ConflictPolicy for SameEmailDomain {
    fn name(&self) -> &'static str {
        "same-email-domain"
    }

    fn infer(&self, participants: &ParticipantSet) -> Vec<(ParticipantId, ParticipantId)> {
        pairs_within_groups(participants.iter().filter_map(|participant| {
            let domain = EmailAddress::domain(&participant.email_address)?;
            (!self.ignored_domains.contains(&domain)).then_some((domain, participant.id))
        }))
    }
}

#[derive(Debug)]
pub struct ConflictResolver {
    policies: Vec<Box<dyn ConflictPolicy>>,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self {
            policies: vec![Box::new(SharedHousehold)],
        }
    }
}

impl ConflictResolver {
    /// No automatic detection at all, only explicit conflicts.
    #[must_use]
    pub fn explicit_only() -> Self {
        Self {
            policies: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        let resolver = Self::default();
        if config.detect_shared_email_domain {
            resolver.with_policy(SameEmailDomain::new(&config.ignored_email_domains))
        } else {
            resolver
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: impl ConflictPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    /// Builds the effective graph. Pure, references to unknown participants are skipped.
    #[must_use]
    pub fn resolve(&self, participants: &ParticipantSet, auto_detect: bool) -> ConflictGraph {
        let mut graph = ConflictGraph::new();
        for participant in participants {
            for &other in &participant.conflicts {
                if participants.contains(other) {
                    graph.forbid(participant.id, other);
                }
            }
        }
        if auto_detect {
            for policy in &self.policies {
                let inferred = policy.infer(participants);
                debug!(
                    policy = policy.name(),
                    inferred = inferred.len(),
                    "applied conflict policy"
                );
                for (left, right) in inferred {
                    graph.forbid(left, right);
                }
            }
        }
        graph
    }
}
