use std::collections::BTreeMap;

use rand::seq::SliceRandom as _;
use rand::Rng;
use secret_santa_config::{ConfigError, ExchangeConfig};
use tracing::{debug, info, trace, warn};

use crate::assignment::{Assignment, AssignmentSet};
use crate::conflict::{ConflictGraph, ConflictResolver};
use crate::error::{ExchangeError, Result};
use crate::model::{Exchange, ParticipantId};
use crate::validation::validate_exchange;

/// Draws assignments by shuffling until a candidate passes validation.
///
/// Pure and synchronous, concurrent draws for different exchanges need no coordination.
#[derive(Debug)]
pub struct AssignmentGenerator {
    max_attempts: u32,
    precheck_feasibility: bool,
    resolver: ConflictResolver,
}

impl AssignmentGenerator {
    pub fn new(max_attempts: u32, resolver: ConflictResolver) -> Result<Self> {
        if max_attempts < 1 {
            return Err(ConfigError::Invalid {
                field: "max_attempts",
                reason: "must be at least 1",
            }
            .into());
        }
        Ok(Self {
            max_attempts,
            precheck_feasibility: true,
            resolver,
        })
    }

    pub fn from_config(config: &ExchangeConfig) -> Result<Self> {
        Ok(Self::new(config.max_attempts, ConflictResolver::from_config(config))?
            .with_precheck(config.precheck_feasibility))
    }

    #[must_use]
    pub const fn with_precheck(mut self, precheck_feasibility: bool) -> Self {
        self.precheck_feasibility = precheck_feasibility;
        self
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    pub fn generate(&self, exchange: &Exchange, auto_detect: bool) -> Result<AssignmentSet> {
        self.generate_with_rng(exchange, auto_detect, &mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        exchange: &Exchange,
        auto_detect: bool,
        rng: &mut R,
    ) -> Result<AssignmentSet> {
        validate_exchange(exchange)?;

        let givers: Vec<ParticipantId> = exchange.participants.ids().collect();
        let graph = self.resolver.resolve(&exchange.participants, auto_detect);
        // with only two participants every derangement is reciprocal
        let forbid_reciprocal = auto_detect && givers.len() > 2;

        debug!(
            exchange_id = exchange.id.0,
            participants = givers.len(),
            conflicts = graph.pair_count(),
            auto_detect,
            "generating assignments"
        );

        if self.precheck_feasibility && !derangement_exists(&givers, &graph) {
            warn!(
                exchange_id = exchange.id.0,
                "conflicts leave no valid assignment"
            );
            return Err(ExchangeError::Infeasible { attempts: 0 });
        }

        let mut candidate = givers.clone();
        for attempt in 1..=self.max_attempts {
            candidate.shuffle(rng);
            if is_valid_candidate(&givers, &candidate, &graph, forbid_reciprocal) {
                info!(
                    exchange_id = exchange.id.0,
                    attempt, "generated assignments"
                );
                let assignments = givers
                    .iter()
                    .zip(&candidate)
                    .map(|(&giver, &recipient)| Assignment::new(giver, recipient))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(AssignmentSet::try_from(assignments)?);
            }
            trace!(attempt, "rejected candidate");
        }

        warn!(
            exchange_id = exchange.id.0,
            attempts = self.max_attempts,
            "unable to generate assignments"
        );
        Err(ExchangeError::Infeasible {
            attempts: self.max_attempts,
        })
    }
}

/// `givers[i]` gives to `candidate[i]`.
#[must_use]
pub fn is_valid_candidate(
    givers: &[ParticipantId],
    candidate: &[ParticipantId],
    graph: &ConflictGraph,
    forbid_reciprocal: bool,
) -> bool {
    if givers.len() != candidate.len() {
        return false;
    }
    let pairs_valid = givers
        .iter()
        .zip(candidate)
        .all(|(&giver, &recipient)| giver != recipient && !graph.forbids(giver, recipient));
    if !pairs_valid {
        return false;
    }
    if forbid_reciprocal {
        let recipient_of: BTreeMap<ParticipantId, ParticipantId> =
            givers.iter().copied().zip(candidate.iter().copied()).collect();
        return givers
            .iter()
            .zip(candidate)
            .all(|(giver, recipient)| recipient_of.get(recipient) != Some(giver));
    }
    true
}

/// Whether any assignment without self gifts and conflicts exists, via bipartite matching.
#[must_use]
pub fn derangement_exists(participants: &[ParticipantId], graph: &ConflictGraph) -> bool {
    let allowed: Vec<Vec<usize>> = participants
        .iter()
        .map(|&giver| {
            participants
                .iter()
                .enumerate()
                .filter(|&(_, &recipient)| recipient != giver && !graph.forbids(giver, recipient))
                .map(|(index, _)| index)
                .collect()
        })
        .collect();

    let mut giver_of_recipient: Vec<Option<usize>> = vec![None; participants.len()];
    (0..participants.len()).all(|giver| {
        let mut visited = vec![false; participants.len()];
        augment(giver, &allowed, &mut visited, &mut giver_of_recipient)
    })
}

fn augment(
    giver: usize,
    allowed: &[Vec<usize>],
    visited: &mut [bool],
    giver_of_recipient: &mut [Option<usize>],
) -> bool {
    for &recipient in &allowed[giver] {
        if visited[recipient] {
            continue;
        }
        visited[recipient] = true;
        let free = match giver_of_recipient[recipient] {
            None => true,
            Some(other) => augment(other, allowed, visited, giver_of_recipient),
        };
        if free {
            giver_of_recipient[recipient] = Some(giver);
            return true;
        }
    }
    false
}
