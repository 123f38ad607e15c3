use std::sync::Arc;

use secret_santa_config::ExchangeConfig;
use tracing::{info, instrument, warn};

use crate::assignment::{Assignment, AssignmentSet};
use crate::audit::{AuditEvent, AuditSink};
use crate::dispatch::{DispatchReport, NotificationDispatcher};
use crate::email::EmailService;
use crate::error::{ExchangeError, Result};
use crate::generator::AssignmentGenerator;
use crate::message::EmailMessage;
use crate::model::{Exchange, ExchangeId, ExchangeState, ParticipantId};
use crate::preview::generate_preview;
use crate::repository::{ExchangeRepository, Versioned};

/// Entry point for the surrounding application.
///
/// Wires the generator and the dispatcher to persistence, email and audit collaborators.
#[derive(Debug)]
pub struct ExchangeService<R, E, A> {
    repository: R,
    generator: AssignmentGenerator,
    dispatcher: NotificationDispatcher<E>,
    audit: A,
}

impl<R, E, A> ExchangeService<R, E, A>
where
    R: ExchangeRepository,
    E: EmailService,
    A: AuditSink,
{
    pub fn new(config: Arc<ExchangeConfig>, repository: R, email: E, audit: A) -> Result<Self> {
        Ok(Self {
            repository,
            generator: AssignmentGenerator::from_config(&config)?,
            dispatcher: NotificationDispatcher::new(email, config),
            audit,
        })
    }

    #[must_use]
    pub fn with_generator(mut self, generator: AssignmentGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub const fn repository(&self) -> &R {
        &self.repository
    }

    pub const fn dispatcher(&self) -> &NotificationDispatcher<E> {
        &self.dispatcher
    }

    pub fn generate_assignments(&self, exchange: &Exchange, auto_detect: bool) -> Result<AssignmentSet> {
        let assignments = self.generator.generate(exchange, auto_detect)?;
        self.audit.record(AuditEvent::AssignmentsGenerated {
            exchange_id: exchange.id,
            auto_detect,
        });
        Ok(assignments)
    }

    pub async fn send_message(
        &self,
        exchange: &Exchange,
        assignment: &Assignment,
        organizer_only: bool,
    ) -> Result<()> {
        self.dispatcher
            .send_message(exchange, assignment, organizer_only)
            .await
    }

    pub async fn send_messages(
        &self,
        exchange: &Exchange,
        assignments: &AssignmentSet,
        organizer_only: bool,
    ) -> Result<DispatchReport> {
        self.dispatcher
            .send_messages(exchange, assignments, organizer_only)
            .await
    }

    pub fn generate_preview(&self, exchange: &Exchange) -> Result<EmailMessage> {
        generate_preview(self.dispatcher.messages(), self.dispatcher.email(), exchange)
    }

    /// Draws, stores the draw and then notifies every giver.
    ///
    /// If automatic detection leaves no valid assignment, the draw is repeated with explicit
    /// conflicts only. A concurrent regeneration makes the stale call fail with
    /// [`ExchangeError::Conflict`] before any message is sent.
    #[instrument(skip_all, fields(exchange_id = exchange_id.0))]
    pub async fn send_notifications(&self, exchange_id: ExchangeId) -> Result<DispatchReport> {
        let Versioned { version, value: exchange } = self.load(exchange_id).await?;

        let assignments = match self.generate_assignments(&exchange, exchange.auto_detect) {
            Err(ExchangeError::Infeasible { attempts }) if exchange.auto_detect => {
                warn!(attempts, "automatic conflict detection left no assignment, retrying without");
                self.generate_assignments(&exchange, false)?
            }
            result => result?,
        };

        let Versioned { value: stored, .. } = self
            .repository
            .replace_assignments(exchange_id, version, assignments.clone(), ExchangeState::Sent)
            .await?;
        let report = self.send_messages(&stored, &assignments, false).await?;
        self.audit.record(AuditEvent::ExchangeEmail {
            exchange_id,
            recipients: report.sent,
        });
        info!(sent = report.sent, attempted = report.attempted, "notifications sent");
        Ok(report)
    }

    /// Sends the stored assignments of `givers` again, for example after a partial failure.
    #[instrument(skip_all, fields(exchange_id = exchange_id.0, givers = givers.len()))]
    pub async fn resend_notifications(
        &self,
        exchange_id: ExchangeId,
        givers: &[ParticipantId],
    ) -> Result<DispatchReport> {
        let Versioned { value: exchange, .. } = self.load(exchange_id).await?;
        let report = self.dispatcher.resend_messages(&exchange, givers).await?;
        if report.attempted > 0 {
            self.audit.record(AuditEvent::ResendEmails {
                exchange_id,
                givers: givers.to_vec(),
                recipients: report.sent,
            });
        }
        Ok(report)
    }

    async fn load(&self, exchange_id: ExchangeId) -> Result<Versioned<Exchange>> {
        self.repository
            .load(exchange_id)
            .await?
            .ok_or(ExchangeError::NotFound(exchange_id))
    }
}
