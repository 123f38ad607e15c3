//! Delivers assignment notifications.
//!
//! A failing message never stops the batch. Failures are logged and collected in the
//! [`DispatchReport`] so the caller can offer a resend for the gap.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt as _};
use secret_santa_config::ExchangeConfig;
use tracing::{debug, info, warn};

use crate::assignment::{Assignment, AssignmentSet};
use crate::email::EmailService;
use crate::error::{DeliveryError, ExchangeError, Result, ValidationErrors};
use crate::message::{EmailTemplate, MessageBuilder};
use crate::model::{Exchange, ParticipantId};
use crate::validation::{validate_assignments, validate_exchange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// `None` for the organizer summary.
    pub giver: Option<ParticipantId>,
    pub error: DeliveryError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub sent: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Givers whose message did not go out.
    pub fn failed_givers(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.failures.iter().filter_map(|failure| failure.giver)
    }
}

#[derive(Debug)]
pub struct NotificationDispatcher<E> {
    email: E,
    messages: MessageBuilder,
    send_concurrency: usize,
}

impl<E: EmailService> NotificationDispatcher<E> {
    pub fn new(email: E, config: Arc<ExchangeConfig>) -> Self {
        Self {
            email,
            send_concurrency: config.send_concurrency.max(1),
            messages: MessageBuilder::new(config),
        }
    }

    pub const fn email(&self) -> &E {
        &self.email
    }

    pub const fn messages(&self) -> &MessageBuilder {
        &self.messages
    }

    pub async fn send_message(
        &self,
        exchange: &Exchange,
        assignment: &Assignment,
        organizer_only: bool,
    ) -> Result<()> {
        validate_exchange(exchange)?;
        let template = self
            .messages
            .assignment_message(exchange, assignment, organizer_only)?;
        self.email.send(template).await?;
        debug!(
            exchange_id = exchange.id.0,
            giver = assignment.giver().0,
            "sent notification"
        );
        Ok(())
    }

    pub async fn send_messages(
        &self,
        exchange: &Exchange,
        assignments: &AssignmentSet,
        organizer_only: bool,
    ) -> Result<DispatchReport> {
        validate_exchange(exchange)?;
        validate_assignments(exchange, assignments)?;

        let templates = if organizer_only {
            vec![(None, self.messages.summary_message(exchange, assignments)?)]
        } else {
            assignments
                .iter()
                .map(|assignment| -> Result<(Option<ParticipantId>, EmailTemplate)> {
                    Ok((
                        Some(assignment.giver()),
                        self.messages.assignment_message(exchange, assignment, false)?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?
        };
        Ok(self.dispatch(exchange, templates).await)
    }

    /// Sends the stored assignment of each listed giver again. Givers without one are skipped.
    pub async fn resend_messages(
        &self,
        exchange: &Exchange,
        givers: &[ParticipantId],
    ) -> Result<DispatchReport> {
        validate_exchange(exchange)?;
        let assignments = exchange.assignments.as_ref().ok_or_else(|| {
            ExchangeError::InvalidInput(ValidationErrors::single(
                "assignments",
                format!("{} has no assignments yet", exchange.id),
            ))
        })?;

        let mut templates = Vec::with_capacity(givers.len());
        for &giver in givers {
            let Some(recipient) = assignments.recipient_of(giver) else {
                debug!(exchange_id = exchange.id.0, giver = giver.0, "no assignment to resend");
                continue;
            };
            let assignment = Assignment::new(giver, recipient)?;
            templates.push((
                Some(giver),
                self.messages.assignment_message(exchange, &assignment, false)?,
            ));
        }
        Ok(self.dispatch(exchange, templates).await)
    }

    async fn dispatch(
        &self,
        exchange: &Exchange,
        templates: Vec<(Option<ParticipantId>, EmailTemplate)>,
    ) -> DispatchReport {
        let attempted = templates.len();
        let email = &self.email;
        let failures: Vec<DeliveryFailure> = stream::iter(templates)
            .map(|(giver, template)| async move { (giver, email.send(template).await) })
            .buffer_unordered(self.send_concurrency)
            .filter_map(|(giver, result)| async move {
                result.err().map(|error| DeliveryFailure { giver, error })
            })
            .collect()
            .await;

        for failure in &failures {
            warn!(
                exchange_id = exchange.id.0,
                giver = failure.giver.map(|giver| giver.0),
                error = %failure.error,
                "failed to send notification"
            );
        }
        let report = DispatchReport {
            attempted,
            sent: attempted - failures.len(),
            failures,
        };
        info!(
            exchange_id = exchange.id.0,
            sent = report.sent,
            attempted = report.attempted,
            "dispatched notifications"
        );
        report
    }
}
