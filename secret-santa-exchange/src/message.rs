//! Turns assignments into email templates for the [`EmailService`](crate::email::EmailService).

use std::sync::Arc;

use itertools::Itertools;
use secret_santa_config::ExchangeConfig;
use serde::Serialize;

use crate::assignment::Assignment;
use crate::error::{ExchangeError, Result, ValidationErrors};
use crate::model::{
    EmailAddress, EmailFormat, Exchange, ExchangeId, Organizer, Participant, ParticipantId,
};

/// Width the templates are designed for.
pub const WRAP_WIDTH: usize = 75;
/// The templates use windows line endings.
pub const TEMPLATE_NEWLINE: &str = "\r\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateConfig {
    pub sender_name: String,
    pub email_format: EmailFormat,
    pub template_group: String,
    pub template_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeDetails {
    pub id: ExchangeId,
    pub name: String,
    pub date_and_time: String,
    pub theme: String,
    pub cost: String,
    pub extra_info: String,
    pub organizer: Organizer,
}

impl From<&Exchange> for ExchangeDetails {
    fn from(exchange: &Exchange) -> Self {
        Self {
            id: exchange.id,
            name: exchange.name.clone(),
            date_and_time: exchange.date_and_time.clone(),
            theme: exchange.theme.clone(),
            cost: exchange.cost.clone(),
            extra_info: wrap_lines(&exchange.extra_info, WRAP_WIDTH, TEMPLATE_NEWLINE),
            organizer: exchange.organizer.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonDetails {
    pub id: Option<ParticipantId>,
    pub name: String,
    pub nickname: String,
}

impl From<&Participant> for PersonDetails {
    fn from(participant: &Participant) -> Self {
        Self {
            id: Some(participant.id),
            name: participant.name.clone(),
            nickname: participant.nickname.clone(),
        }
    }
}

impl PersonDetails {
    /// Stands in for a recipient in previews.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            id: None,
            name: "Your Recipient".to_owned(),
            nickname: "recipient".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub giver: PersonDetails,
    pub recipient: PersonDetails,
}

/// Substitution data handed to the template renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateContext {
    /// Only ever tells one giver about their own recipient.
    Assignment {
        exchange: ExchangeDetails,
        giver: PersonDetails,
        recipient: PersonDetails,
    },
    /// The complete draw, only for the organizer.
    Summary {
        exchange: ExchangeDetails,
        assignments: Vec<SummaryLine>,
    },
}

impl TemplateContext {
    #[must_use]
    pub const fn exchange(&self) -> &ExchangeDetails {
        match self {
            Self::Assignment { exchange, .. } | Self::Summary { exchange, .. } => exchange,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailTemplate {
    pub format: EmailFormat,
    pub template_group: String,
    pub template_name: String,
    pub sender: EmailAddress,
    pub reply_to: Option<EmailAddress>,
    pub recipients: Vec<EmailAddress>,
    pub context: TemplateContext,
}

/// A rendered message, ready for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub sender: EmailAddress,
    pub reply_to: Option<EmailAddress>,
    pub recipients: Vec<EmailAddress>,
    pub subject: String,
    pub plaintext: Option<String>,
    pub html: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageBuilder {
    config: Arc<ExchangeConfig>,
}

impl MessageBuilder {
    #[must_use]
    pub const fn new(config: Arc<ExchangeConfig>) -> Self {
        Self { config }
    }

    /// Each value comes from the participant, then the exchange, then the configured default.
    #[must_use]
    pub fn derive_template_config(
        &self,
        exchange: &Exchange,
        participant: Option<&Participant>,
    ) -> TemplateConfig {
        let participant_overrides = participant.map(|participant| &participant.template_overrides);
        let exchange_overrides = &exchange.template_overrides;

        let sender_name = participant_overrides
            .and_then(|overrides| overrides.sender_name.clone())
            .or_else(|| exchange_overrides.sender_name.clone())
            .unwrap_or_else(|| self.config.sender_name.clone());
        let email_format = participant_overrides
            .and_then(|overrides| overrides.email_format)
            .or(exchange_overrides.email_format)
            .unwrap_or(self.config.default_email_format);
        let template_name = participant_overrides
            .and_then(|overrides| overrides.template_name.clone())
            .or_else(|| exchange_overrides.template_name.clone())
            .unwrap_or_else(|| self.config.default_template_name.clone());

        TemplateConfig {
            sender_name,
            email_format,
            template_group: self.config.template_group.clone(),
            template_name,
        }
    }

    pub fn assignment_message(
        &self,
        exchange: &Exchange,
        assignment: &Assignment,
        organizer_only: bool,
    ) -> Result<EmailTemplate> {
        let giver = lookup(exchange, assignment.giver())?;
        let recipient = lookup(exchange, assignment.recipient())?;
        self.message_for(exchange, giver, PersonDetails::from(recipient), organizer_only)
    }

    /// Addressed to the giver unless `organizer_only` redirects it to the organizer.
    pub fn message_for(
        &self,
        exchange: &Exchange,
        giver: &Participant,
        recipient: PersonDetails,
        organizer_only: bool,
    ) -> Result<EmailTemplate> {
        let template_config = self.derive_template_config(exchange, Some(giver));
        let mut addressee = giver.email();
        if organizer_only {
            addressee.address = organizer_mailbox(exchange)?.address;
        }
        Ok(EmailTemplate {
            format: template_config.email_format,
            sender: EmailAddress::new(template_config.sender_name, &self.config.sender_address),
            reply_to: exchange.organizer_email(),
            recipients: vec![addressee],
            template_group: template_config.template_group,
            template_name: template_config.template_name,
            context: TemplateContext::Assignment {
                exchange: ExchangeDetails::from(exchange),
                giver: PersonDetails::from(giver),
                recipient,
            },
        })
    }

    pub fn summary_message<'a>(
        &self,
        exchange: &Exchange,
        assignments: impl IntoIterator<Item = &'a Assignment>,
    ) -> Result<EmailTemplate> {
        let lines = assignments
            .into_iter()
            .map(|assignment| -> Result<SummaryLine> {
                Ok(SummaryLine {
                    giver: lookup(exchange, assignment.giver())?.into(),
                    recipient: lookup(exchange, assignment.recipient())?.into(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let template_config = self.derive_template_config(exchange, None);
        Ok(EmailTemplate {
            format: template_config.email_format,
            sender: EmailAddress::new(template_config.sender_name, &self.config.sender_address),
            reply_to: exchange.organizer_email(),
            recipients: vec![organizer_mailbox(exchange)?],
            template_group: template_config.template_group,
            template_name: self.config.summary_template_name.clone(),
            context: TemplateContext::Summary {
                exchange: ExchangeDetails::from(exchange),
                assignments: lines,
            },
        })
    }
}

fn lookup(exchange: &Exchange, id: ParticipantId) -> Result<&Participant> {
    exchange.participant(id).ok_or_else(|| {
        ExchangeError::InvalidInput(ValidationErrors::single(
            "assignments",
            format!("{id} is not part of {}", exchange.id),
        ))
    })
}

fn organizer_mailbox(exchange: &Exchange) -> Result<EmailAddress> {
    exchange.organizer_email().ok_or_else(|| {
        ExchangeError::InvalidInput(ValidationErrors::single(
            "organizerEmailAddress",
            "Sending to the organizer requires an email address",
        ))
    })
}

/// Word wraps every line of `text`. Words longer than `width` get a line of their own.
#[must_use]
pub fn wrap_lines(text: &str, width: usize, newline: &str) -> String {
    text.lines()
        .flat_map(|line| wrap_line(line, width))
        .join(newline)
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    lines.push(current);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config, exchange_with, participant};

    fn builder() -> MessageBuilder {
        MessageBuilder::new(Arc::new(config()))
    }

    fn assignment(giver: u64, recipient: u64) -> Assignment {
        Assignment::new(ParticipantId(giver), ParticipantId(recipient)).unwrap()
    }

    #[test]
    fn wraps_long_lines_with_crlf() {
        assert_eq!(
            wrap_lines("aaa bbb ccc", 7, TEMPLATE_NEWLINE),
            "aaa bbb\r\nccc"
        );
        assert_eq!(
            wrap_lines("first\n\nsecond paragraph", 8, TEMPLATE_NEWLINE),
            "first\r\n\r\nsecond\r\nparagraph"
        );
        assert_eq!(wrap_lines("", 75, TEMPLATE_NEWLINE), "");
        assert_eq!(
            wrap_lines("supercalifragilistic ok", 5, "\n"),
            "supercalifragilistic\nok"
        );
    }

    #[test]
    fn defaults_come_from_configuration() {
        let exchange = exchange_with(2);
        let template_config = builder().derive_template_config(&exchange, exchange.participants.first());
        assert_eq!(
            template_config,
            TemplateConfig {
                sender_name: "Secret Santa".to_owned(),
                email_format: EmailFormat::Plaintext,
                template_group: "santa".to_owned(),
                template_name: "notification".to_owned(),
            }
        );
    }

    #[test]
    fn participant_overrides_win_over_exchange_overrides() {
        let mut exchange = exchange_with(2);
        exchange.template_overrides.sender_name = Some("Office Elf".to_owned());
        exchange.template_overrides.email_format = Some(EmailFormat::Html);
        exchange.template_overrides.template_name = Some("office".to_owned());

        let mut giver = participant(1);
        giver.template_overrides.email_format = Some(EmailFormat::Multipart);
        exchange.replace_participant(giver.clone());

        let template_config = builder().derive_template_config(&exchange, Some(&giver));
        assert_eq!(template_config.sender_name, "Office Elf");
        assert_eq!(template_config.email_format, EmailFormat::Multipart);
        assert_eq!(template_config.template_name, "office");
        assert_eq!(template_config.template_group, "santa");
    }

    #[test]
    fn assignment_message_goes_to_giver_and_names_only_their_recipient() {
        let exchange = exchange_with(3);
        let template = builder()
            .assignment_message(&exchange, &assignment(1, 2), false)
            .unwrap();
        assert_eq!(template.recipients, vec![participant(1).email()]);
        assert_eq!(
            template.reply_to.as_ref().map(|reply_to| reply_to.address.as_str()),
            Some("olivia@example.org")
        );
        assert_eq!(template.sender.address, "santa@example.org");
        let TemplateContext::Assignment {
            giver, recipient, ..
        } = template.context
        else {
            panic!("expected an assignment context");
        };
        assert_eq!(giver.id, Some(ParticipantId(1)));
        assert_eq!(recipient.id, Some(ParticipantId(2)));
    }

    #[test]
    fn organizer_only_redirects_the_address() {
        let exchange = exchange_with(3);
        let template = builder()
            .assignment_message(&exchange, &assignment(1, 2), true)
            .unwrap();
        assert_eq!(template.recipients.len(), 1);
        assert_eq!(template.recipients[0].name, "Participant 1");
        assert_eq!(template.recipients[0].address, "olivia@example.org");
    }

    #[test]
    fn summary_lists_every_pair() {
        let exchange = exchange_with(3);
        let assignments = [assignment(1, 2), assignment(2, 3), assignment(3, 1)];
        let template = builder().summary_message(&exchange, &assignments).unwrap();
        assert_eq!(template.template_name, "summary");
        assert_eq!(template.recipients, vec![exchange.organizer_email().unwrap()]);
        let TemplateContext::Summary { assignments, .. } = template.context else {
            panic!("expected a summary context");
        };
        assert_eq!(assignments.len(), 3);
    }

    #[test]
    fn organizer_without_email_cannot_receive_messages() {
        let mut exchange = exchange_with(3);
        exchange.organizer.email_address = " ".to_owned();
        exchange.organizer.phone_number = "555 0100".to_owned();
        let assignments = [assignment(1, 2), assignment(2, 3), assignment(3, 1)];

        let redirected = builder().assignment_message(&exchange, &assignments[0], true);
        assert!(
            matches!(redirected, Err(ExchangeError::InvalidInput(errors)) if errors.has_field("organizerEmailAddress"))
        );
        assert!(matches!(
            builder().summary_message(&exchange, &assignments),
            Err(ExchangeError::InvalidInput(_))
        ));

        let direct = builder()
            .assignment_message(&exchange, &assignments[0], false)
            .unwrap();
        assert_eq!(direct.recipients, vec![participant(1).email()]);
        assert_eq!(direct.reply_to, None);
    }

    #[test]
    fn unknown_participant_is_invalid_input() {
        let exchange = exchange_with(2);
        let error = builder()
            .assignment_message(&exchange, &assignment(1, 5), false)
            .unwrap_err();
        assert!(matches!(error, ExchangeError::InvalidInput(_)));
    }

    #[test]
    fn extra_info_is_wrapped_in_context() {
        let mut exchange = exchange_with(2);
        exchange.extra_info = "word ".repeat(30);
        let details = ExchangeDetails::from(&exchange);
        assert!(details.extra_info.contains(TEMPLATE_NEWLINE));
        assert!(details
            .extra_info
            .split(TEMPLATE_NEWLINE)
            .all(|line| line.len() <= WRAP_WIDTH));
    }
}
