use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;

use itertools::Itertools;
use tracing::info;

use crate::error::DeliveryError;
use crate::message::{EmailMessage, EmailTemplate, TemplateContext, TEMPLATE_NEWLINE};
use crate::model::EmailFormat;

/// Renders templates and hands them to a transport.
///
/// Implementations report failures per message, the dispatcher decides what to do with them.
pub trait EmailService: Send + Sync {
    fn render(&self, template: &EmailTemplate) -> Result<EmailMessage, DeliveryError>;

    fn send(&self, template: EmailTemplate)
        -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

impl<T: EmailService> EmailService for Arc<T> {
    fn render(&self, template: &EmailTemplate) -> Result<EmailMessage, DeliveryError> {
        (**self).render(template)
    }

    fn send(
        &self,
        template: EmailTemplate,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        (**self).send(template)
    }
}

/// Renders a built in plain text layout and logs instead of delivering.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEmailService;

impl EmailService for LoggingEmailService {
    fn render(&self, template: &EmailTemplate) -> Result<EmailMessage, DeliveryError> {
        render_builtin(template)
    }

    async fn send(&self, template: EmailTemplate) -> Result<(), DeliveryError> {
        let message = self.render(&template)?;
        info!(
            to = %message.recipients.iter().map(|recipient| &recipient.address).join(", "),
            subject = %message.subject,
            template = %template.template_name,
            "sending message"
        );
        Ok(())
    }
}

pub fn render_builtin(template: &EmailTemplate) -> Result<EmailMessage, DeliveryError> {
    if template.template_name.trim().is_empty() {
        return Err(DeliveryError::Render("template name is missing".to_owned()));
    }
    if template.recipients.is_empty() {
        return Err(DeliveryError::Render("message has no recipients".to_owned()));
    }
    if let Some(recipient) = template
        .recipients
        .iter()
        .find(|recipient| recipient.address.trim().is_empty())
    {
        return Err(DeliveryError::Render(format!(
            "recipient {} has no address",
            recipient.name
        )));
    }

    let exchange = template.context.exchange();
    let subject = match &template.context {
        TemplateContext::Assignment { .. } => format!("Secret Santa: {}", exchange.name),
        TemplateContext::Summary { .. } => format!("Secret Santa assignments: {}", exchange.name),
    };
    let text = plaintext_body(&template.context).map_err(|error| DeliveryError::Render(error.to_string()))?;
    let (plaintext, html) = match template.format {
        EmailFormat::Plaintext => (Some(text), None),
        EmailFormat::Html => (None, Some(html_body(&text))),
        EmailFormat::Multipart => {
            let html = html_body(&text);
            (Some(text), Some(html))
        }
    };

    Ok(EmailMessage {
        sender: template.sender.clone(),
        reply_to: template.reply_to.clone(),
        recipients: template.recipients.clone(),
        subject,
        plaintext,
        html,
    })
}

fn plaintext_body(context: &TemplateContext) -> Result<String, std::fmt::Error> {
    let nl = TEMPLATE_NEWLINE;
    let exchange = context.exchange();
    let mut body = String::new();
    match context {
        TemplateContext::Assignment {
            giver, recipient, ..
        } => {
            write!(body, "Hello {},{nl}{nl}", giver.name)?;
            write!(
                body,
                "you are the Secret Santa for {} ({}).{nl}{nl}",
                recipient.name, recipient.nickname
            )?;
        }
        TemplateContext::Summary { assignments, .. } => {
            write!(body, "Hello {},{nl}{nl}", exchange.organizer.name)?;
            write!(body, "these are all assignments of your exchange:{nl}{nl}")?;
            for line in assignments {
                write!(body, "  {} -> {}{nl}", line.giver.name, line.recipient.name)?;
            }
            body.push_str(nl);
        }
    }
    write!(body, "Exchange: {}{nl}", exchange.name)?;
    write!(body, "When: {}{nl}", exchange.date_and_time)?;
    write!(body, "Theme: {}{nl}", exchange.theme)?;
    write!(body, "Suggested cost: {}{nl}", exchange.cost)?;
    if !exchange.extra_info.is_empty() {
        write!(body, "{nl}{}{nl}", exchange.extra_info)?;
    }
    Ok(body)
}

fn html_body(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    format!("<pre>{escaped}</pre>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Assignment;
    use crate::message::MessageBuilder;
    use crate::model::ParticipantId;
    use crate::test_support::{config, exchange_with};

    fn template(format: EmailFormat) -> EmailTemplate {
        let mut exchange = exchange_with(2);
        exchange.name = "Family <3".to_owned();
        exchange.template_overrides.email_format = Some(format);
        MessageBuilder::new(Arc::new(config()))
            .assignment_message(
                &exchange,
                &Assignment::new(ParticipantId(1), ParticipantId(2)).unwrap(),
                false,
            )
            .unwrap()
    }

    #[test]
    fn plaintext_mentions_recipient() {
        let message = render_builtin(&template(EmailFormat::Plaintext)).unwrap();
        assert_eq!(message.subject, "Secret Santa: Family <3");
        let body = message.plaintext.unwrap();
        assert!(body.contains("Secret Santa for Participant 2 (p2)"));
        assert!(body.contains("Suggested cost: 20 EUR"));
        assert!(message.html.is_none());
    }

    #[test]
    fn html_is_escaped() {
        let message = render_builtin(&template(EmailFormat::Multipart)).unwrap();
        assert!(message.plaintext.is_some());
        assert!(message.html.unwrap().contains("Family &lt;3"));
    }

    #[test]
    fn blank_recipient_address_fails_rendering() {
        let mut template = template(EmailFormat::Plaintext);
        template.recipients[0].address = String::new();
        assert!(matches!(
            render_builtin(&template),
            Err(DeliveryError::Render(_))
        ));
    }

    #[test]
    fn missing_template_name_fails_rendering() {
        let mut template = template(EmailFormat::Plaintext);
        template.template_name = String::new();
        assert!(matches!(
            render_builtin(&template),
            Err(DeliveryError::Render(_))
        ));
    }
}
