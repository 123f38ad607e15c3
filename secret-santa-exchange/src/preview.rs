use tracing::debug;

use crate::email::EmailService;
use crate::error::{ExchangeError, Result, ValidationErrors};
use crate::message::{EmailMessage, MessageBuilder, PersonDetails};
use crate::model::Exchange;
use crate::validation::validate_exchange_with_minimum;

/// Renders what the first participant would receive, without an assignment and without sending.
pub fn generate_preview<E: EmailService>(
    messages: &MessageBuilder,
    email: &E,
    exchange: &Exchange,
) -> Result<EmailMessage> {
    validate_exchange_with_minimum(exchange, 1)?;

    let mut participants = exchange.participants.iter();
    let giver = participants.next().ok_or_else(|| {
        ExchangeError::InvalidInput(ValidationErrors::single(
            "participants",
            "at least one participant is required",
        ))
    })?;
    let recipient = participants
        .next()
        .map_or_else(PersonDetails::placeholder, PersonDetails::from);

    let template = messages.message_for(exchange, giver, recipient, false)?;
    let message = email.render(&template)?;
    debug!(exchange_id = exchange.id.0, "rendered preview");
    Ok(message)
}
