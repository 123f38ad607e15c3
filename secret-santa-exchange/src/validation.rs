use crate::assignment::AssignmentSet;
use crate::error::{Result, ValidationErrors};
use crate::model::{Exchange, ParticipantSet, TemplateOverrides};

/// A draw needs somebody to give to.
pub const MIN_PARTICIPANTS: usize = 2;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Checks everything needed to generate assignments or send notifications.
pub fn validate_exchange(exchange: &Exchange) -> Result<()> {
    validate_exchange_with_minimum(exchange, MIN_PARTICIPANTS)
}

pub(crate) fn validate_exchange_with_minimum(exchange: &Exchange, minimum: usize) -> Result<()> {
    let mut details = ValidationErrors::default();

    if is_blank(&exchange.name) {
        details.add("name", "Exchange name is required");
    }
    if is_blank(&exchange.date_and_time) {
        details.add("dateAndTime", "Date and time field is required");
    }
    if is_blank(&exchange.theme) {
        details.add("theme", "Theme is required");
    }
    if is_blank(&exchange.cost) {
        details.add("cost", "Suggested cost is required");
    }
    if is_blank(&exchange.organizer.name) {
        details.add("organizerName", "Organizer name is required");
    }
    if is_blank(&exchange.organizer.email_address) && is_blank(&exchange.organizer.phone_number) {
        details.add(
            "organizerEmailAddress",
            "Provide either email address, phone number, or both",
        );
    }
    if exchange.participants.len() < minimum {
        details.add(
            "participants",
            format!("At least {minimum} participants are required"),
        );
    }
    validate_overrides(&exchange.template_overrides, "templateOverrides", &mut details);
    validate_participants(&exchange.participants, &mut details);

    details.into_result()
}

fn validate_overrides(
    overrides: &TemplateOverrides,
    field: &'static str,
    details: &mut ValidationErrors,
) {
    if overrides.template_name.as_deref().is_some_and(is_blank) {
        details.add(field, "Template name override must not be blank");
    }
    if overrides.sender_name.as_deref().is_some_and(is_blank) {
        details.add(field, "Sender name override must not be blank");
    }
}

fn validate_participants(participants: &ParticipantSet, details: &mut ValidationErrors) {
    let mut name_invalid = false;
    let mut nickname_invalid = false;
    let mut email_invalid = false;
    let mut conflicts_invalid = false;

    for participant in participants {
        name_invalid |= is_blank(&participant.name);
        nickname_invalid |= is_blank(&participant.nickname);
        email_invalid |= is_blank(&participant.email_address);
        conflicts_invalid |= participant
            .conflicts
            .iter()
            .any(|&other| other == participant.id || !participants.contains(other));
        validate_overrides(
            &participant.template_overrides,
            "participantTemplateOverrides",
            details,
        );
    }

    if name_invalid {
        details.add("participantName", "All participants must have a name");
    }
    if nickname_invalid {
        details.add("participantNickname", "All participants must have a nickname");
    }
    if email_invalid {
        details.add(
            "participantEmailAddress",
            "All participants must have an email address",
        );
    }
    if conflicts_invalid {
        details.add(
            "participantConflicts",
            "Conflicts must reference other participants of the same exchange",
        );
    }
}

/// The assignment set must cover exactly the participants of this exchange.
pub fn validate_assignments(exchange: &Exchange, assignments: &AssignmentSet) -> Result<()> {
    let mut details = ValidationErrors::default();
    if assignments.len() != exchange.participants.len() {
        details.add(
            "assignments",
            format!(
                "Expected {} assignments but got {}",
                exchange.participants.len(),
                assignments.len()
            ),
        );
    }
    if let Some(unknown) = assignments
        .givers()
        .find(|&giver| !exchange.participants.contains(giver))
    {
        details.add(
            "assignments",
            format!("{unknown} is not part of {}", exchange.id),
        );
    }
    details.into_result()
}
