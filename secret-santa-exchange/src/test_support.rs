use secret_santa_config::{EmailFormat, ExchangeConfig};

use crate::model::{
    Exchange, ExchangeId, ExchangeState, Organizer, Participant, ParticipantId, ParticipantSet,
    TemplateOverrides,
};

pub fn participant(id: u64) -> Participant {
    Participant::new(
        ParticipantId(id),
        format!("Participant {id}"),
        format!("p{id}"),
        format!("p{id}@home{id}.example"),
    )
}

pub fn exchange_of(participants: Vec<Participant>) -> Exchange {
    Exchange {
        id: ExchangeId(7),
        state: ExchangeState::New,
        name: "Office party".to_owned(),
        date_and_time: "December 20th, 6 pm".to_owned(),
        theme: "Books".to_owned(),
        cost: "20 EUR".to_owned(),
        extra_info: "Bring snacks.".to_owned(),
        organizer: Organizer {
            name: "Olivia Organizer".to_owned(),
            email_address: "olivia@example.org".to_owned(),
            phone_number: String::new(),
        },
        template_overrides: TemplateOverrides::default(),
        auto_detect: true,
        participants: ParticipantSet::try_from(participants).unwrap(),
        assignments: None,
    }
}

pub fn exchange_with(count: u64) -> Exchange {
    exchange_of((1..=count).map(participant).collect())
}

pub fn config() -> ExchangeConfig {
    ExchangeConfig {
        template_group: "santa".to_owned(),
        sender_name: "Secret Santa".to_owned(),
        sender_address: "santa@example.org".to_owned(),
        default_email_format: EmailFormat::Plaintext,
        default_template_name: "notification".to_owned(),
        summary_template_name: "summary".to_owned(),
        max_attempts: 50,
        send_concurrency: 4,
        precheck_feasibility: true,
        detect_shared_email_domain: false,
        ignored_email_domains: Vec::new(),
    }
}
