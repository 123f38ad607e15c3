//! Draws Secret Santa assignments that respect conflicts and notifies every gift giver.

pub mod assignment;
pub mod audit;
pub mod conflict;
pub mod dispatch;
pub mod email;
pub mod error;
pub mod generator;
pub mod message;
pub mod model;
pub mod preview;
pub mod repository;
pub mod service;
#[cfg(test)]
mod test_support;
pub mod validation;

pub use assignment::{Assignment, AssignmentSet};
pub use audit::{AuditEvent, AuditSink, TracingAuditSink};
pub use conflict::{ConflictGraph, ConflictPolicy, ConflictResolver, SameEmailDomain, SharedHousehold};
pub use dispatch::{DeliveryFailure, DispatchReport, NotificationDispatcher};
pub use email::{EmailService, LoggingEmailService};
pub use error::{DeliveryError, ExchangeError, Result, ValidationErrors};
pub use generator::AssignmentGenerator;
pub use message::{EmailMessage, EmailTemplate, MessageBuilder};
pub use model::{Exchange, ExchangeId, ExchangeState, Participant, ParticipantId};
pub use preview::generate_preview;
pub use repository::{ExchangeRepository, InMemoryExchangeRepository, Versioned};
pub use service::ExchangeService;
