use std::fmt;

use secret_santa_config::ConfigError;

use crate::assignment::AssignmentError;
use crate::model::{DuplicateParticipant, ExchangeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessage {
    pub field: &'static str,
    pub message: String,
}

/// Everything that is wrong with an input, collected instead of stopping at the first problem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationMessage>);

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(ValidationMessage {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|message| message.field == field)
    }

    #[must_use]
    pub fn messages(&self) -> &[ValidationMessage] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), ExchangeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ExchangeError::InvalidInput(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, message) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", message.field, message.message)?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("failed to render message: {0}")]
    Render(String),
    #[error("failed to transport message: {0}")]
    Transport(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ExchangeError {
    #[error("invalid input: {0}")]
    InvalidInput(ValidationErrors),
    /// `attempts` is zero when the conflicts were found unsatisfiable before any draw.
    #[error("{}", describe_infeasible(.attempts))]
    Infeasible { attempts: u32 },
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("{0} not found")]
    NotFound(ExchangeId),
    #[error("{0} was modified concurrently")]
    Conflict(ExchangeId),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<AssignmentError> for ExchangeError {
    fn from(value: AssignmentError) -> Self {
        Self::InvalidInput(ValidationErrors::single("assignments", value.to_string()))
    }
}

impl From<DuplicateParticipant> for ExchangeError {
    fn from(value: DuplicateParticipant) -> Self {
        Self::InvalidInput(ValidationErrors::single("participants", value.to_string()))
    }
}

impl ExchangeError {
    /// Infeasibility is a kind of invalid input, the caller may relax constraints and try again.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Infeasible { .. })
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn describe_infeasible(attempts: &u32) -> String {
    if *attempts == 0 {
        "conflicts leave no valid assignment".to_owned()
    } else {
        format!("unable to generate a valid assignment after {attempts} attempts")
    }
}

pub type Result<T, E = ExchangeError> = core::result::Result<T, E>;
