use std::{error::Error, fmt::Display};

/// Errors that may occur when turning an action into a command.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ActionError {
    EmptyAction,
    MissingOption(&'static str),
    InvalidOption { option: &'static str, value: String },
    OutOfRange { option: &'static str, value: u32, min: u32, max: u32 },
}

impl Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::EmptyAction => write!(f, "Action identifier must not be empty"),
            ActionError::MissingOption(option) => write!(f, "Missing option '{}'", option),
            ActionError::InvalidOption { option, value } => {
                write!(f, "Option '{}' is not a number: '{}'", option, value)
            }
            ActionError::OutOfRange {
                option,
                value,
                min,
                max,
            } => write!(
                f,
                "Option '{}' must be between {} and {}, but got {}",
                option, min, max, value
            ),
        }
    }
}

impl Error for ActionError {}
