use std::{error::Error, fmt::Display, io};

/// Errors of the connection to the device.
///
/// All of them are reported to the [`Host`](crate::Host) as well before they are returned.
#[derive(Debug)]
pub enum LinkError {
    IoError(io::Error),
    /// No host address is configured.
    NoHost,
    NotConnected,
}

impl From<io::Error> for LinkError {
    fn from(value: io::Error) -> Self {
        LinkError::IoError(value)
    }
}

impl Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkError::IoError(error) => write!(f, "Network error: {}", error),
            LinkError::NoHost => write!(f, "No host address configured"),
            LinkError::NotConnected => write!(f, "Not connected"),
        }
    }
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LinkError::IoError(error) => Some(error),
            _ => None,
        }
    }
}
