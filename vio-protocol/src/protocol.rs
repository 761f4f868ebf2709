use std::fmt::Display;

/// TCP port the VIO listens on for controllers.
pub const DEFAULT_PORT: u16 = 10600;

/// Model code reported by a VIO 4K. Every other code is a different Analog Way product.
pub const VIO_4K_MODEL: u32 = 1024;

/// The device accepts at most this many concurrent controllers.
pub const MAX_CONTROLLERS: u32 = 5;

/// A response line sent by the device, interpreted.
///
/// A single line may yield more than one response, see [`Response::parse_all`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// `TPcon<n>`: number of controllers currently connected, including this one.
    ConnectionCount(u32),
    /// `DEV<n>`: model code of the device.
    Device(u32),
    /// `TPver<index>,<version>`: version of the command set of the device at `index`.
    Version { index: u32, command_set: u32 },
    /// `TPdie0`: no parameter readback is running on the device.
    ReadbackIdle,
    /// `E<nn>`: the device rejected a command.
    Error(ErrorCode),
}

/// Error codes reported by the device with an `E<nn>` line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// E10
    CommandName,
    /// E11
    IndexOutOfRange,
    /// E12
    IndexCount,
    /// E13
    ValueOutOfRange,
    /// Any other two digit code
    Unspecified(u8),
}

impl ErrorCode {
    pub fn from_code(code: u8) -> ErrorCode {
        match code {
            10 => ErrorCode::CommandName,
            11 => ErrorCode::IndexOutOfRange,
            12 => ErrorCode::IndexCount,
            13 => ErrorCode::ValueOutOfRange,
            other => ErrorCode::Unspecified(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            ErrorCode::CommandName => 10,
            ErrorCode::IndexOutOfRange => 11,
            ErrorCode::IndexCount => 12,
            ErrorCode::ValueOutOfRange => 13,
            ErrorCode::Unspecified(code) => *code,
        }
    }

    /// Human readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::CommandName => "command name error",
            ErrorCode::IndexOutOfRange => "index value out of range error",
            ErrorCode::IndexCount => "index count (too few or too many) error",
            ErrorCode::ValueOutOfRange => "value out of range error",
            ErrorCode::Unspecified(_) => "unspecified error",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{:02} ({})", self.code(), self.description())
    }
}

/// Resolves a model code as reported by `DEV<n>` to the product name.
pub fn model_name(code: u32) -> &'static str {
    match code {
        97 => "NeXtage 16",
        98 => "SmartMatriX Ultra",
        99 => "Ascender 32",
        100 => "Ascender 48",
        102 => "Output Expander 16",
        103 => "Output Expander 32",
        104 => "Output Expander 48",
        105 => "NeXtage 16 - 4K",
        106 => "SmartMatriX Ultra - 4K",
        107 => "Ascender 32 - 4K",
        108 => "Ascender 48 - 4K",
        112 => "Ascender 16",
        113 => "Ascender 16 - 4K",
        114 => "Ascender 48 - 4K - PL",
        115 => "Output Expander 48 - 4K - PL",
        116 => "NeXtage 08",
        117 => "NeXtage 08 - 4K",
        118 => "Ascender 32 - 4K - PL",
        119 => "Output Expander 32 - 4K - PL",
        VIO_4K_MODEL => "VIO 4K",
        _ => "unknown",
    }
}

#[test]
fn model_names() {
    assert_eq!(model_name(97), "NeXtage 16");
    assert_eq!(model_name(1024), "VIO 4K");
    assert_eq!(model_name(101), "unknown");
    assert_eq!(model_name(0), "unknown");
}

/// Facts about the connected device, learned from its responses during one session.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceIdentity {
    model: Option<u32>,
    command_set_version: Option<u32>,
}

impl DeviceIdentity {
    /// The model code, once the device reported it.
    pub fn model(&self) -> Option<u32> {
        self.model
    }

    /// The product name belonging to the model code.
    pub fn model_name(&self) -> Option<&'static str> {
        self.model.map(model_name)
    }

    pub fn command_set_version(&self) -> Option<u32> {
        self.command_set_version
    }

    /// Whether the device identified itself as a VIO 4K.
    pub fn is_supported(&self) -> bool {
        self.model == Some(VIO_4K_MODEL)
    }

    pub fn record_model(&mut self, model: u32) {
        self.model = Some(model);
    }

    pub fn record_command_set_version(&mut self, version: u32) {
        self.command_set_version = Some(version);
    }
}

/// The body of a command sent to the device.
/// The line terminator is added when the command is written, see [`Command::write_to`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Command {
    body: String,
}

impl Command {
    /// The line terminator of outbound commands.
    pub const TERMINATOR: u8 = b'\n';

    pub fn new(body: impl Into<String>) -> Command {
        Command { body: body.into() }
    }

    /// The empty command. The device answers it with its controller count (`TPcon<n>`).
    pub fn diagnostic() -> Command {
        Command::default()
    }

    /// Asks the device for its model (`DEV<n>`).
    pub fn query() -> Command {
        Command::new("?")
    }

    /// Asks the device for its command set version (`TPver<i>,<v>`).
    pub fn version_request() -> Command {
        Command::new("0,TPver")
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.body)
    }
}

impl From<&str> for Command {
    fn from(value: &str) -> Self {
        Command::new(value)
    }
}

impl From<String> for Command {
    fn from(value: String) -> Self {
        Command::new(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(ErrorCode::from_code(13), ErrorCode::ValueOutOfRange);
        assert_eq!(ErrorCode::from_code(42), ErrorCode::Unspecified(42));
        assert_eq!(ErrorCode::from_code(11).code(), 11);
        assert_eq!(
            ErrorCode::IndexCount.to_string(),
            "E12 (index count (too few or too many) error)"
        );
    }

    #[test]
    fn identity_tracks_reports() {
        let mut identity = DeviceIdentity::default();
        assert_eq!(identity.model(), None);
        assert!(!identity.is_supported());

        identity.record_model(105);
        assert_eq!(identity.model_name(), Some("NeXtage 16 - 4K"));
        assert!(!identity.is_supported());

        identity.record_model(VIO_4K_MODEL);
        identity.record_command_set_version(7);
        assert!(identity.is_supported());
        assert_eq!(identity.command_set_version(), Some(7));
    }
}
