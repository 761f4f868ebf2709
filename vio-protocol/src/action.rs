//! The user facing actions of the VIO and their command encoding.
use std::{collections::BTreeMap, fmt::Display, ops::RangeInclusive};

use crate::{error::ActionError, protocol::Command};

/// Raw option values of an action, keyed by option id.
///
/// Generic actions use the ids `"0"` to `"5"` for indices and `"value"` for the value.
pub type Options = BTreeMap<String, String>;

pub const PRESETS: RangeInclusive<u32> = 1..=16;
pub const VIEWS: RangeInclusive<u32> = 1..=64;
pub const QUICK_FRAME_SLOTS: RangeInclusive<u32> = 1..=50;

/// Inputs selectable together with a view, indexed by their id.
pub const VIEW_INPUTS: &[&str] = &[
    "DisplayPort",
    "HDMI Backpanel",
    "HD15-Analog",
    "Optical",
    "SDI",
    "DVI-D",
    "HDMI Frontpanel",
    "Option Card 1",
    "Option Card 2",
];

/// Inputs of the `PRinp` command, indexed by their id.
pub const INPUTS: &[&str] = &[
    "None",
    "DisplayPort",
    "HDMI Backpanel",
    "HD15-Analog",
    "Optical",
    "SDI",
    "DVI-D",
    "HDMI Frontpanel",
    "Option Card 1",
    "Option Card 2",
];

pub const OUTPUTS: &[&str] = &[
    "Main output of master device",
    "Option 1 output of master device",
    "Option 2 output of master device",
    "Main output of slave device",
    "Option 1 output of slave device",
    "Option 2 output of slave device",
];

pub const TEST_PATTERNS: &[&str] = &[
    "No Pattern",
    "Color Pattern",
    "Vertical Grey Scale",
    "Horizontal Grey Scale",
    "Vertical Color Bar",
    "Horizontal Color Bar",
    "Grid 16x16",
    "Grid 32x32",
    "Grid custom size",
    "SMPTE",
    "Horizontal Burst",
    "Vertical Burst",
    "Vertical Gradient",
    "Horizontal Gradient",
    "Crosshatch",
    "Checkerboard",
];

/// An action a user can trigger on the VIO.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// Transition the preview to the program.
    Take,
    Autotake(bool),
    /// Load a preset memory (1 to 16).
    RecallPreset(u32),
    Freeze(bool),
    /// Load a view memory (1 to 64) on screen 0.
    RecallView(u32),
    /// Load a view memory (1 to 64) together with an input, see [`VIEW_INPUTS`].
    RecallViewAndInput { view: u32, input: u32 },
    /// Select an input, see [`INPUTS`].
    SelectInput(u32),
    /// Show or hide the quick frame.
    QuickFrame(bool),
    /// Slot (1 to 50) used for the quick frame.
    QuickFrameSlot(u32),
    /// Switch the test pattern of an output, see [`OUTPUTS`] and [`TEST_PATTERNS`].
    TestPattern { output: u32, pattern: u32 },
}

impl Action {
    pub const TAKE: &str = "1PCrpr";
    pub const AUTOTAKE: &str = "PCpum";
    pub const RECALL_PRESET: &str = "recallpreset";
    pub const FREEZE: &str = "PFfal";
    pub const RECALL_VIEW: &str = "recallview";
    pub const RECALL_VIEW_AND_INPUT: &str = "recallviewandinput";
    pub const SELECT_INPUT: &str = "PRinp";
    pub const QUICK_FRAME: &str = "QFfor";
    pub const QUICK_FRAME_SLOT: &str = "QFsel";
    pub const TEST_PATTERN: &str = "OUpat";

    /// The action identifier. For generic actions this is also the command suffix.
    pub fn id(&self) -> &'static str {
        match self {
            Action::Take => Self::TAKE,
            Action::Autotake(_) => Self::AUTOTAKE,
            Action::RecallPreset(_) => Self::RECALL_PRESET,
            Action::Freeze(_) => Self::FREEZE,
            Action::RecallView(_) => Self::RECALL_VIEW,
            Action::RecallViewAndInput { .. } => Self::RECALL_VIEW_AND_INPUT,
            Action::SelectInput(_) => Self::SELECT_INPUT,
            Action::QuickFrame(_) => Self::QUICK_FRAME,
            Action::QuickFrameSlot(_) => Self::QUICK_FRAME_SLOT,
            Action::TestPattern { .. } => Self::TEST_PATTERN,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Take => "Take",
            Action::Autotake(_) => "Use Autotake",
            Action::RecallPreset(_) => "Recall Preset",
            Action::Freeze(_) => "Freeze",
            Action::RecallView(_) => "Recall View",
            Action::RecallViewAndInput { .. } => "Recall View and Input",
            Action::SelectInput(_) => "Select Input",
            Action::QuickFrame(_) => "Display Quick Frame",
            Action::QuickFrameSlot(_) => "Select Quick Frame Slot",
            Action::TestPattern { .. } => "Switch Testpattern",
        }
    }

    /// Checks all option values against the ranges the device accepts.
    pub fn validate(&self) -> Result<(), ActionError> {
        match *self {
            Action::Take | Action::Autotake(_) | Action::Freeze(_) | Action::QuickFrame(_) => {
                Ok(())
            }
            Action::RecallPreset(preset) => check_range("preset", preset, PRESETS),
            Action::RecallView(view) => check_range("view", view, VIEWS),
            Action::RecallViewAndInput { view, input } => {
                check_range("view", view, VIEWS)?;
                check_table("input", input, VIEW_INPUTS)
            }
            Action::SelectInput(input) => check_table("value", input, INPUTS),
            Action::QuickFrameSlot(slot) => check_range("value", slot, QUICK_FRAME_SLOTS),
            Action::TestPattern { output, pattern } => {
                check_table("0", output, OUTPUTS)?;
                check_table("value", pattern, TEST_PATTERNS)
            }
        }
    }

    /// The options of this action, as the host framework would deliver them.
    pub fn options(&self) -> Options {
        let flag = |on: bool| (if on { "1" } else { "0" }).to_string();
        let entries: Vec<(&str, String)> = match *self {
            Action::Take => vec![],
            Action::Autotake(on) | Action::Freeze(on) | Action::QuickFrame(on) => {
                vec![("value", flag(on))]
            }
            Action::RecallPreset(preset) => vec![("preset", preset.to_string())],
            Action::RecallView(view) => vec![("view", view.to_string())],
            Action::RecallViewAndInput { view, input } => {
                vec![("view", view.to_string()), ("input", input.to_string())]
            }
            Action::SelectInput(value) | Action::QuickFrameSlot(value) => {
                vec![("value", value.to_string())]
            }
            Action::TestPattern { output, pattern } => {
                vec![("0", output.to_string()), ("value", pattern.to_string())]
            }
        };
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    /// Validates the action and encodes it as a command.
    pub fn command(&self) -> Result<Command, ActionError> {
        self.validate()?;
        Command::from_action_request(self.id(), &self.options())
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn check_range(
    option: &'static str,
    value: u32,
    range: RangeInclusive<u32>,
) -> Result<(), ActionError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ActionError::OutOfRange {
            option,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn check_table(option: &'static str, value: u32, table: &[&str]) -> Result<(), ActionError> {
    check_range(option, value, 0..=(table.len() as u32 - 1))
}

impl Command {
    const INDEX_KEYS: [&str; 6] = ["0", "1", "2", "3", "4", "5"];
    const VALUE_KEY: &str = "value";

    /// Builds the command for an action identifier and its raw options.
    ///
    /// Generic actions are encoded as `<0>,<1>,...,<5>,<value><id>`, skipping empty options.
    /// Presets and views are entered one-based and sent zero-based.
    pub fn from_action_request(action: &str, options: &Options) -> Result<Command, ActionError> {
        let body = match action {
            "" => return Err(ActionError::EmptyAction),
            Action::RECALL_PRESET => format!("{},1PKrcr", memory_index(options, "preset")?),
            // screen is always 0
            Action::RECALL_VIEW => format!("{},0,1PBirr", memory_index(options, "view")?),
            Action::RECALL_VIEW_AND_INPUT => format!(
                "{},0{},1PBrcr",
                memory_index(options, "view")?,
                number(options, "input")?
            ),
            generic => {
                let mut body = String::new();
                for key in Self::INDEX_KEYS {
                    if let Some(index) = non_empty(options, key) {
                        body.push_str(index);
                        body.push(',');
                    }
                }
                if let Some(value) = non_empty(options, Self::VALUE_KEY) {
                    body.push_str(value);
                }
                body.push_str(generic);
                body
            }
        };
        Ok(Command::new(body))
    }
}

fn non_empty<'a>(options: &'a Options, key: &str) -> Option<&'a str> {
    options
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn number(options: &Options, key: &'static str) -> Result<u32, ActionError> {
    let value = non_empty(options, key).ok_or(ActionError::MissingOption(key))?;
    value.parse::<u32>().map_err(|_| ActionError::InvalidOption {
        option: key,
        value: value.to_string(),
    })
}

/// Converts a one-based memory number into the zero-based index the device expects.
fn memory_index(options: &Options, key: &'static str) -> Result<u32, ActionError> {
    let number = number(options, key)?;
    number.checked_sub(1).ok_or(ActionError::OutOfRange {
        option: key,
        value: number,
        min: 1,
        max: u32::MAX,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn options(entries: &[(&str, &str)]) -> Options {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn encode(action: Action) -> String {
        action.command().unwrap().as_str().to_string()
    }

    #[test]
    fn bespoke_actions() {
        assert_eq!(encode(Action::RecallPreset(1)), "0,1PKrcr");
        assert_eq!(encode(Action::RecallPreset(16)), "15,1PKrcr");
        assert_eq!(encode(Action::RecallView(64)), "63,0,1PBirr");
        assert_eq!(
            encode(Action::RecallViewAndInput { view: 5, input: 3 }),
            "4,03,1PBrcr"
        );
    }

    #[test]
    fn generic_actions() {
        assert_eq!(encode(Action::Take), "1PCrpr");
        assert_eq!(encode(Action::Autotake(false)), "0PCpum");
        assert_eq!(encode(Action::Freeze(true)), "1PFfal");
        assert_eq!(encode(Action::SelectInput(9)), "9PRinp");
        assert_eq!(encode(Action::QuickFrame(true)), "1QFfor");
        assert_eq!(encode(Action::QuickFrameSlot(50)), "50QFsel");
        assert_eq!(
            encode(Action::TestPattern {
                output: 2,
                pattern: 15
            }),
            "2,15OUpat"
        );
    }

    #[test]
    fn generic_request_orders_indices_and_skips_empty() {
        let opts = options(&[("value", "7"), ("3", "2"), ("0", "1"), ("1", ""), ("label", "x")]);
        let cmd = Command::from_action_request("ABcde", &opts).unwrap();
        assert_eq!(cmd.as_str(), "1,2,7ABcde");

        let cmd = Command::from_action_request("XYget", &options(&[("0", "4")])).unwrap();
        assert_eq!(cmd.as_str(), "4,XYget");
    }

    #[test]
    fn invalid_requests() {
        assert_eq!(
            Command::from_action_request("", &Options::new()),
            Err(ActionError::EmptyAction)
        );
        assert_eq!(
            Command::from_action_request(Action::RECALL_PRESET, &Options::new()),
            Err(ActionError::MissingOption("preset"))
        );
        assert!(matches!(
            Command::from_action_request(Action::RECALL_VIEW, &options(&[("view", "abc")])),
            Err(ActionError::InvalidOption { option: "view", .. })
        ));
        assert!(matches!(
            Command::from_action_request(Action::RECALL_VIEW, &options(&[("view", "0")])),
            Err(ActionError::OutOfRange { value: 0, .. })
        ));
    }

    #[test]
    fn leading_zeros_are_accepted() {
        let cmd =
            Command::from_action_request(Action::RECALL_PRESET, &options(&[("preset", "03")]))
                .unwrap();
        assert_eq!(cmd.as_str(), "2,1PKrcr");
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        assert!(Action::RecallPreset(17).command().is_err());
        assert!(Action::RecallView(0).command().is_err());
        assert!(Action::RecallViewAndInput { view: 1, input: 9 }.command().is_err());
        assert!(Action::SelectInput(10).command().is_err());
        assert!(Action::QuickFrameSlot(51).command().is_err());
        assert_eq!(
            Action::TestPattern {
                output: 6,
                pattern: 0
            }
            .validate(),
            Err(ActionError::OutOfRange {
                option: "0",
                value: 6,
                min: 0,
                max: 5
            })
        );
    }
}
