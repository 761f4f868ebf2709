//! Command line representation of the VIO actions
use clap::{Parser, Subcommand, ValueEnum};
use clap_num::number_range;
use vio_protocol::{
    Action, Command,
    action::{INPUTS, OUTPUTS, PRESETS, QUICK_FRAME_SLOTS, TEST_PATTERNS, VIEW_INPUTS, VIEWS},
    error::ActionError,
};

#[derive(ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    fn is_on(self) -> bool {
        self == Switch::On
    }
}

#[derive(Subcommand, Clone, Debug, Eq, PartialEq)]
pub enum ActionCommand {
    /// Transition the preview to the program
    Take,
    Autotake { state: Switch },
    /// Load a preset memory (1-16)
    RecallPreset {
        #[arg(value_parser = parse_preset)]
        preset: u32,
    },
    Freeze { state: Switch },
    /// Load a view memory (1-64)
    RecallView {
        #[arg(value_parser = parse_view)]
        view: u32,
    },
    /// Load a view memory (1-64) together with an input (0-8)
    RecallViewAndInput {
        #[arg(value_parser = parse_view)]
        view: u32,
        #[arg(value_parser = parse_view_input)]
        input: u32,
    },
    /// Select an input (0-9, 0 is none)
    SelectInput {
        #[arg(value_parser = parse_input)]
        input: u32,
    },
    /// Show or hide the quick frame
    QuickFrame { state: Switch },
    /// Select the quick frame slot (1-50)
    QuickFrameSlot {
        #[arg(value_parser = parse_quick_frame_slot)]
        slot: u32,
    },
    /// Switch the test pattern (0-15) of an output (0-5)
    TestPattern {
        #[arg(value_parser = parse_output)]
        output: u32,
        #[arg(value_parser = parse_test_pattern)]
        pattern: u32,
    },
    /// Send a command verbatim
    Raw { command: String },
}

/// One action typed into the interactive prompt, e.g. `recall-preset 3`.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
pub struct ActionLine {
    #[command(subcommand)]
    pub action: ActionCommand,
}

impl ActionLine {
    pub fn parse_line(line: &str) -> Result<ActionCommand, clap::Error> {
        ActionLine::try_parse_from(line.split_whitespace()).map(|l| l.action)
    }
}

impl ActionCommand {
    pub fn command(&self) -> Result<Command, ActionError> {
        let action = match *self {
            ActionCommand::Raw { ref command } => return Ok(Command::new(command.as_str())),
            ActionCommand::Take => Action::Take,
            ActionCommand::Autotake { state } => Action::Autotake(state.is_on()),
            ActionCommand::RecallPreset { preset } => Action::RecallPreset(preset),
            ActionCommand::Freeze { state } => Action::Freeze(state.is_on()),
            ActionCommand::RecallView { view } => Action::RecallView(view),
            ActionCommand::RecallViewAndInput { view, input } => {
                Action::RecallViewAndInput { view, input }
            }
            ActionCommand::SelectInput { input } => Action::SelectInput(input),
            ActionCommand::QuickFrame { state } => Action::QuickFrame(state.is_on()),
            ActionCommand::QuickFrameSlot { slot } => Action::QuickFrameSlot(slot),
            ActionCommand::TestPattern { output, pattern } => {
                Action::TestPattern { output, pattern }
            }
        };
        log::debug!("{} ({})", action, action.id());
        action.command()
    }
}

fn parse_preset(s: &str) -> Result<u32, String> {
    number_range(s, *PRESETS.start(), *PRESETS.end())
}

fn parse_view(s: &str) -> Result<u32, String> {
    number_range(s, *VIEWS.start(), *VIEWS.end())
}

fn parse_quick_frame_slot(s: &str) -> Result<u32, String> {
    number_range(s, *QUICK_FRAME_SLOTS.start(), *QUICK_FRAME_SLOTS.end())
}

fn table_index(s: &str, table: &[&str]) -> Result<u32, String> {
    number_range(s, 0, table.len() as u32 - 1)
}

fn parse_view_input(s: &str) -> Result<u32, String> {
    table_index(s, VIEW_INPUTS)
}

fn parse_input(s: &str) -> Result<u32, String> {
    table_index(s, INPUTS)
}

fn parse_output(s: &str) -> Result<u32, String> {
    table_index(s, OUTPUTS)
}

fn parse_test_pattern(s: &str) -> Result<u32, String> {
    table_index(s, TEST_PATTERNS)
}
