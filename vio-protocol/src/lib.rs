//! # VIO Protocol Library
//!
//! This crate implements the line based control protocol of the
//! [Analog Way VIO 4K](https://www.analogway.com) video processor.
//!
//! ## Overview
//!
//! Controllers talk to the VIO over a plain TCP connection on port
//! [`DEFAULT_PORT`]. This library contains everything that does not need a socket:
//!
//! - Encode user actions into commands
//! - Reassemble response lines from a byte stream
//! - Interpret response lines
//! - Resolve model codes and error codes
//!
//! ## Basic Usage
//!
//! ### Encoding an Action
//!
//! ```
//! use vio_protocol::{Action, Command};
//!
//! let command = Action::RecallViewAndInput { view: 5, input: 3 }
//!     .command()
//!     .expect("Action should be valid");
//! assert_eq!(command.as_str(), "4,03,1PBrcr");
//! assert_eq!(command.to_bytes(), b"4,03,1PBrcr\n");
//! ```
//!
//! ### Reading Responses
//!
//! ```
//! use vio_protocol::{Response, codec::LineBuffer};
//!
//! let mut buffer = LineBuffer::new();
//! assert!(buffer.push(b"TPcon2\r").is_empty());
//! let lines = buffer.push(b"\nDEV1024\r\n");
//! assert_eq!(lines, vec!["TPcon2", "DEV1024"]);
//! assert_eq!(Response::parse_all(&lines[1]), vec![Response::Device(1024)]);
//! ```
//!
//! ## Message Format
//!
//! Commands are ASCII and terminated by `\n`. Most commands have the form
//! `<index 0>,...,<index 5>,<value><command id>`, e.g. `1PFfal` to freeze the
//! output or `2,9OUpat` to show the SMPTE pattern on output 2.
//!
//! Responses are terminated by `\r\n`. The following are interpreted:
//!
//! - **`TPcon<n>`**: number of connected controllers
//! - **`DEV<n>`**: model code, `1024` for a VIO 4K
//! - **`TPver<i>,<v>`**: command set version
//! - **`TPdie0`**: no parameter readback running
//! - **`E<nn>`**: the last command was rejected
//!
//! ## Error Handling
//!
//! Invalid action options are reported with [`error::ActionError`].
//! Response parsing never fails; lines without a known pattern are ignored.

pub mod protocol;
pub use protocol::*;
pub mod action;
pub use action::{Action, Options};
pub mod codec;
pub mod error;
