//! Protocol module containing the frame codec, command types, and the
//! serial identifier counter.

pub mod commands;
pub mod frame;
pub mod serial;

pub use commands::{ClientCommand, ServerCommand};
pub use frame::{format_frame, parse_frame, Frame};
pub use serial::SerialCounter;
