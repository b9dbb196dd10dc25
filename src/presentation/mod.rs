//! Data shapes for the display and control panels.
//!
//! Pure projections of session and roster state; nothing here performs I/O.

pub mod control;
pub mod display;

pub use control::ControlPanel;
pub use display::{DisplayEntry, DisplayPanel, USER_LABEL};
