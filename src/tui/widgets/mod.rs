//! TUI Widgets
//!
//! Custom widgets for the vox-emotion TUI.

mod queue_table;
mod settings;

pub use queue_table::{render_detail, render_queue_table};
pub use settings::render_settings;
