//! Front ends for gemchat.
//!
//! - `repl`: line-oriented chat on stdin/stdout
//! - `tui`: full-screen chat with a scrolling transcript
//!
//! Both forward every prompt through a shared `PromptRelay`.

pub mod repl;
pub mod tui;

pub use repl::run_repl;
pub use tui::run_tui;
