//! Editor core: state, history and configuration

mod config;
mod history;
mod state;

pub use config::{ConfigError, EditorConfig};
pub use history::Commander;
pub use state::EditorState;
