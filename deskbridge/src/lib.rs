pub mod commands;
pub mod output;
pub mod process;
pub mod settings;
pub mod shell;

pub use commands::{CommandError, Request};
pub use process::{ProcessConnector, ProcessTransport};
pub use shell::Shell;
