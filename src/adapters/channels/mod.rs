//! Output Channel Adapters
//!
//! - **CollectingOutputChannel** - Records messages in memory
//! - **ConsoleOutputChannel** - Prints messages to stdout

mod collecting;
mod console;

pub use collecting::CollectingOutputChannel;
pub use console::ConsoleOutputChannel;
