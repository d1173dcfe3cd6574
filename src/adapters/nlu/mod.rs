//! Interpreter Adapters
//!
//! - **RegexInterpreter** - Deterministic patterns loaded from YAML
//! - **MockInterpreter** - Fixed responses (testing)

mod mock_interpreter;
mod regex_interpreter;

pub use mock_interpreter::MockInterpreter;
pub use regex_interpreter::RegexInterpreter;
