//! Terminal output: styled reporter, progress bars and tables.

pub mod progress;
pub mod reporter;
pub mod table;

pub use reporter::TerminalReporter;
