//! gymlog - Personal gym workout log
//!
//! Free-form entries like "жим лежа 80 8x3" go through the numeral
//! normalizer and the input parser into a SQLite journal.

pub mod bot;
pub mod db;
pub mod exercise;
pub mod intent;
pub mod parser;
pub mod report;
pub mod tui;
pub mod voice;

pub use db::Database;
pub use exercise::Exercise;
pub use intent::{Intent, Outcome};
pub use parser::{FormatError, parse_entry, parse_sets};
