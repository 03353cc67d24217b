pub mod fields;
pub mod issue;
pub mod severity;
pub mod terminal;
