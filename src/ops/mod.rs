pub mod filter;
pub mod prompt;
