pub mod config;
pub mod issue;

pub use config::*;
pub use issue::*;
