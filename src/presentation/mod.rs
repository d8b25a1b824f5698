pub mod cli;
pub mod presence;
