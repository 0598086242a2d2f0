pub mod prompt;
pub mod run;
