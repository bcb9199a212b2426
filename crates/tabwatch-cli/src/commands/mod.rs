pub mod categorize;
pub mod control;
pub mod run;
pub mod settings;
