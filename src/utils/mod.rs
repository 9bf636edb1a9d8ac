pub mod command;
pub mod discovery;
pub mod file;
pub mod jobscript;
pub mod scheduler;
