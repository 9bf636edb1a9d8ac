pub mod args;

use clap::Parser;
pub use args::{Arguments, PairingPolicy, Scheduler};

pub fn parse() -> Arguments {
    Arguments::parse()
}
