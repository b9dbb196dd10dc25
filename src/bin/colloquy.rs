//! Terminal driver for multi-role conversations.
//! Run with: cargo run --bin colloquy

use std::process::ExitCode;

use colloquy::start_colloquy;

fn main() -> ExitCode {
    start_colloquy::run()
}
