//! awdl - Keep Apple Wireless Direct Link disabled
//!
//! Command line entry point. Everything lives in the library so the
//! dispatcher can be tested without spawning the binary.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    awdl::dispatcher::run(std::env::args_os()).await
}
