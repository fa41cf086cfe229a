//! tryme - run one side of a set-reconciliation session.
//!
//! Usage:
//!   tryme client <sync type>
//!   tryme server <sync type>

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use anyhow::Context;
use gensync::{
    exit_code, observation, parse_args, run, summary, Command, HarnessDefaults, SessionOptions,
    EXIT_OK,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(tracing::Level::INFO)
        .init();

    let (role, protocol) = match parse_args(std::env::args_os()) {
        Command::Usage(text) => {
            println!("{}", text);
            std::process::exit(EXIT_OK);
        }
        Command::Run { role, protocol } => (role, protocol),
    };

    // One session per process, no internal parallelism.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(run(
        role,
        &protocol,
        &HarnessDefaults::default(),
        SessionOptions::default(),
    ));

    let code = match result {
        Ok((outcome, elements)) => {
            println!("{}", summary(&outcome));
            println!("{}", observation(&outcome));
            let contents: Vec<String> = elements
                .contents()
                .map(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
                .collect();
            println!("elements: {{{}}}", contents.join(", "));
            exit_code(&outcome)
        }
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    };

    std::process::exit(code);
}
