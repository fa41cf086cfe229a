//! Command-line parsing.
//!
//! Two positional arguments: a mode (`client` or `server`) and a protocol
//! name; anything after them is ignored. Anything the parser rejects yields
//! the usage text rather than an error, and the process exits 0.

use std::ffi::OsString;

use clap::{error::ErrorKind, Parser, ValueEnum};
use gensync_core::{ProtocolIdentity, Role};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "tryme", about = "Reconcile a small element set with a peer")]
pub struct Cli {
    /// Run as the connecting client or the listening server.
    #[arg(value_enum)]
    pub mode: Mode,

    /// Protocol name, e.g. CPISync or IBLTSync.
    pub protocol: String,

    /// Anything after the protocol name is ignored.
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub ignored: Vec<String>,
}

/// Process mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Client,
    Server,
}

impl From<Mode> for Role {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Client => Role::Initiator,
            Mode::Server => Role::Responder,
        }
    }
}

/// What the process should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print this text and exit 0.
    Usage(String),
    /// Run a session. The protocol name is resolved later so that an
    /// unknown name is reported distinctly from bad usage.
    Run { role: Role, protocol: String },
}

/// Parse process arguments, including the program name in position 0.
pub fn parse_args<I, T>(args: I) -> Command
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut args = args.into_iter().map(Into::into).peekable();
    let program = args
        .peek()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tryme".to_string());

    match Cli::try_parse_from(args) {
        Ok(cli) => Command::Run {
            role: cli.mode.into(),
            protocol: cli.protocol,
        },
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Command::Usage(e.to_string())
        }
        Err(_) => Command::Usage(usage(&program)),
    }
}

/// The usage text.
pub fn usage(program: &str) -> String {
    let names: Vec<&str> = ProtocolIdentity::ALL.iter().map(|p| p.name()).collect();
    format!(
        "usage: '{program} client <sync type>' for client mode, '{program} server <sync type>' for server mode.\n\
         run the client in one terminal instance and the server in another.\n\
         sync types: {}",
        names.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_and_server() {
        assert_eq!(
            parse_args(["tryme", "client", "CPISync"]),
            Command::Run {
                role: Role::Initiator,
                protocol: "CPISync".into()
            }
        );
        assert_eq!(
            parse_args(["tryme", "server", "NotAProtocol"]),
            Command::Run {
                role: Role::Responder,
                protocol: "NotAProtocol".into()
            }
        );
    }

    #[test]
    fn test_trailing_arguments_ignored() {
        assert_eq!(
            parse_args(["tryme", "client", "CPISync", "extra", "--flag"]),
            Command::Run {
                role: Role::Initiator,
                protocol: "CPISync".into()
            }
        );
    }

    #[test]
    fn test_missing_arguments_print_usage() {
        assert!(matches!(parse_args(["tryme"]), Command::Usage(_)));
        assert!(matches!(parse_args(["tryme", "client"]), Command::Usage(_)));
    }

    #[test]
    fn test_unknown_mode_prints_usage() {
        match parse_args(["./tryme", "peer", "CPISync"]) {
            Command::Usage(text) => {
                assert!(text.starts_with("usage: './tryme client <sync type>'"));
                assert!(text.contains("OneWayIBLTSync"));
            }
            other => panic!("expected usage, got {:?}", other),
        }
        // Mode matching is exact.
        assert!(matches!(
            parse_args(["tryme", "Client", "CPISync"]),
            Command::Usage(_)
        ));
    }

    #[test]
    fn test_help_prints_usage() {
        assert!(matches!(parse_args(["tryme", "--help"]), Command::Usage(_)));
    }
}
