//! Binary error types with miette diagnostics.

use std::net::SocketAddr;

use miette::Diagnostic;
use thiserror::Error;

use ponwatch_config::ConfigError;
use ponwatch_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const DEVICE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("configuration is invalid")]
    #[diagnostic(
        code(ponwatch::config),
        help("Check the file passed with --config and any PONWATCH_* environment overrides.")
    )]
    Config(#[source] ConfigError),

    #[error("board {board} pon {pon} is not configured")]
    #[diagnostic(
        code(ponwatch::unknown_port),
        help("Add an [[olt.ports]] entry for this coordinate.")
    )]
    UnknownPort { board: u32, pon: u32 },

    #[error("ONU {onu_id} not found on board {board} pon {pon}")]
    #[diagnostic(code(ponwatch::not_found))]
    NotFound { board: u32, pon: u32, onu_id: u32 },

    #[error("OLT request failed")]
    #[diagnostic(
        code(ponwatch::device),
        help("Verify [snmp] host, port and community, and that the OLT answers SNMPv2c.")
    )]
    Device(#[source] CoreError),

    #[error(transparent)]
    #[diagnostic(code(ponwatch::internal))]
    Core(CoreError),

    #[error("cannot listen on {addr}")]
    #[diagnostic(code(ponwatch::bind), help("Change [server] listen or free the port."))]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics server failed")]
    #[diagnostic(code(ponwatch::server))]
    Server(#[source] std::io::Error),

    #[error("failed to render output")]
    #[diagnostic(code(ponwatch::output))]
    Output(#[source] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::UnknownPort { .. } => exit_code::CONFIG,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Device(_) => exit_code::DEVICE,
            Self::Core(_) | Self::Bind { .. } | Self::Server(_) | Self::Output(_) => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCoordinate { board, pon } => Self::UnknownPort { board, pon },
            CoreError::TerminalNotFound { board, pon, onu_id } => Self::NotFound { board, pon, onu_id },
            err if err.is_protocol() => Self::Device(err),
            err => Self::Core(err),
        }
    }
}
