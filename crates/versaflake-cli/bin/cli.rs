use clap::{Parser, ValueEnum};
use jiff::Timestamp;
use std::fmt::{Display, Formatter};
use versaflake::{
    ConfigurationSettings, DEFAULT_EPOCH_MILLIS, DEFAULT_NODE_ID_BITS, DEFAULT_SEQUENCE_BITS,
    DEFAULT_TIMESTAMP_BITS,
};

pub const NODE_ID_ENV: &str = "VERSAFLAKE_NODE_ID";
pub const EPOCH_ENV: &str = "VERSAFLAKE_EPOCH";
pub const TIMESTAMP_BITS_ENV: &str = "VERSAFLAKE_TIMESTAMP_BITS";
pub const NODE_ID_BITS_ENV: &str = "VERSAFLAKE_NODE_ID_BITS";
pub const SEQUENCE_BITS_ENV: &str = "VERSAFLAKE_SEQUENCE_BITS";
pub const STRICT_ENV: &str = "VERSAFLAKE_STRICT";
pub const LOG_FORMAT_ENV: &str = "VERSAFLAKE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormatArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormatArg::Text => write!(f, "text"),
            LogFormatArg::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "versaflake", about = "Allocate time-ordered 64-bit ids")]
pub struct CLI {
    #[arg(long, env = NODE_ID_ENV, default_value_t = 0, allow_negative_numbers = true)]
    pub node_id: i64,

    /// Milliseconds since the Unix epoch, or an RFC 3339 instant.
    #[arg(
        long,
        env = EPOCH_ENV,
        value_parser = parse_epoch,
        default_value_t = DEFAULT_EPOCH_MILLIS,
        allow_negative_numbers = true
    )]
    pub epoch: i64,

    #[arg(long, env = TIMESTAMP_BITS_ENV, default_value_t = DEFAULT_TIMESTAMP_BITS)]
    pub timestamp_bits: u32,

    #[arg(long, env = NODE_ID_BITS_ENV, default_value_t = DEFAULT_NODE_ID_BITS)]
    pub node_id_bits: u32,

    #[arg(long, env = SEQUENCE_BITS_ENV, default_value_t = DEFAULT_SEQUENCE_BITS)]
    pub sequence_bits: u32,

    /// Fail on clock regression instead of waiting for the clock to catch up.
    #[arg(long, env = STRICT_ENV)]
    pub strict: bool,

    /// Number of ids to allocate.
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,

    /// Print the decoded fields next to each id.
    #[arg(long)]
    pub decode: bool,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormatArg::Text
    )]
    pub log_format: LogFormatArg,
}

impl CLI {
    pub fn settings(&self) -> ConfigurationSettings {
        ConfigurationSettings::builder()
            .epoch_millis(self.epoch)
            .timestamp_bits(self.timestamp_bits)
            .node_id_bits(self.node_id_bits)
            .sequence_bits(self.sequence_bits)
            .strict_mode(self.strict)
            .build()
    }
}

fn parse_epoch(value: &str) -> Result<i64, String> {
    if let Ok(millis) = value.parse::<i64>() {
        return Ok(millis);
    }
    value
        .parse::<Timestamp>()
        .map(|ts| ts.as_millisecond())
        .map_err(|err| format!("expected milliseconds or an RFC 3339 instant: {err}"))
}
