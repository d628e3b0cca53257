mod cli;

use crate::cli::{LogFormatArg, CLI};
use anyhow::Context;
use clap::Parser;
use jiff::Timestamp;
use std::io::{self, BufWriter, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;
use versaflake::{Clock, Configuration, Versaflake};

fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    init_tracing(config.log_format);

    let configuration =
        Configuration::try_from(config.settings()).context("invalid id configuration")?;
    let generator =
        Versaflake::new(config.node_id, configuration).context("invalid node id")?;

    info!(
        node_id = config.node_id,
        count = config.count,
        strict = config.strict,
        "allocating ids"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for _ in 0..config.count {
        let id = generator.next_id().context("failed to allocate id")?;
        let line = if config.decode {
            describe(&generator, id)
        } else {
            id.to_string()
        };
        writeln!(out, "{line}")?;
    }
    out.flush()?;

    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

/// Renders `id` with its fields. The timestamp assumes the field never wrapped.
fn describe<C: Clock>(generator: &Versaflake<C>, id: u64) -> String {
    let parts = generator.decompose(id);
    let millis = parts.timestamp_millis(generator.configuration().epoch_millis());
    let timestamp = Timestamp::from_millisecond(millis)
        .map(|ts| ts.to_string())
        .unwrap_or_else(|_| millis.to_string());

    format!(
        "{id} timestamp={timestamp} node_id={} sequence={}",
        parts.node_id, parts.sequence
    )
}
