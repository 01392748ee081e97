//! `stanza-relay` command line.
//!
//! Reads decoded stanzas as JSON lines on stdin, runs the echo bot over them and writes outbound
//! stanzas as JSON lines on stdout. Logs go to stderr.

use clap::Parser;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use stanza_relay::base::{config::Config, types::Void};
use tracing::Level;
use tracing_subscriber::{filter::LevelFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Message routing and reply threading for federated chat, over a JSON-lines session.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file to load instead of `.hidden/config.toml`.
    ///
    /// `STANZA_RELAY_*` environment variables are applied on top of either file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Log verbosity: INFO by default, `-v` for DEBUG, `-vv` for TRACE.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Export spans to an OTLP collector over HTTP.
    #[arg(long)]
    otlp: bool,
}

fn level_for(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    // Stdout is the outbound stanza stream.

    let stderr = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    let otel = if args.otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build();
        Some(tracing_opentelemetry::layer().with_tracer(provider.tracer("stanza-relay")))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(otel)
        .with(LevelFilter::from_level(level_for(args.verbose)))
        .with(stderr)
        .init();

    let config = Config::load(args.config.as_deref())?;

    stanza_relay::start(config).await
}
