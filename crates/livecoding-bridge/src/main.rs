//! livecoding-bridge - HTTP trigger for live coding compiles
//!
//! Binary name: `livecoding-bridge`

use std::process;

use livecoding_bridge::{
    cli::{build_cli, init_tracing, CliArgs},
    server,
};
use livecoding_core::DiagnosticsSink;

#[tokio::main]
async fn main() {
    let sink = DiagnosticsSink::new();

    if let Err(e) = init_tracing(&sink) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {e}");
        }
    }

    let args = CliArgs::from_matches(&build_cli().get_matches());

    if let Err(err) = server::run(args, sink).await {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {err:#}");
        }
        #[allow(clippy::exit)]
        process::exit(1);
    }
}
