mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{parse_duration, Command, Context};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "amiga", version, about = "farm-ng Amiga robot client")]
struct Cli {
    /// Robot host name or IP address.
    #[arg(
        long,
        value_name = "HOST",
        env = "AMIGA_ADDRESS",
        default_value = "127.0.0.1",
        global = true
    )]
    address: String,

    /// Per-request timeout (e.g. 500ms, 2s).
    #[arg(long, value_name = "DURATION", default_value = "200ms", global = true)]
    timeout: String,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let result = match parse_duration(&cli.timeout) {
        Ok(timeout) => {
            let ctx = Context {
                address: cli.address,
                timeout,
                format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
            };
            cmd::run(cli.command, &ctx).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
