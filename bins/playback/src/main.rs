mod cmd;

use clap::Parser;
use cmd::config::{Effective, PlayArgs};

#[derive(Parser)]
#[command(name = "playback", about = "Replay a timestamped dataset into a message sink")]
struct Cli {
    #[command(flatten)]
    args: PlayArgs,
}

#[tokio::main]
async fn main() {
    // Payloads go to stdout; keep the log on stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let eff = match Effective::new(&cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = cmd::play::run(&eff).await {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
