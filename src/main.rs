use clap::Parser;
use dotenv::dotenv;
use amica::run_with_config_path;

/// Amica - a small relationship-advice chat in the terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from `.env` file into std::env (optional)
    dotenv().ok();

    let args = Args::parse();

    // Load config, init logging and run
    run_with_config_path(&args.config).await
}
