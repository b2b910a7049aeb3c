//! EVN CLI - Command line tool for collecting hourly hydropower reservoir
//! readings from the EVN portal.

use std::io::Write;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "evn-cli",
    version,
    about = "EVN hydropower reservoir data collector"
)]
struct Cli {
    #[command(subcommand)]
    command: evn_cmd::Command,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                chrono::Local::now().to_rfc3339(),
                record.level(),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();
    evn_cmd::run(cli.command).await
}
