use anyhow::Result;
use clap::{Parser, Subcommand};
use display_core::{DisplayClient, DisplayEvent, WsTransport};
use shared::domain::Phase;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "ws://127.0.0.1:8765/ws")]
    controller_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mirror the controller and print every state it pushes.
    Watch,
    /// Send one remote-control key press, e.g. `Space` or `ArrowRight`.
    Key { code: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let transport = WsTransport::connect(&args.controller_url).await?;
    let mut client = DisplayClient::new(transport);

    match args.command {
        Command::Key { code } => {
            client.send_key(&code).await?;
            println!("sent {code}");
        }
        Command::Watch => {
            client.attach().await?;
            while let Some(event) = client.next_event().await {
                match event {
                    DisplayEvent::StateChanged => {
                        let view = client.view();
                        let here = view.current_station().map_or("?", |s| s.name.as_str());
                        let line = view.line().map_or("?", |l| l.meta.line_name.as_str());
                        match view.runtime().state {
                            Phase::Arrived => println!("[{line}] arrived at {here}"),
                            Phase::Departed => {
                                let next = view.upcoming_station().map_or("-", |s| s.name.as_str());
                                println!("[{line}] departed {here}, next {next}");
                            }
                        }
                    }
                    DisplayEvent::Window(cmd) => info!(?cmd, "window command from controller"),
                }
            }
            info!("controller connection closed");
        }
    }

    Ok(())
}
