use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use client::{ClientError, ConcertClient};
use log::{info, warn};
use shared::{Concert, ConcertId};
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = shared::DEFAULT_SERVER_ADDR)]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a concert and print its assigned id
    Create {
        #[arg(long)]
        title: String,
        /// RFC 3339 timestamp, e.g. 2017-08-04T20:00:00Z
        #[arg(long)]
        date: DateTime<Utc>,
    },
    /// Print one concert
    Retrieve {
        #[arg(long)]
        id: ConcertId,
    },
    /// Replace the title and date of an existing concert
    Update {
        #[arg(long)]
        id: ConcertId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        date: DateTime<Utc>,
    },
    /// Delete one concert
    Delete {
        #[arg(long)]
        id: ConcertId,
    },
    /// Print every concert
    List,
    /// Delete every concert
    Clear,
}

fn print_concert(concert: &Concert) {
    let id = concert
        .id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("{}\t{}\t{}", id, concert.date().to_rfc3339(), concert.title());
}

async fn execute<S>(client: &mut ConcertClient<S>, command: Command) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match command {
        Command::Create { title, date } => {
            let concert = client.create(&title, date).await?;
            print_concert(&concert);
        }
        Command::Retrieve { id } => {
            let concert = client.retrieve(id).await?;
            print_concert(&concert);
        }
        Command::Update { id, title, date } => {
            client.update(&Concert::with_id(id, title, date)).await?;
            println!("Updated concert {}", id);
        }
        Command::Delete { id } => {
            client.delete(id).await?;
            println!("Deleted concert {}", id);
        }
        Command::List => {
            let concerts = client.list().await?;
            if concerts.is_empty() {
                println!("No concerts");
            }
            for concert in &concerts {
                print_concert(concert);
            }
        }
        Command::Clear => {
            client.clear().await?;
            println!("Cleared all concerts");
        }
    }
    Ok(())
}

/// Runs one command and says Goodbye whether or not it succeeded.
async fn run_session<S>(mut client: ConcertClient<S>, command: Command) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let outcome = execute(&mut client, command).await;
    let farewell = client.goodbye().await;

    if let (Err(_), Err(e)) = (&outcome, &farewell) {
        warn!("Goodbye failed: {}", e);
    }
    outcome?;
    farewell
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    let client = ConcertClient::connect(&args.server).await?;
    run_session(client, args.command).await?;

    Ok(())
}
