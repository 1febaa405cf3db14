use std::env;
use tracing::{error, info};

use saber_feed::{CancelSignal, FeedId, FeedQuery, FeedReader, ScraperConfig};

#[tokio::main]
async fn main() {
    // Use RUST_LOG env var if set, otherwise default to info level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let Some(feed) = FeedId::from_name(&args[1]) else {
        error!("Unknown feed: {}", args[1]);
        print_usage(&args[0]);
        std::process::exit(1);
    };

    let mut query = FeedQuery::new(feed);
    let mut i = 2;
    while i < args.len() {
        let Some(value) = args.get(i + 1) else {
            error!("{} requires a value", args[i]);
            print_usage(&args[0]);
            std::process::exit(1);
        };
        match args[i].as_str() {
            "--author" => query.authors.push(value.clone()),
            "--search" => query.search = Some(value.clone()),
            "--max-pages" => match value.parse() {
                Ok(n) => query.max_pages = n,
                Err(e) => {
                    error!("Invalid --max-pages value {:?}: {}", value, e);
                    std::process::exit(1);
                }
            },
            _ => {
                error!("Unknown argument: {}", args[i]);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        }
        i += 2;
    }

    let config = ScraperConfig::load();
    let reader = match FeedReader::new(&config) {
        Ok(reader) => reader,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let cancel = CancelSignal::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, finishing in-flight pages");
                cancel.cancel();
            }
        });
    }

    match reader.get_songs_from_feed(&query, &cancel).await {
        Ok(songs) => info!("Found {} songs on the {} feed", songs.len(), feed.name()),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage(program_name: &str) {
    eprintln!("Usage:");
    eprintln!(
        "  {} <author|latest|hot|plays|downloads|search> [--max-pages N]",
        program_name
    );
    eprintln!("      [--author NAME]... [--search TEXT]");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} latest --max-pages 2", program_name);
    eprintln!("  {} author --author Alice --author Bob", program_name);
    eprintln!("  {} search --search camellia", program_name);
}
