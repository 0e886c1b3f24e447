// src/bin/seed.rs
// Loads the sample catalog into the books collection and creates its declared indexes.
use std::sync::Arc;
use std::time::Instant;

use book_catalog::domain::model::catalog;
use book_catalog::infra::telemetry;
use book_catalog::{BookFilter, BookService, Connection};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin seed -- [--reset]\n\
         \n\
         Requires env vars:\n\
           MONGODB_URI\n\
         Optional:\n\
           MONGODB_DATABASE, RUST_LOG\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let reset = args.iter().any(|a| a == "--reset");

    let connection = Connection::from_env().await?;
    let service = BookService::new(Arc::new(connection.books()));
    println!("--- Seeding {}.books ---", connection.database_name());

    let start_time = Instant::now();

    if reset {
        let removed = service.delete_all().await?;
        println!("Removed {} existing books", removed);
    }

    let books = catalog::sample_books();
    let ids = service.insert_books(&books).await?;
    tracing::info!(inserted = ids.len(), "sample catalog inserted");

    let indexes = service.ensure_indexes().await?;

    println!("\n--- Results ---");
    println!("Inserted {} books", ids.len());
    println!("Indexes: {}", indexes.join(", "));
    let total = service.count_matching(&BookFilter::all()).await?;
    println!("Collection now holds {} books", total);
    println!("Total time: {} ms", start_time.elapsed().as_millis());

    connection.close().await;
    Ok(())
}
