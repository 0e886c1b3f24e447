//! Runs the catalog walkthrough against the configured MongoDB deployment.
//!
//! Seed the collection first with `cargo run --bin seed -- --reset`.

use std::sync::Arc;

use book_catalog::app::walkthrough;
use book_catalog::infra::telemetry;
use book_catalog::{BookService, Connection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let connection = Connection::from_env().await?;
    let service = BookService::new(Arc::new(connection.books()));

    let mut stdout = std::io::stdout().lock();
    let outcome = walkthrough::run(&service, &mut stdout).await;

    connection.close().await;
    outcome?;
    Ok(())
}
