//! Runs the full walkthrough against the in-memory store, and optionally
//! against a live deployment.

use std::sync::Arc;

use book_catalog::app::walkthrough;
use book_catalog::domain::model::catalog::sample_books;
use book_catalog::{BookField, BookFilter, BookService, Connection, InMemoryStore};

#[tokio::test]
async fn walkthrough_prints_every_step() -> Result<(), Box<dyn std::error::Error>> {
    let service = BookService::new(Arc::new(InMemoryStore::new("books")));
    service.insert_books(&sample_books()).await?;

    let mut out: Vec<u8> = Vec::new();
    walkthrough::run(&service, &mut out).await?;
    let printed = String::from_utf8(out)?;

    for header in [
        "> All books:",
        "> Fiction books:",
        "> Published after 1951:",
        "> Books by Paulo Coelho:",
        "> Page 2 (5 per page) by title:",
        "> Average price by genre:",
        "> Author with the most books:",
        "> Books per decade:",
        "> Create indexes:",
    ] {
        assert!(printed.contains(header), "missing {header}");
    }
    assert!(printed.contains("matched 1, modified 1"));
    assert!(printed.contains("deleted 1"));
    assert!(printed.contains("Paulo Coelho (2 books)"));
    assert!(printed.contains("created author_1_published_year_-1 (again)"));
    assert!(printed.contains("stage IXSCAN index author_1_published_year_-1"));

    // The walkthrough's writes are visible afterwards.
    let alchemist = service.find_by_field(BookField::Title, "The Alchemist").await?;
    assert_eq!(alchemist[0].price, Some(15.0));
    let gone = BookFilter::all().eq(BookField::Title, "Animal Farm")?;
    assert_eq!(service.count_matching(&gone).await?, 0);
    Ok(())
}

/// Needs a reachable deployment: `MONGODB_URI=... cargo test -- --ignored`.
#[tokio::test]
#[ignore]
async fn walkthrough_against_live_mongodb() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let database = format!("book_catalog_test_{}", std::process::id());
    let uri = std::env::var("MONGODB_URI")?;
    let connection = Connection::open(&uri, Some(&database)).await?;
    let service = BookService::new(Arc::new(connection.books()));

    service.insert_books(&sample_books()).await?;
    let mut out: Vec<u8> = Vec::new();
    walkthrough::run(&service, &mut out).await?;
    let printed = String::from_utf8(out)?;
    println!("{printed}");
    assert!(printed.contains("deleted 1"));

    let indexes = service.list_indexes().await?;
    assert!(indexes.contains(&"author_1_published_year_-1".to_string()));

    connection.database().drop().await?;
    connection.close().await;
    Ok(())
}
