//! The catalog walkthrough: a fixed sequence of operations against the
//! `books` collection, each printed as it completes.

use crate::app::book_service::BookService;
use crate::domain::model::{Book, PlanSummary};
use crate::domain::query::{BookField, BookFilter, Comparison, IndexSpec, Page, Projection, SortDirection};
use crate::error::Result;
use bson::Bson;
use std::io::Write;

fn print_books(out: &mut dyn Write, books: &[Book]) -> Result<()> {
    if books.is_empty() {
        writeln!(out, "  (no books)")?;
    }
    for book in books {
        writeln!(out, "  {}", book)?;
    }
    Ok(())
}

/// Runs the walkthrough, writing every result to `out`.
///
/// The sequence mutates the collection (one update, one delete, index
/// creation); run `seed --reset` to start over.
pub async fn run(service: &BookService, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "> All books:")?;
    let all_books = service.list_all().await?;
    print_books(out, &all_books)?;

    writeln!(out, "> Fiction books:")?;
    let fiction = service.find_by_field(BookField::Genre, "Fiction").await?;
    print_books(out, &fiction)?;

    writeln!(out, "> Published after 1951:")?;
    let recent = service
        .find_by_comparison(BookField::PublishedYear, Comparison::Gt, 1951)
        .await?;
    print_books(out, &recent)?;

    writeln!(out, "> Books by Paulo Coelho:")?;
    let by_coelho = service.find_by_field(BookField::Author, "Paulo Coelho").await?;
    print_books(out, &by_coelho)?;

    writeln!(out, "> Set price of \"The Alchemist\" to 15:")?;
    let alchemist = BookFilter::all().eq(BookField::Title, "The Alchemist")?;
    let updated = service
        .update_one_by_filter(&alchemist, BookField::Price, 15)
        .await?;
    writeln!(out, "  matched {}, modified {}", updated.matched, updated.modified)?;

    writeln!(out, "> Delete \"Animal Farm\":")?;
    let animal_farm = BookFilter::all().eq(BookField::Title, "Animal Farm")?;
    let deleted = service.delete_one_by_filter(&animal_farm).await?;
    writeln!(out, "  deleted {}", deleted)?;

    writeln!(out, "> In stock and published after 2010:")?;
    let in_stock_recent = BookFilter::all()
        .eq(BookField::InStock, true)?
        .gt(BookField::PublishedYear, 2010)?;
    let available = service.find_matching(in_stock_recent).await?;
    print_books(out, &available)?;

    writeln!(out, "> Title, author and price only:")?;
    let projection = Projection::parse("title author price")?;
    let projected = service.find_projected(BookFilter::all(), projection).await?;
    print_books(out, &projected)?;

    writeln!(out, "> By price, ascending:")?;
    let cheapest_first = service
        .find_sorted(BookField::Price, SortDirection::Ascending)
        .await?;
    print_books(out, &cheapest_first)?;

    writeln!(out, "> By price, descending:")?;
    let dearest_first = service
        .find_sorted(BookField::Price, SortDirection::Descending)
        .await?;
    print_books(out, &dearest_first)?;

    let second_page = Page::new(2, 5)?;
    writeln!(
        out,
        "> Page {} ({} per page) by title:",
        second_page.number(),
        second_page.size()
    )?;
    let page = service.find_page(BookField::Title, second_page).await?;
    print_books(out, &page)?;

    writeln!(out, "> Average price by genre:")?;
    let averages = service.average_price_by_genre().await?;
    for row in &averages {
        let genre = row.genre.as_deref().unwrap_or("(none)");
        match row.average_price {
            Some(avg) => writeln!(out, "  {}: {:.2}", genre, avg)?,
            None => writeln!(out, "  {}: n/a", genre)?,
        }
    }

    writeln!(out, "> Author with the most books:")?;
    match service.top_author().await? {
        Some(top) => writeln!(
            out,
            "  {} ({} books)",
            top.author.as_deref().unwrap_or("(none)"),
            top.total_books
        )?,
        None => writeln!(out, "  (no books)")?,
    }

    writeln!(out, "> Books per decade:")?;
    let decades = service.count_by_decade(BookField::PublishedYear).await?;
    for row in &decades {
        let decade = match row.decade {
            Some(d) => format!("{}s", d),
            None => "(no year)".to_string(),
        };
        writeln!(out, "  {}: {}", decade, row.total_books)?;
    }

    writeln!(out, "> Create indexes:")?;
    let title_index = IndexSpec::single(BookField::Title, SortDirection::Ascending);
    let title_name = service.create_index(&title_index).await?;
    writeln!(out, "  created {}", title_name)?;
    let author_year = IndexSpec::single(BookField::Author, SortDirection::Ascending)
        .then(BookField::PublishedYear, SortDirection::Descending);
    let compound_name = service.create_index(&author_year).await?;
    writeln!(out, "  created {}", compound_name)?;
    // Creating it again must succeed without adding a second index.
    let compound_again = service.create_index(&author_year).await?;
    writeln!(out, "  created {} (again)", compound_again)?;

    writeln!(out, "> Explain: author \"James Clear\", published since 2015:")?;
    let clear_recent = BookFilter::all()
        .eq(BookField::Author, "James Clear")?
        .gte(BookField::PublishedYear, 2015)?;
    let explain = service.explain(&clear_recent).await?;
    let summary = PlanSummary::from_explain(&explain);
    let explain_json: serde_json::Value = Bson::Document(explain).into_relaxed_extjson();
    writeln!(out, "{:#}", explain_json)?;
    writeln!(
        out,
        "  stage {} index {} returned {} docs examined {} keys examined {}",
        summary.stage.as_deref().unwrap_or("?"),
        summary.index_name.as_deref().unwrap_or("-"),
        summary.returned,
        summary.docs_examined,
        summary.keys_examined
    )?;

    Ok(())
}
