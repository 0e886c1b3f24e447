//! Sample catalog used by the `seed` binary and the tests.

use super::Book;

/// Twelve well-known titles spanning several genres and decades.
pub fn sample_books() -> Vec<Book> {
    vec![
        Book::new("To Kill a Mockingbird", "Harper Lee")
            .genre("Fiction")
            .published(1960)
            .price(12.99)
            .in_stock(true)
            .pages(336)
            .publisher("J. B. Lippincott & Co."),
        Book::new("1984", "George Orwell")
            .genre("Dystopian")
            .published(1949)
            .price(10.99)
            .in_stock(true)
            .pages(328)
            .publisher("Secker & Warburg"),
        Book::new("Animal Farm", "George Orwell")
            .genre("Political Satire")
            .published(1945)
            .price(8.50)
            .in_stock(false)
            .pages(112)
            .publisher("Secker & Warburg"),
        Book::new("The Great Gatsby", "F. Scott Fitzgerald")
            .genre("Fiction")
            .published(1925)
            .price(9.99)
            .in_stock(true)
            .pages(180)
            .publisher("Charles Scribner's Sons"),
        Book::new("The Catcher in the Rye", "J.D. Salinger")
            .genre("Fiction")
            .published(1951)
            .price(8.99)
            .in_stock(true)
            .pages(224)
            .publisher("Little, Brown and Company"),
        Book::new("Pride and Prejudice", "Jane Austen")
            .genre("Romance")
            .published(1813)
            .price(7.99)
            .in_stock(true)
            .pages(432)
            .publisher("T. Egerton"),
        Book::new("The Hobbit", "J.R.R. Tolkien")
            .genre("Fantasy")
            .published(1937)
            .price(14.99)
            .in_stock(true)
            .pages(310)
            .publisher("George Allen & Unwin"),
        Book::new("The Alchemist", "Paulo Coelho")
            .genre("Fiction")
            .published(1988)
            .price(10.99)
            .in_stock(true)
            .pages(197)
            .publisher("HarperOne"),
        Book::new("Brida", "Paulo Coelho")
            .genre("Fiction")
            .published(1990)
            .price(11.50)
            .in_stock(false)
            .pages(272)
            .publisher("HarperOne"),
        Book::new("Atomic Habits", "James Clear")
            .genre("Self-Help")
            .published(2018)
            .price(16.99)
            .in_stock(true)
            .pages(320)
            .publisher("Avery"),
        Book::new("The Midnight Library", "Matt Haig")
            .genre("Fiction")
            .published(2020)
            .price(13.49)
            .in_stock(true)
            .pages(304)
            .publisher("Canongate Books"),
        Book::new("Project Hail Mary", "Andy Weir")
            .genre("Science Fiction")
            .published(2021)
            .price(18.99)
            .in_stock(false)
            .pages(496)
            .publisher("Ballantine Books"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BookModel, DocumentModel};

    #[test]
    fn every_sample_book_passes_validation() {
        for book in sample_books() {
            let doc = bson::to_document(&book).unwrap();
            assert!(BookModel.validate_create_payload(&doc).is_ok(), "{}", book);
        }
    }
}
