pub mod book_service;
pub mod walkthrough;
