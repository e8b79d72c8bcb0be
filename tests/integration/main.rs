//! Integration tests for the review scraper

mod scrape_tests;
