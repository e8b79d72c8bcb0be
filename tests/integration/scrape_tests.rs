//! End-to-end scrape tests
//!
//! These tests use wiremock to serve listing and review pages and run the full
//! listing -> identifiers -> reviews -> SQLite cycle.

use review_harvest::config::{parse_config, Config};
use review_harvest::harvest::{Fetch, HttpFetcher, ListingRunner, Sentiment};
use review_harvest::storage::{ReviewSink, RunStatus, SqliteStorage};
use review_harvest::HarvestError;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) ReviewHarvestTest/1.0";

/// Creates a test configuration pointing every URL at the mock server
fn create_test_config(base_url: &str, db_path: &str) -> Config {
    let toml = format!(
        r#"
[scraper]
max-workers = 3
request-timeout-secs = 5
favorable-review-url = "{base}/title/{{id}}/reviews?ratingFilter=10"
unfavorable-review-url = "{base}/title/{{id}}/reviews?ratingFilter=1"

[headers]
User-Agent = "{ua}"

[output]
database-path = "{db}"

[[listing]]
rated = "top"
category = "movie"
url = "{base}/chart/top"
"#,
        base = base_url,
        ua = USER_AGENT,
        db = db_path,
    );

    parse_config(&toml).expect("test config should be valid")
}

fn top_chart() -> String {
    r#"<html><body><table><tbody>
        <tr><td class="titleColumn">1. <a href="/title/tt0111161/">The Shawshank Redemption</a> <span>(1994)</span></td></tr>
        <tr><td class="titleColumn">2. <a href="/title/tt0068646/">The Godfather</a> <span>(1972)</span></td></tr>
    </tbody></table></body></html>"#
        .to_string()
}

fn review_page(reviews: &[(&str, Option<&str>)]) -> String {
    let body: String = reviews
        .iter()
        .map(|(text, rating)| {
            let rating = rating
                .map(|r| {
                    format!(
                        r#"<span class="rating-other-user-rating"><span>{}</span><span class="point-scale">/10</span></span>"#,
                        r
                    )
                })
                .unwrap_or_default();
            format!(
                r#"<div class="lister-item"><div class="review-container">{}<div class="content"><div class="text show-more__control">{}</div></div></div></div>"#,
                rating, text
            )
        })
        .collect();
    format!("<html><body><div class=\"lister-list\">{}</div></body></html>", body)
}

async fn mount_reviews(server: &MockServer, id: &str, filter: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/title/{}/reviews", id)))
        .and(query_param("ratingFilter", filter))
        .and(header("User-Agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

fn fetcher_for(config: &Config) -> Arc<dyn Fetch> {
    Arc::new(HttpFetcher::from_config(config).expect("Failed to build fetcher"))
}

#[tokio::test]
async fn test_full_scrape_single_listing() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/chart/top"))
        .and(header("User-Agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(top_chart()))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_reviews(
        &mock_server,
        "tt0111161",
        "10",
        review_page(&[("Hope is a good thing.", Some("10")), ("Timeless.", Some("9"))]),
    )
    .await;
    mount_reviews(
        &mock_server,
        "tt0111161",
        "1",
        review_page(&[("Slow and overrated.", Some("3"))]),
    )
    .await;
    mount_reviews(
        &mock_server,
        "tt0068646",
        "10",
        review_page(&[("An offer I could not refuse.", Some("10"))]),
    )
    .await;
    mount_reviews(&mock_server, "tt0068646", "1", review_page(&[])).await;

    let db_file = tempfile::NamedTempFile::new().unwrap();
    let db_path = db_file.path().to_string_lossy().to_string();
    let config = create_test_config(&base_url, &db_path);

    let storage = SqliteStorage::new(db_file.path()).expect("Failed to open storage");
    let mut runner = ListingRunner::new(config.clone(), fetcher_for(&config), storage);
    let summary = runner.run_all("test-hash").await.expect("Run failed");

    assert!(summary.failed.is_empty());
    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.completed[0].listing, "top_movie");
    assert_eq!(summary.completed[0].identifiers, 2);
    assert_eq!(summary.completed[0].reviews, 4);
    assert_eq!(summary.completed[0].failed_titles, 0);

    let storage = runner.into_sink();
    let run = storage.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");

    let identifiers = storage.load_identifiers(summary.run_id).unwrap();
    let ids: Vec<&str> = identifiers.iter().map(|t| t.external_id.as_str()).collect();
    assert_eq!(ids, vec!["tt0111161", "tt0068646"]);

    // Title order first, then favorable before unfavorable within a title
    let reviews = storage.load_reviews(summary.run_id).unwrap();
    assert_eq!(reviews.len(), 4);
    assert_eq!(reviews[0].title, "The Shawshank Redemption");
    assert_eq!(reviews[0].review_text, "Hope is a good thing.");
    assert_eq!(reviews[0].rating.as_deref(), Some("10"));
    assert_eq!(reviews[2].sentiment, Sentiment::Unfavorable);
    assert_eq!(reviews[2].rating.as_deref(), Some("3"));
    assert_eq!(reviews[3].title, "The Godfather");
}

#[tokio::test]
async fn test_missing_ratings_are_stored_as_null() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/chart/top"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<table><tr><td class="titleColumn"><a href="/title/tt0000001/">Obscure</a></td></tr></table>"#,
        ))
        .mount(&mock_server)
        .await;

    // Three reviews; the middle one displays no rating
    mount_reviews(
        &mock_server,
        "tt0000001",
        "10",
        review_page(&[("One", Some("8")), ("Two", None), ("Three", Some("6"))]),
    )
    .await;
    mount_reviews(&mock_server, "tt0000001", "1", review_page(&[])).await;

    let config = create_test_config(&base_url, ":memory:");
    let storage = SqliteStorage::new_in_memory().unwrap();
    let mut runner = ListingRunner::new(config.clone(), fetcher_for(&config), storage);
    let summary = runner.run_all("h").await.unwrap();

    assert_eq!(summary.completed[0].reviews, 3);

    let storage = runner.into_sink();
    let reviews = storage.load_reviews(summary.run_id).unwrap();
    let ratings: Vec<Option<&str>> = reviews.iter().map(|r| r.rating.as_deref()).collect();
    assert_eq!(ratings, vec![Some("8"), None, Some("6")]);
    assert_eq!(reviews[1].review_text, "Two");
    assert_eq!(storage.count_unrated_reviews().unwrap(), 1);
}

#[tokio::test]
async fn test_failing_title_is_isolated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/chart/top"))
        .respond_with(ResponseTemplate::new(200).set_body_string(top_chart()))
        .mount(&mock_server)
        .await;

    // Shawshank's favorable page errors out; the Godfather works
    Mock::given(method("GET"))
        .and(path("/title/tt0111161/reviews"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_reviews(
        &mock_server,
        "tt0068646",
        "10",
        review_page(&[("Classic.", Some("10"))]),
    )
    .await;
    mount_reviews(
        &mock_server,
        "tt0068646",
        "1",
        review_page(&[("Too long.", Some("4"))]),
    )
    .await;

    let config = create_test_config(&base_url, ":memory:");
    let storage = SqliteStorage::new_in_memory().unwrap();
    let mut runner = ListingRunner::new(config.clone(), fetcher_for(&config), storage);
    let summary = runner.run_all("h").await.unwrap();

    let listing = &summary.completed[0];
    assert_eq!(listing.identifiers, 2);
    assert_eq!(listing.failed_titles, 1);
    assert_eq!(listing.reviews, 2);

    let storage = runner.into_sink();
    let reviews = storage.load_reviews(summary.run_id).unwrap();
    assert!(reviews.iter().all(|r| r.title == "The Godfather"));
    // Both titles are still recorded as identifiers
    assert_eq!(storage.load_identifiers(summary.run_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreachable_listing_marks_run_failed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/chart/top"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, ":memory:");
    let storage = SqliteStorage::new_in_memory().unwrap();
    let mut runner = ListingRunner::new(config.clone(), fetcher_for(&config), storage);
    let summary = runner.run_all("h").await.unwrap();

    assert!(summary.completed.is_empty());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "top_movie");

    let run = runner.sink().get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_http_fetcher_reports_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), ":memory:");
    let fetcher = fetcher_for(&config);
    let result = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::HttpStatus { status: 404, .. })
    ));
}
