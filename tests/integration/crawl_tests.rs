//! Integration tests for the fetcher and site crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise
//! redirect handling, traversal limits and failure isolation end-to-end.
//! Mock servers listen on 127.0.0.1, which the test configuration
//! allow-lists.

use marketlens::config::Config;
use marketlens::crawler::{FetchError, PageFetcher};
use marketlens::{FailureKind, MarketLensError, SafetyValidator, SiteCrawler};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Default configuration with the mock server's address allow-listed
fn test_config() -> Config {
    let mut config = Config::default();
    config.safety.allowed_hosts = vec!["127.0.0.1".to_string()];
    config
}

fn crawler(config: &Config) -> SiteCrawler {
    SiteCrawler::from_config(config).expect("Failed to build crawler")
}

fn fetcher(config: &Config) -> PageFetcher {
    let validator = Arc::new(SafetyValidator::new(&config.safety));
    PageFetcher::new(config.fetcher.clone(), validator).expect("Failed to build fetcher")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn redirect(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("location", location)
}

#[tokio::test]
async fn test_crawl_collects_site_metadata() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><head>
            <title>Acme | Widgets for teams</title>
            <meta name="description" content="Widgets, delivered.">
            <meta property="og:image" content="/img/og.png">
        </head><body>
            <h1>Acme</h1>
            <a href="/pricing">Pricing</a>
            <a href="/careers">Careers</a>
            <a href="https://www.linkedin.com/company/acme">LinkedIn</a>
            <a href="https://twitter.com/intent/tweet?text=hi">Share</a>
            <a href="https://twitter.com/acme">Twitter</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/pricing",
        "<html><head><title>Pricing</title></head><body><p>Pro is $20 per month</p></body></html>",
    )
    .await;
    mount_page(
        &server,
        "/careers",
        r#"<html><head><title>Careers</title></head><body>
            <p>We are hiring engineers</p>
            <a href="https://github.com/acme">GitHub</a>
        </body></html>"#,
    )
    .await;

    let config = test_config();
    let site = crawler(&config)
        .crawl(&server.uri(), 1, &CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(site.name, "Acme");
    assert_eq!(site.description, "Widgets, delivered.");
    assert_eq!(site.url, format!("{}/", server.uri()));
    assert_eq!(
        site.thumbnail_url.as_deref(),
        Some(format!("{}/img/og.png", server.uri()).as_str())
    );

    assert_eq!(site.sub_pages.len(), 1);
    assert!(site.sub_pages[0].text.contains("$20 per month"));

    assert_eq!(site.job_pages.len(), 1);
    assert!(site.job_pages[0].url.ends_with("/careers"));

    let twitter = site
        .social_profiles
        .iter()
        .find(|p| p.platform == "twitter")
        .expect("twitter profile");
    assert_eq!(twitter.url, "https://twitter.com/acme");
    assert!(site.social_profiles.iter().any(|p| p.platform == "linkedin"));
    // Links found on job pages count too
    assert!(site.social_profiles.iter().any(|p| p.platform == "github"));
}

#[tokio::test]
async fn test_crawl_never_leaves_seed_host() {
    let server = MockServer::start().await;
    let port = Url::parse(&server.uri()).unwrap().port().unwrap();

    // Same server, different host name: must never be requested
    Mock::given(method("GET"))
        .and(path("/external-pricing"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body>
                <a href="http://localhost:{port}/external-pricing">Partner pricing</a>
                <a href="https://other.example/pricing">Other pricing</a>
                <a href="/about">About</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(&server, "/about", "<html><body><p>About us</p></body></html>").await;

    let config = test_config();
    let site = crawler(&config)
        .crawl(&server.uri(), 3, &CancellationToken::new())
        .await
        .expect("Crawl failed");

    let host = Url::parse(&server.uri()).unwrap().host_str().unwrap().to_string();
    for url in site.page_urls() {
        assert_eq!(Url::parse(url).unwrap().host_str(), Some(host.as_str()));
    }
    assert_eq!(site.sub_pages.len(), 1);
}

#[tokio::test]
async fn test_each_url_is_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><body>
                <a href="/pricing">Pricing</a>
                <a href="/pricing#plans">Plans</a>
                <a href="{base}/pricing">Pricing again</a>
                <a href="/about">About</a>
            </body></html>"#
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pricing"))
        .respond_with(html(r#"<html><body><a href="/">Home</a><a href="/pricing">Self</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(r#"<html><body><a href="/pricing">Pricing</a><a href="/">Home</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config();
    let site = crawler(&config)
        .crawl(&base, 5, &CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(site.sub_pages.len(), 2);
    // Expectations are verified when the server is dropped
}

#[tokio::test]
async fn test_deeper_crawls_fetch_a_superset() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<html><body><a href="/about">About</a></body></html>"#).await;
    mount_page(&server, "/about", r#"<html><body><a href="/team">Team</a></body></html>"#).await;
    mount_page(&server, "/team", r#"<html><body><a href="/history">History</a></body></html>"#).await;
    mount_page(&server, "/history", "<html><body><p>Founded 1999</p></body></html>").await;

    let config = test_config();
    let crawler = crawler(&config);
    let cancel = CancellationToken::new();

    let mut previous: Vec<String> = Vec::new();
    for depth in 1..=3 {
        let site = crawler.crawl(&server.uri(), depth, &cancel).await.expect("Crawl failed");
        let urls: Vec<String> = site.page_urls().into_iter().map(String::from).collect();

        for url in &previous {
            assert!(urls.contains(url), "depth {} lost {}", depth, url);
        }
        assert_eq!(urls.len(), depth as usize + 1);
        previous = urls;
    }
}

#[tokio::test]
async fn test_redirect_to_private_address_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata"))
        .respond_with(redirect("http://169.254.169.254/latest/meta-data/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/internal"))
        .respond_with(redirect("http://10.0.0.1/"))
        .mount(&server)
        .await;

    let config = test_config();
    let fetcher = fetcher(&config);

    for route in ["/metadata", "/internal"] {
        let url = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
        let err = fetcher.fetch(&url).await.expect_err("redirect should be rejected");
        assert!(matches!(err, FetchError::Rejected { .. }), "unexpected error: {err}");
        assert_eq!(err.failure_kind(), FailureKind::PolicyRejected);
    }
}

#[tokio::test]
async fn test_redirects_are_followed_on_same_host() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/new", "<html><head><title>New home</title></head></html>").await;

    let config = test_config();
    let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
    let page = fetcher(&config).fetch(&url).await.expect("Fetch failed");

    assert_eq!(page.title, "New home");
    assert_eq!(page.url, format!("{}/new", server.uri()));
}

#[tokio::test]
async fn test_redirect_loop_hits_hop_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(redirect("/loop"))
        .mount(&server)
        .await;

    let config = test_config();
    let url = Url::parse(&format!("{}/loop", server.uri())).unwrap();
    let err = fetcher(&config).fetch(&url).await.expect_err("loop should fail");

    assert!(matches!(err, FetchError::TooManyRedirects { limit: 5, .. }));
    assert_eq!(err.failure_kind(), FailureKind::Unreachable);
}

#[tokio::test]
async fn test_redirect_without_location() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nowhere"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&server)
        .await;

    let config = test_config();
    let url = Url::parse(&format!("{}/nowhere", server.uri())).unwrap();
    let err = fetcher(&config).fetch(&url).await.expect_err("should fail");

    assert!(matches!(err, FetchError::MissingLocation { status: 302, .. }));
}

#[tokio::test]
async fn test_seed_failure_fails_the_crawl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config();
    let err = crawler(&config)
        .crawl(&server.uri(), 1, &CancellationToken::new())
        .await
        .expect_err("seed failure should be fatal");

    assert!(matches!(err, MarketLensError::Fetch(FetchError::Status { status: 500, .. })));
    assert_eq!(err.failure_kind(), FailureKind::Unreachable);
}

#[tokio::test]
async fn test_sub_page_failure_is_skipped() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/pricing">Pricing</a><a href="/about">About</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pricing"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/about", "<html><body><p>About us</p></body></html>").await;

    let config = test_config();
    let site = crawler(&config)
        .crawl(&server.uri(), 1, &CancellationToken::new())
        .await
        .expect("sub-page failure must not fail the crawl");

    assert_eq!(site.sub_pages.len(), 1);
    assert!(site.sub_pages[0].url.ends_with("/about"));
}

#[tokio::test]
async fn test_sub_page_limit_caps_each_level() {
    let server = MockServer::start().await;

    let links: String = (0..15)
        .map(|i| format!(r#"<a href="/blog/post-{i}">Post {i}</a>"#))
        .collect();
    mount_page(&server, "/", &format!("<html><body>{links}</body></html>")).await;
    Mock::given(method("GET"))
        .respond_with(html("<html><body><p>post</p></body></html>"))
        .mount(&server)
        .await;

    let config = test_config();
    let site = crawler(&config)
        .crawl(&server.uri(), 1, &CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(site.sub_pages.len(), config.crawler.sub_page_limit);
}

#[tokio::test]
async fn test_private_seed_is_rejected_before_any_request() {
    let config = Config::default();
    let err = crawler(&config)
        .crawl("http://127.0.0.1:1/", 1, &CancellationToken::new())
        .await
        .expect_err("loopback seed should be rejected");

    assert_eq!(err.failure_kind(), FailureKind::PolicyRejected);
}

#[tokio::test]
async fn test_cancelled_crawl_returns_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html("<html></html>").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = test_config();
    let crawler = crawler(&config);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let err = crawler
        .crawl(&server.uri(), 1, &cancel)
        .await
        .expect_err("crawl should be cancelled");

    assert!(matches!(err, MarketLensError::Cancelled { .. }));
    assert_eq!(err.failure_kind(), FailureKind::Cancelled);
}

#[tokio::test]
async fn test_crawl_deadline() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html("<html></html>").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.crawler.crawl_deadline_secs = 1;

    let err = crawler(&config)
        .crawl(&server.uri(), 1, &CancellationToken::new())
        .await
        .expect_err("crawl should time out");

    assert!(matches!(err, MarketLensError::DeadlineExceeded { seconds: 1, .. }));
    assert_eq!(err.failure_kind(), FailureKind::Unreachable);
}

#[tokio::test]
async fn test_redirect_back_to_visited_page_is_not_refetched() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/pricing">Pricing</a><a href="/about">About</a></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pricing"))
        .respond_with(redirect("/"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(redirect("/company"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/company"))
        .respond_with(html("<html><body><p>Our story</p></body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config();
    let site = crawler(&config)
        .crawl(&server.uri(), 1, &CancellationToken::new())
        .await
        .expect("Crawl failed");

    // /pricing contributes nothing; /about is kept under the URL it ended on
    assert_eq!(site.sub_pages.len(), 1);
    assert_eq!(site.sub_pages[0].url, format!("{}/company", server.uri()));

    let mut urls = site.page_urls();
    let total = urls.len();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), total);
}

#[tokio::test]
async fn test_redirect_off_seed_host_is_dropped() {
    let server = MockServer::start().await;
    let port = Url::parse(&server.uri()).unwrap().port().unwrap();

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/pricing">Pricing</a><a href="/careers">Careers</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pricing"))
        .respond_with(redirect(&format!("http://localhost:{port}/x")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/careers"))
        .respond_with(redirect(&format!("http://localhost:{port}/jobs")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html(r#"<html><body><a href="https://github.com/elsewhere">gh</a></body></html>"#))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(html("<html><body><p>Jobs elsewhere</p></body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.safety.allowed_hosts = vec!["127.0.0.1".to_string(), "localhost".to_string()];

    let site = crawler(&config)
        .crawl(&server.uri(), 2, &CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert!(site.sub_pages.is_empty());
    assert!(site.job_pages.is_empty());
    assert!(site.social_profiles.is_empty());
    for url in site.page_urls() {
        assert_eq!(Url::parse(url).unwrap().host_str(), Some("127.0.0.1"));
    }
}

#[tokio::test]
async fn test_seed_redirect_moves_crawl_to_final_host() {
    let server = MockServer::start().await;
    let port = Url::parse(&server.uri()).unwrap().port().unwrap();

    // Stands in for an apex domain redirecting to its www host
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(redirect(&format!("http://127.0.0.1:{port}/home")))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/home",
        r#"<html><head><title>Acme</title></head><body><a href="/pricing">Pricing</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/pricing", "<html><body><p>Pro $20</p></body></html>").await;

    let mut config = test_config();
    config.safety.allowed_hosts = vec!["127.0.0.1".to_string(), "localhost".to_string()];

    let site = crawler(&config)
        .crawl(&format!("http://localhost:{port}/start"), 1, &CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(site.main_page.url, format!("http://127.0.0.1:{port}/home"));
    assert_eq!(site.sub_pages.len(), 1);
    assert_eq!(site.sub_pages[0].url, format!("http://127.0.0.1:{port}/pricing"));
}

#[tokio::test]
async fn test_any_redirect_status_with_location_is_followed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/choices"))
        .respond_with(ResponseTemplate::new(300).insert_header("location", "/picked"))
        .mount(&server)
        .await;
    mount_page(&server, "/picked", "<html><head><title>Picked</title></head></html>").await;
    Mock::given(method("GET"))
        .and(path("/cached"))
        .respond_with(ResponseTemplate::new(304).insert_header("location", "/picked"))
        .mount(&server)
        .await;

    let config = test_config();
    let fetcher = fetcher(&config);

    let url = Url::parse(&format!("{}/choices", server.uri())).unwrap();
    let page = fetcher.fetch(&url).await.expect("Fetch failed");
    assert_eq!(page.title, "Picked");

    // 304 is not a redirect
    let url = Url::parse(&format!("{}/cached", server.uri())).unwrap();
    let err = fetcher.fetch(&url).await.expect_err("304 should fail");
    assert!(matches!(err, FetchError::Status { status: 304, .. }));
}
