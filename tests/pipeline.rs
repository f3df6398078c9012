//! End-to-end pipeline tests against a local XML server.
//!
//! Each test spins up a tiny_http server serving canned catalog documents
//! and drives the real client/paginator/details pipeline at it, with the
//! in-process cache backend standing in for Redis.

use goodreads_proxy::{
    BookDetailsPipeline, BookNormalizer, CacheBackend, CacheStore, CatalogClient, CurationRules,
    MemoryBackend, RateLimiter, ShelfPaginator,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Hits = Arc<Mutex<Vec<String>>>;

/// Spawn a server; the responder maps a request URL (path + query) to an
/// XML body, or `None` for a 404.
fn spawn_server<F>(responder: F) -> (String, Hits)
where
    F: Fn(&str) -> Option<String> + Send + 'static,
{
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let base_url = format!("http://127.0.0.1:{}", port);

    let hits: Hits = Arc::new(Mutex::new(Vec::new()));
    let recorded = hits.clone();

    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let url = request.url().to_string();
            recorded.lock().unwrap().push(url.clone());
            let response = match responder(&url) {
                Some(body) => tiny_http::Response::from_string(body),
                None => tiny_http::Response::from_string("not found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    (base_url, hits)
}

struct TestStack {
    client: CatalogClient,
    normalizer: BookNormalizer,
    backend: Arc<MemoryBackend>,
}

fn build_stack(base_url: &str, cache_enabled: bool) -> TestStack {
    let backend = Arc::new(MemoryBackend::new());
    let cache = CacheStore::new(
        backend.clone() as Arc<dyn CacheBackend>,
        "test",
        cache_enabled,
    );
    // Keep tests fast: a window large enough to never throttle
    let limiter = Arc::new(RateLimiter::new(1000, Duration::from_secs(1)));
    let client = CatalogClient::new(base_url, "test-key", limiter, cache).unwrap();
    let normalizer = BookNormalizer::new(base_url, CurationRules::default());

    TestStack {
        client,
        normalizer,
        backend,
    }
}

fn shelf_xml(end: u32, total: u32, entries: &[(&str, &str, Option<&str>)]) -> String {
    let reviews: String = entries
        .iter()
        .map(|(id, title, started)| {
            format!(
                r#"<review>
                     <book>
                       <id type="integer">{id}</id>
                       <title>{title}</title>
                       <description>About {title}.</description>
                       <num_pages>300</num_pages>
                       <publication_year>2001</publication_year>
                       <average_rating>4.0</average_rating>
                       <ratings_count>10</ratings_count>
                       <text_reviews_count>2</text_reviews_count>
                       <authors>
                         <author>
                           <id>9</id>
                           <name>An Author</name>
                           <average_rating>3.5</average_rating>
                           <ratings_count>100</ratings_count>
                           <text_reviews_count>20</text_reviews_count>
                         </author>
                       </authors>
                     </book>
                     <started_at>{started}</started_at>
                     <read_at></read_at>
                   </review>"#,
                id = id,
                title = title,
                started = started.unwrap_or("")
            )
        })
        .collect();

    format!(
        r#"<GoodreadsResponse>
             <reviews start="1" end="{end}" total="{total}">{reviews}</reviews>
           </GoodreadsResponse>"#
    )
}

fn details_xml(id: &str, best_id: &str, title: &str) -> String {
    format!(
        r#"<GoodreadsResponse>
             <book>
               <id>{id}</id>
               <title>{title}</title>
               <description>Details of {title}.</description>
               <num_pages>412</num_pages>
               <average_rating>4.25</average_rating>
               <ratings_count>900</ratings_count>
               <text_reviews_count>50</text_reviews_count>
               <authors>
                 <author>
                   <id>7</id>
                   <name>An Author</name>
                   <average_rating>4.1</average_rating>
                   <ratings_count>1000</ratings_count>
                   <text_reviews_count>80</text_reviews_count>
                 </author>
               </authors>
               <work>
                 <best_book_id type="integer">{best_id}</best_book_id>
                 <original_publication_year type="integer">1965</original_publication_year>
                 <rating_dist>5:500|4:250|3:100|2:30|1:20|total:900</rating_dist>
               </work>
               <popular_shelves>
                 <shelf name="to-read" count="800"/>
                 <shelf name="science-fiction" count="120"/>
                 <shelf name="classics" count="40"/>
               </popular_shelves>
             </book>
           </GoodreadsResponse>"#
    )
}

/// Book id out of a `/book/show/<id>.xml?...` request URL
fn details_request_id(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("/book/show/")?;
    rest.split(".xml").next()
}

#[tokio::test]
async fn shelf_pages_merge_in_page_order() {
    let (base_url, hits) = spawn_server(|url| {
        if !url.starts_with("/review/list/reader42.xml") {
            return None;
        }
        if url.contains("page=2") {
            Some(shelf_xml(3, 3, &[("300", "Third", None)]))
        } else {
            Some(shelf_xml(
                2,
                3,
                &[
                    ("100", "First", Some("Mon Jan 02 10:00:00 -0800 2023")),
                    ("200", "Second", Some("not a date")),
                ],
            ))
        }
    });

    let stack = build_stack(&base_url, true);
    let paginator = ShelfPaginator::new(stack.client, stack.normalizer, Duration::from_secs(300));

    let result = paginator.fetch_shelf("reader42", "to-read").await.unwrap();

    // Page order, then within-page order
    assert_eq!(result.list, vec!["100", "200", "300"]);
    assert_eq!(result.books.len(), 3);
    assert_eq!(result.books["300"].title, "Third");
    assert_eq!(result.books["100"].average_rating, 80.0);

    // Only the entry whose start date parsed carries a status
    assert_eq!(result.read_status.len(), 1);
    assert!(result.read_status.contains_key("100"));

    // Two pages, two requests; page 1 omits the page parameter
    let urls = hits.lock().unwrap().clone();
    assert_eq!(urls.len(), 2);
    assert!(!urls[0].contains("page="));
    assert!(urls[1].contains("page=2"));
    assert!(urls[0].contains("per_page=200"));
    assert!(urls[0].contains("shelf=to-read"));
}

#[tokio::test]
async fn cache_hit_suppresses_network_call() {
    let (base_url, hits) = spawn_server(|_| Some(shelf_xml(1, 1, &[("100", "Only", None)])));

    let stack = build_stack(&base_url, true);
    let paginator = ShelfPaginator::new(stack.client, stack.normalizer, Duration::from_secs(300));

    let first = paginator.fetch_shelf("reader", "read").await.unwrap();
    let second = paginator.fetch_shelf("reader", "read").await.unwrap();

    assert_eq!(first.list, second.list);
    // The second fetch never reached the server
    assert_eq!(hits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn disabled_cache_refetches_but_still_populates() {
    let (base_url, hits) = spawn_server(|_| Some(shelf_xml(1, 1, &[("100", "Only", None)])));

    let stack = build_stack(&base_url, false);
    let paginator = ShelfPaginator::new(stack.client, stack.normalizer, Duration::from_secs(300));

    paginator.fetch_shelf("reader", "read").await.unwrap();
    paginator.fetch_shelf("reader", "read").await.unwrap();

    // Every read misses, so both fetches hit the network
    assert_eq!(hits.lock().unwrap().len(), 2);
    // ... yet the store keeps being populated
    assert_eq!(stack.backend.len().await, 1);
}

#[tokio::test]
async fn shelf_fetch_aborts_on_any_page_failure() {
    let (base_url, _hits) = spawn_server(|url| {
        if url.contains("page=2") {
            Some("<GoodreadsResponse><reviews".to_string()) // malformed
        } else {
            Some(shelf_xml(2, 4, &[("100", "A", None), ("200", "B", None)]))
        }
    });

    let stack = build_stack(&base_url, true);
    let paginator = ShelfPaginator::new(stack.client, stack.normalizer, Duration::from_secs(300));

    // No partial shelf: the whole fetch errors
    assert!(paginator.fetch_shelf("reader", "read").await.is_err());
}

#[tokio::test]
async fn canonical_edition_is_authoritative_but_keyed_under_request() {
    let (base_url, hits) = spawn_server(|url| {
        match details_request_id(url)? {
            "1" => Some(details_xml("1", "2", "Some Edition")),
            "2" => Some(details_xml("2", "2", "Canonical Edition")),
            _ => None,
        }
    });

    let stack = build_stack(&base_url, true);
    let pipeline = BookDetailsPipeline::new(
        stack.client,
        stack.normalizer,
        Duration::from_secs(604_800),
    );

    let book = pipeline.fetch_book_details("1").await.unwrap();

    // Data from edition 2, keyed and addressed as the requested id 1
    assert_eq!(book.title, "Canonical Edition");
    assert_eq!(book.id, "1");
    assert!(book.url.ends_with("/book/show/1"));
    assert_eq!(book.published, Some(1965));

    let tags = book.tags.unwrap();
    assert!(tags.contains(&"science-fiction".to_string()));
    assert!(!tags.contains(&"to-read".to_string()));

    let dist = book.rating_distribution.unwrap();
    assert_eq!(dist.get(&5), Some(&500));

    assert_eq!(hits.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn self_canonical_edition_fetches_once() {
    let (base_url, hits) =
        spawn_server(|url| Some(details_xml(details_request_id(url)?, "7", "Self")));

    let stack = build_stack(&base_url, true);
    let pipeline = BookDetailsPipeline::new(
        stack.client,
        stack.normalizer,
        Duration::from_secs(604_800),
    );

    let book = pipeline.fetch_book_details("7").await.unwrap();
    assert_eq!(book.id, "7");
    assert_eq!(hits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn batch_caps_at_fifty_and_isolates_failures() {
    let (base_url, hits) = spawn_server(|url| {
        let id = details_request_id(url)?;
        if id == "7" {
            // One entry comes back malformed
            Some("<GoodreadsResponse><book>".to_string())
        } else {
            Some(details_xml(id, id, &format!("Book {}", id)))
        }
    });

    let stack = build_stack(&base_url, true);
    let pipeline = BookDetailsPipeline::new(
        stack.client,
        stack.normalizer,
        Duration::from_secs(604_800),
    );

    let ids: Vec<String> = (1..=60).map(|i| i.to_string()).collect();
    let books = pipeline.fetch_many(&ids).await;

    // 60 requested, 50 attempted, 1 failed: 49 results and a clean return
    assert_eq!(books.len(), 49);
    assert!(!books.contains_key("7"));
    assert!(books.contains_key("50"));
    assert!(!books.contains_key("51"));
    assert_eq!(books["12"].title, "Book 12");

    let urls = hits.lock().unwrap().clone();
    assert_eq!(urls.len(), 50);
    assert!(!urls.iter().any(|u| u.starts_with("/book/show/51.xml")));
}

#[tokio::test]
async fn concurrent_identical_requests_coalesce_to_one_fetch() {
    let (base_url, hits) = spawn_server(|url| {
        // Slow origin so the second caller arrives mid-fetch
        std::thread::sleep(Duration::from_millis(100));
        Some(details_xml(details_request_id(url)?, "1", "Slow Book"))
    });

    let stack = build_stack(&base_url, true);
    let pipeline = BookDetailsPipeline::new(
        stack.client,
        stack.normalizer,
        Duration::from_secs(60),
    );

    let a = pipeline.clone();
    let b = pipeline.clone();
    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.fetch_book_details("1").await }),
        tokio::spawn(async move { b.fetch_book_details("1").await }),
    );

    assert_eq!(first.unwrap().unwrap().title, "Slow Book");
    assert_eq!(second.unwrap().unwrap().title, "Slow Book");
    // Both callers were served by a single outbound request
    assert_eq!(hits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn network_errors_surface_as_errors_not_panics() {
    let (base_url, _hits) = spawn_server(|_| None); // everything 404s

    let stack = build_stack(&base_url, true);
    let pipeline = BookDetailsPipeline::new(
        stack.client.clone(),
        stack.normalizer.clone(),
        Duration::from_secs(60),
    );
    let paginator = ShelfPaginator::new(stack.client, stack.normalizer, Duration::from_secs(60));

    assert!(pipeline.fetch_book_details("1").await.is_err());
    assert!(paginator.fetch_shelf("u", "read").await.is_err());

    // But the batch wrapper never fails as a whole
    let books = pipeline.fetch_many(&["1".to_string(), "2".to_string()]).await;
    assert!(books.is_empty());
}
