// Fetch orchestration: turns several remote calls into one populated object graph
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, GoodreadsError, Result};
use crate::model::{Author, Book, Review, Update, User, READ_SHELF};
use crate::transport::{HttpTransport, Transport};
use crate::xml_response::{
    decode, AuthorResponse, Envelope, Response, XmlAuthorResponse, XmlResponse,
};

pub const USER_SHOW_PATH: &str = "/user/show.xml";
pub const BOOK_SHOW_PATH: &str = "/book/show.xml";
pub const AUTHOR_SHOW_PATH: &str = "/author/show.xml";
pub const REVIEW_LIST_PATH: &str = "/review/list.xml";

pub const REVIEWS_PER_PAGE: u32 = 200;
const REVIEW_LIST_VERSION: &str = "2";

#[derive(Debug, Default)]
struct RequestCounters {
    sent: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
}

/// Read-only client for the book cataloging service.
///
/// Every operation awaits its remote calls one after another and either
/// returns a fully populated result or the first error it hit.
pub struct GoodreadsClient<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
    counters: RequestCounters,
}

impl GoodreadsClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, ClientError> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> GoodreadsClient<T> {
    pub fn with_transport(
        config: ClientConfig,
        transport: T,
    ) -> std::result::Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            counters: RequestCounters::default(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            requests_sent: self.counters.sent.load(Ordering::SeqCst),
            requests_succeeded: self.counters.succeeded.load(Ordering::SeqCst),
            requests_failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    /// Fetches a user profile with every status book fully loaded.
    ///
    /// When the profile has at least `limit` statuses they are truncated to
    /// `limit`. Otherwise the shortfall is filled from the user's most
    /// recently read reviews into `last_read`.
    pub async fn fetch_user(&self, id: &str, limit: usize) -> Result<User> {
        let response: Response = self
            .get_data::<XmlResponse>(USER_SHOW_PATH, &[("id", id.to_string())])
            .await?
            .into();
        let mut user = response.user;

        let mut statuses = Vec::with_capacity(user.statuses.len());
        for status in std::mem::take(&mut user.statuses) {
            let book = self.fetch_book(&status.book.id).await?;
            statuses.push(status.with_book(book));
        }
        user.statuses = statuses;

        if user.statuses.len() >= limit {
            user.statuses.truncate(limit);
        } else {
            let remaining = limit - user.statuses.len();
            user.last_read = self.fetch_last_read(id, remaining).await?;
        }

        info!(
            user_id = id,
            statuses = user.statuses.len(),
            last_read = user.last_read.len(),
            "Fetched user"
        );
        Ok(user)
    }

    pub async fn fetch_book(&self, id: &str) -> Result<Book> {
        let response: Response = self
            .get_data::<XmlResponse>(BOOK_SHOW_PATH, &[("id", id.to_string())])
            .await?
            .into();
        Ok(response.book)
    }

    pub async fn fetch_author(&self, id: &str) -> Result<Author> {
        let response: AuthorResponse = self
            .get_data::<XmlAuthorResponse>(AUTHOR_SHOW_PATH, &[("id", id.to_string())])
            .await?
            .into();
        Ok(response.author)
    }

    /// The user's `limit` most recently read reviews, in a single page.
    pub async fn fetch_last_read(&self, id: &str, limit: usize) -> Result<Vec<Review>> {
        let params = [
            ("v", REVIEW_LIST_VERSION.to_string()),
            ("id", id.to_string()),
            ("shelf", READ_SHELF.to_string()),
            ("sort", "date_read".to_string()),
            ("order", "d".to_string()),
            ("per_page", limit.to_string()),
        ];
        let response: Response = self
            .get_data::<XmlResponse>(REVIEW_LIST_PATH, &params)
            .await?
            .into();
        Ok(response.reviews)
    }

    /// Every review on `shelf`, fetched page by page in order.
    ///
    /// The page count is derived from the user's total review count, so at
    /// least one page is always requested.
    pub async fn reviews_for_shelf(&self, user: &User, shelf: &str) -> Result<Vec<Review>> {
        let pages = user.review_count / REVIEWS_PER_PAGE + 1;
        let mut reviews = Vec::new();

        for page in 1..=pages {
            let params = [
                ("v", REVIEW_LIST_VERSION.to_string()),
                ("id", user.id.clone()),
                ("page", page.to_string()),
                ("per_page", REVIEWS_PER_PAGE.to_string()),
                ("shelf", shelf.to_string()),
            ];
            let response: Response = self
                .get_data::<XmlResponse>(REVIEW_LIST_PATH, &params)
                .await?
                .into();
            reviews.extend(response.reviews);
        }

        info!(
            user_id = user.id.as_str(),
            shelf,
            pages,
            reviews = reviews.len(),
            "Fetched shelf"
        );
        Ok(reviews)
    }

    /// The user's activity feed as embedded in their profile.
    pub async fn fetch_updates(&self, id: &str) -> Result<Vec<Update>> {
        let response: Response = self
            .get_data::<XmlResponse>(USER_SHOW_PATH, &[("id", id.to_string())])
            .await?
            .into();
        Ok(response.updates)
    }

    async fn get_data<E: Envelope>(&self, path: &str, params: &[(&str, String)]) -> Result<E> {
        let url = self.endpoint_url(path, params)?;
        debug!(path, ?params, "Sending request");

        self.counters.sent.fetch_add(1, Ordering::SeqCst);
        let result = match self.transport.get(&url).await {
            Ok(body) => decode::<E>(&body),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => {
                self.counters.succeeded.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!(path, error = %e, "Request failed");
            }
        }
        result
    }

    fn endpoint_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, path))
            .map_err(|e| GoodreadsError::InvalidUrl(format!("{}{}: {}", base, path, e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("key", &self.config.api_key);
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock_transport::{query, MockTransport};
    use crate::xml_response::SMALL_USER_XML;
    use bytes::Bytes;

    fn test_config() -> ClientConfig {
        ClientConfig::new("test_key").with_base_url("http://goodreads.test/")
    }

    fn client<F>(handler: F) -> GoodreadsClient<MockTransport>
    where
        F: Fn(&Url) -> Result<Bytes> + Send + Sync + 'static,
    {
        GoodreadsClient::with_transport(test_config(), MockTransport::new(handler)).unwrap()
    }

    fn xml(body: String) -> Result<Bytes> {
        Ok(Bytes::from(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<GoodreadsResponse>{}</GoodreadsResponse>",
            body
        )))
    }

    fn user_xml(review_count: u32, status_book_ids: &[String]) -> Result<Bytes> {
        let statuses: String = status_book_ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                format!(
                    "<user_status><page>{}</page><percent>{}</percent>\
                     <updated_at>2020-01-0{}T10:00:00Z</updated_at>\
                     <book><id type=\"integer\">{}</id></book></user_status>",
                    10 * (i + 1),
                    i + 1,
                    i + 1,
                    id
                )
            })
            .collect();
        xml(format!(
            "<user><id>42</id><name>Ada Reader</name>\
             <reviews_count type=\"integer\">{}</reviews_count>\
             <user_shelves><user_shelf><id>1</id><name>read</name><book_count>9</book_count></user_shelf></user_shelves>\
             <user_statuses>{}</user_statuses></user>",
            review_count, statuses
        ))
    }

    fn book_xml(id: &str) -> Result<Bytes> {
        xml(format!(
            "<book><id>{id}</id><title>Book {id}</title><num_pages>300</num_pages>\
             <authors><author><id>a{id}</id><name>Author {id}</name></author></authors></book>"
        ))
    }

    fn reviews_xml(ids: &[String]) -> Result<Bytes> {
        let reviews: String = ids
            .iter()
            .map(|id| {
                format!(
                    "<review><book><id>{id}</id><title>Book {id}</title></book>\
                     <rating>4</rating><read_at>Thu Jan 02 10:00:00 +0000 2020</read_at></review>"
                )
            })
            .collect();
        xml(format!(
            "<reviews start=\"1\" end=\"{}\" total=\"{}\">{}</reviews>",
            ids.len(),
            ids.len(),
            reviews
        ))
    }

    fn ids(prefix: &str, count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("{}{}", prefix, i)).collect()
    }

    // Serves a user with `statuses` status books; review lists honour per_page
    fn profile_handler(statuses: usize) -> impl Fn(&Url) -> Result<Bytes> + Send + Sync {
        move |url: &Url| match url.path() {
            USER_SHOW_PATH => user_xml(12, &ids("10", statuses)),
            BOOK_SHOW_PATH => book_xml(&query(url, "id").unwrap_or_default()),
            REVIEW_LIST_PATH => {
                let per_page: usize = query(url, "per_page").unwrap().parse().unwrap();
                reviews_xml(&ids("r", per_page))
            }
            other => panic!("Unexpected request to {}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_user_truncates_when_statuses_cover_limit() {
        let client = client(profile_handler(5));

        let user = client.fetch_user("42", 3).await.unwrap();

        assert_eq!(user.id, "42");
        assert_eq!(user.review_count, 12);
        assert_eq!(user.statuses.len(), 3);
        assert!(user.last_read.is_empty());

        // Every status book is enriched before truncation
        let book_requests = client.transport().requests_to(BOOK_SHOW_PATH);
        let requested: Vec<String> = book_requests
            .iter()
            .map(|url| query(url, "id").unwrap())
            .collect();
        assert_eq!(requested, ids("10", 5));
        assert!(client.transport().requests_to(REVIEW_LIST_PATH).is_empty());

        for (i, status) in user.statuses.iter().enumerate() {
            assert_eq!(status.page, 10 * (i as u32 + 1));
            assert_eq!(status.percent, i as u32 + 1);
            assert_eq!(status.book.title, format!("Book 10{}", i + 1));
            assert_eq!(status.book.num_pages, 300);
            assert_eq!(status.book.author().unwrap().name, format!("Author 10{}", i + 1));
        }
    }

    #[tokio::test]
    async fn test_fetch_user_fills_shortfall_from_last_read() {
        let client = client(profile_handler(2));

        let user = client.fetch_user("42", 10).await.unwrap();

        assert_eq!(user.statuses.len(), 2);
        assert_eq!(user.statuses[1].book.title, "Book 102");
        assert_eq!(user.last_read.len(), 8);
        assert_eq!(user.last_read[0].book.id, "r1");

        let review_requests = client.transport().requests_to(REVIEW_LIST_PATH);
        assert_eq!(review_requests.len(), 1);
        let url = &review_requests[0];
        assert_eq!(query(url, "id").as_deref(), Some("42"));
        assert_eq!(query(url, "per_page").as_deref(), Some("8"));
        assert_eq!(query(url, "shelf").as_deref(), Some("read"));
        assert_eq!(query(url, "sort").as_deref(), Some("date_read"));
        assert_eq!(query(url, "order").as_deref(), Some("d"));
        assert_eq!(query(url, "v").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_fetch_user_with_exactly_limit_statuses_skips_last_read() {
        let client = client(profile_handler(3));

        let user = client.fetch_user("42", 3).await.unwrap();

        assert_eq!(user.statuses.len(), 3);
        assert!(user.last_read.is_empty());
        assert!(client.transport().requests_to(REVIEW_LIST_PATH).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_user_aborts_when_a_book_fetch_fails() {
        let client = client(|url: &Url| match url.path() {
            USER_SHOW_PATH => user_xml(12, &ids("10", 3)),
            BOOK_SHOW_PATH if query(url, "id").as_deref() == Some("102") => Err(
                GoodreadsError::NetworkError("connection reset".to_string()),
            ),
            BOOK_SHOW_PATH => book_xml(&query(url, "id").unwrap()),
            other => panic!("Unexpected request to {}", other),
        });

        let result = client.fetch_user("42", 1).await;

        assert!(matches!(result, Err(GoodreadsError::NetworkError(_))));
        // 101 succeeded, 102 failed, 103 never requested
        assert_eq!(client.transport().requests_to(BOOK_SHOW_PATH).len(), 2);
        assert!(client.transport().requests_to(REVIEW_LIST_PATH).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_user_propagates_last_read_failure() {
        let client = client(|url: &Url| match url.path() {
            USER_SHOW_PATH => user_xml(12, &[]),
            REVIEW_LIST_PATH => xml("<error>forbidden</error>".to_string()),
            other => panic!("Unexpected request to {}", other),
        });

        match client.fetch_user("42", 5).await {
            Err(GoodreadsError::ApiResponseError { message, .. }) => assert_eq!(message, "forbidden"),
            other => panic!("Expected ApiResponseError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reviews_for_shelf_sweeps_pages_in_order() {
        let client = client(|url: &Url| {
            let page = query(url, "page").unwrap();
            match page.as_str() {
                "3" => reviews_xml(&ids("p3-", 50)),
                _ => reviews_xml(&ids(&format!("p{}-", page), 200)),
            }
        });
        let user = User {
            id: "42".to_string(),
            review_count: 450,
            ..Default::default()
        };

        let reviews = client.reviews_for_shelf(&user, "to-read").await.unwrap();

        let requests = client.transport().requests();
        let pages: Vec<String> = requests.iter().map(|url| query(url, "page").unwrap()).collect();
        assert_eq!(pages, vec!["1", "2", "3"]);
        for url in &requests {
            assert_eq!(url.path(), REVIEW_LIST_PATH);
            assert_eq!(query(url, "per_page").as_deref(), Some("200"));
            assert_eq!(query(url, "shelf").as_deref(), Some("to-read"));
            assert_eq!(query(url, "id").as_deref(), Some("42"));
        }

        assert_eq!(reviews.len(), 450);
        assert_eq!(reviews[0].book.id, "p1-1");
        assert_eq!(reviews[199].book.id, "p1-200");
        assert_eq!(reviews[200].book.id, "p2-1");
        assert_eq!(reviews[449].book.id, "p3-50");
    }

    #[tokio::test]
    async fn test_reviews_for_shelf_discards_pages_on_failure() {
        let client = client(|url: &Url| match query(url, "page").as_deref() {
            Some("2") => Err(GoodreadsError::NetworkError("timed out".to_string())),
            _ => reviews_xml(&ids("r", 200)),
        });
        let user = User {
            id: "42".to_string(),
            review_count: 450,
            ..Default::default()
        };

        let result = client.reviews_for_shelf(&user, "to-read").await;

        assert!(matches!(result, Err(GoodreadsError::NetworkError(_))));
        assert_eq!(client.transport().requests().len(), 2);
    }

    #[tokio::test]
    async fn test_reviews_for_shelf_page_count() {
        for (review_count, expected_requests) in [(0, 1), (199, 1), (200, 2), (400, 3), (401, 3)] {
            let client = client(|_: &Url| reviews_xml(&[]));
            let user = User {
                id: "42".to_string(),
                review_count,
                ..Default::default()
            };

            let reviews = client.reviews_for_shelf(&user, "read").await.unwrap();

            assert!(reviews.is_empty());
            assert_eq!(
                client.transport().requests().len(),
                expected_requests,
                "review_count = {}",
                review_count
            );
        }
    }

    #[tokio::test]
    async fn test_fetch_book_and_author() {
        let client = client(|url: &Url| match url.path() {
            BOOK_SHOW_PATH => book_xml("7"),
            AUTHOR_SHOW_PATH => xml(
                "<author><id>a7</id><name>Octavia E. Butler</name>\
                 <works_count>60</works_count></author>"
                    .to_string(),
            ),
            other => panic!("Unexpected request to {}", other),
        });

        let book = client.fetch_book("7").await.unwrap();
        assert_eq!(book.title, "Book 7");

        let author = client.fetch_author("a7").await.unwrap();
        assert_eq!(author.name, "Octavia E. Butler");
        assert_eq!(author.works_count, 60);

        for url in client.transport().requests() {
            assert_eq!(url.host_str(), Some("goodreads.test"));
            assert_eq!(query(&url, "key").as_deref(), Some("test_key"));
        }
    }

    #[tokio::test]
    async fn test_decode_failure_propagates() {
        let client = client(|_: &Url| Ok(Bytes::from_static(b"<GoodreadsResponse><book>")));

        assert!(matches!(
            client.fetch_book("7").await,
            Err(GoodreadsError::DecodeError(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_updates_does_not_enrich() {
        let client = client(|url: &Url| match url.path() {
            USER_SHOW_PATH => Ok(Bytes::from_static(SMALL_USER_XML.as_bytes())),
            other => panic!("Unexpected request to {}", other),
        });

        let updates = client.fetch_updates("42").await.unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].object.read_status.user_id, "42");
        assert_eq!(client.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_stats_count_each_request() {
        let client = client(|url: &Url| match query(url, "id").as_deref() {
            Some("bad") => Err(GoodreadsError::NetworkError("refused".to_string())),
            _ => book_xml("1"),
        });

        client.fetch_book("1").await.unwrap();
        client.fetch_book("2").await.unwrap();
        assert!(client.fetch_book("bad").await.is_err());

        assert_eq!(
            client.stats(),
            ClientStats {
                requests_sent: 3,
                requests_succeeded: 2,
                requests_failed: 1,
            }
        );
    }

    #[test]
    fn test_with_transport_validates_config() {
        let result = GoodreadsClient::with_transport(
            ClientConfig::new(""),
            MockTransport::new(|_: &Url| xml(String::new())),
        );
        assert!(matches!(result, Err(ClientError::ConfigError(_))));
    }
}
