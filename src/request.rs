use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{Error, Result, COMMENT_IDS_PER_REQUEST, SUBMISSIONS_PER_PAGE};

/// An opaque record returned by the search service. The only field the crate relies on is `id`.
pub type Record = Map<String, Value>;

/// Returns the `id` of a record as a string, if it has one.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The archival search service.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Submissions posted to `target`, newest first, at most `limit` of them.
    async fn search_submissions(&self, target: &str, limit: Option<usize>) -> Result<Vec<Record>>;

    /// Ids of all comments attached to the given submissions.
    async fn search_submission_comment_ids(&self, submission_ids: &[String]) -> Result<Vec<String>>;

    /// Full comment records for the given comment ids, at most `limit` of them.
    async fn search_comments(&self, comment_ids: &[String], limit: Option<usize>) -> Result<Vec<Record>>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Vec<T>,
}

/// `SearchClient` backed by the Pushshift HTTP API.
#[derive(Debug, Clone)]
pub struct PushshiftClient {
    // Client uses Arc so we can clone cheaply
    client: Client,
    base_url: String,
}

impl PushshiftClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pushscrape/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Requests `url` and returns the contents of the `data` array.
    async fn get_data<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        debug!(url, ?query, "requesting");
        let res = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        let body = res.text().await?;
        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::UnexpectedResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl SearchClient for PushshiftClient {
    async fn search_submissions(&self, target: &str, limit: Option<usize>) -> Result<Vec<Record>> {
        let url = format!("{}/reddit/search/submission/", self.base_url);
        let mut submissions = Vec::new();
        let mut before: Option<i64> = None;

        loop {
            let remaining = limit.map_or(usize::MAX, |l| l.saturating_sub(submissions.len()));
            if remaining == 0 {
                break;
            }
            let mut query = vec![
                ("subreddit", target.to_string()),
                ("size", remaining.min(SUBMISSIONS_PER_PAGE).to_string()),
                ("sort", "desc".to_string()),
                ("sort_type", "created_utc".to_string()),
            ];
            if let Some(before) = before {
                query.push(("before", before.to_string()));
            }

            let page: Vec<Record> = self.get_data(&url, &query).await?;
            if page.is_empty() {
                break;
            }
            // Page backwards from the oldest submission seen so far.
            let oldest = page
                .iter()
                .filter_map(|r| r.get("created_utc").and_then(Value::as_i64))
                .min();
            submissions.extend(page.into_iter().take(remaining));
            match oldest {
                Some(ts) if before.map_or(true, |b| ts < b) => before = Some(ts),
                _ => break,
            }
        }
        Ok(submissions)
    }

    async fn search_submission_comment_ids(&self, submission_ids: &[String]) -> Result<Vec<String>> {
        let mut comment_ids = Vec::new();
        for id in submission_ids {
            let url = format!("{}/reddit/submission/comment_ids/{id}", self.base_url);
            let ids: Vec<String> = self.get_data(&url, &[]).await?;
            comment_ids.extend(ids);
        }
        Ok(comment_ids)
    }

    async fn search_comments(&self, comment_ids: &[String], limit: Option<usize>) -> Result<Vec<Record>> {
        let url = format!("{}/reddit/search/comment/", self.base_url);
        let limit = limit.unwrap_or(usize::MAX);
        let mut comments = Vec::new();

        for ids in comment_ids.chunks(COMMENT_IDS_PER_REQUEST) {
            if comments.len() >= limit {
                break;
            }
            let page: Vec<Record> = self.get_data(&url, &[("ids", ids.join(","))]).await?;
            let remaining = limit - comments.len();
            comments.extend(page.into_iter().take(remaining));
        }
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PushshiftClient {
        PushshiftClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn record_id_accepts_strings_and_numbers() {
        let rec: Record = serde_json::from_value(json!({"id": "abc"})).unwrap();
        assert_eq!(record_id(&rec).as_deref(), Some("abc"));
        let rec: Record = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(record_id(&rec).as_deref(), Some("42"));
        let rec: Record = serde_json::from_value(json!({"title": "x"})).unwrap();
        assert_eq!(record_id(&rec), None);
    }

    #[tokio::test]
    async fn submissions_are_paged_by_created_utc() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reddit/search/submission/"))
            .and(query_param("subreddit", "askdocs"))
            .and(query_param("before", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "c", "created_utc": 50}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/reddit/search/submission/"))
            .and(query_param("before", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;
        // Lowest priority: the first page, requested without `before`.
        Mock::given(method("GET"))
            .and(path("/reddit/search/submission/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "a", "created_utc": 200}, {"id": "b", "created_utc": 100}]
            })))
            .with_priority(10)
            .mount(&server)
            .await;

        let subs = client(&server).search_submissions("askdocs", None).await.unwrap();
        let ids: Vec<_> = subs.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn submissions_respect_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reddit/search/submission/"))
            .and(query_param("size", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "a", "created_utc": 3}, {"id": "b", "created_utc": 2}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let subs = client(&server).search_submissions("askdocs", Some(2)).await.unwrap();
        assert_eq!(subs.len(), 2);
    }

    #[tokio::test]
    async fn comment_ids_are_concatenated_in_submission_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reddit/submission/comment_ids/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": ["c1", "c2"]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/reddit/submission/comment_ids/s2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": ["c3"]})))
            .mount(&server)
            .await;

        let ids = client(&server)
            .search_submission_comment_ids(&["s1".into(), "s2".into()])
            .await
            .unwrap();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn comments_are_requested_by_joined_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reddit/search/comment/"))
            .and(query_param("ids", "c1,c2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "c1", "body": "hi"}, {"id": "c2", "body": "yo"}]
            })))
            .mount(&server)
            .await;

        let comments = client(&server)
            .search_comments(&["c1".into(), "c2".into()], None)
            .await
            .unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1]["body"], "yo");
    }

    #[tokio::test]
    async fn error_status_is_an_external_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server)
            .search_submission_comment_ids(&["s1".into()])
            .await
            .unwrap_err();
        assert!(err.is_external());
    }

    #[tokio::test]
    async fn malformed_body_is_an_external_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>down</html>"))
            .mount(&server)
            .await;

        let err = client(&server).search_comments(&["c1".into()], None).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse { .. }));
    }
}
