use async_trait::async_trait;
use chrono::Utc;
use kchat_core::{Document, Retriever};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use crate::KendraError;
use crate::sigv4::{AwsCredentials, Signer};

const SERVICE: &str = "kendra";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_RETRIEVE: &str = "AWSKendraFrontendService.Retrieve";
const TARGET_QUERY: &str = "AWSKendraFrontendService.Query";

/// Kendra rejects query text longer than this.
const MAX_QUERY_CHARS: usize = 999;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RetrieveResponse {
    #[serde(default)]
    result_items: Vec<RetrieveResultItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RetrieveResultItem {
    #[serde(default)]
    document_title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, rename = "DocumentURI")]
    document_uri: Option<String>,
    #[serde(default)]
    score_attributes: Option<ScoreAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryResponse {
    #[serde(default)]
    result_items: Vec<QueryResultItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryResultItem {
    #[serde(default)]
    document_title: Option<TextWithHighlights>,
    #[serde(default)]
    document_excerpt: Option<TextWithHighlights>,
    #[serde(default, rename = "DocumentURI")]
    document_uri: Option<String>,
    #[serde(default)]
    score_attributes: Option<ScoreAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TextWithHighlights {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScoreAttributes {
    #[serde(default)]
    score_confidence: Option<String>,
}

fn to_document(
    title: Option<String>,
    excerpt: Option<String>,
    uri: Option<String>,
    score: Option<ScoreAttributes>,
) -> Document {
    let title = title.unwrap_or_default();
    let excerpt = excerpt.unwrap_or_default();
    Document {
        page_content: format!("Document Title: {title}\nDocument Excerpt: \n{excerpt}\n"),
        source: uri.unwrap_or_default(),
        title: Some(title).filter(|t| !t.is_empty()),
        score: score.and_then(|s| s.score_confidence),
    }
}

/// Retriever backed by an Amazon Kendra index.
///
/// Uses the `Retrieve` API and falls back to `Query` when `Retrieve` finds
/// nothing.
pub struct KendraRetriever {
    client: Client,
    endpoint: String,
    region: String,
    index_id: String,
    top_k: usize,
    credentials: Option<AwsCredentials>,
}

impl KendraRetriever {
    /// Credentials come from the AWS environment variables, falling back to
    /// the shared credentials file.
    pub fn new(region: String, index_id: String) -> Self {
        info!("Creating KendraRetriever: region={}, index={}", region, index_id);
        Self {
            client: Client::new(),
            endpoint: format!("https://kendra.{region}.amazonaws.com/"),
            region,
            index_id,
            top_k: 3,
            credentials: AwsCredentials::load(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Kendra requires a page size of at least one, so zero is raised to one.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn request_body(&self, query: &str) -> serde_json::Value {
        let query_text: String = query.trim().chars().take(MAX_QUERY_CHARS).collect();
        json!({
            "IndexId": self.index_id,
            "QueryText": query_text,
            "PageSize": self.top_k,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        target: &str,
        body: &serde_json::Value,
    ) -> Result<T, KendraError> {
        let credentials = self
            .credentials
            .clone()
            .ok_or(KendraError::MissingCredentials)?;
        let url = Url::parse(&self.endpoint)
            .map_err(|e| KendraError::Endpoint(format!("{}: {e}", self.endpoint)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(KendraError::Endpoint(self.endpoint.clone())),
        };

        let payload = serde_json::to_vec(body)?;
        let signer = Signer::new(credentials, self.region.clone(), SERVICE);
        let signed = signer.sign_post(
            &host,
            url.path(),
            &[("content-type", CONTENT_TYPE), ("x-amz-target", target)],
            &payload,
            Utc::now(),
        );

        let mut request = self
            .client
            .post(url)
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", target);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        debug!("Calling {target}");
        let response = request.body(payload).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(KendraError::from_response(status.as_u16(), &text));
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Call the `Retrieve` API and map passages to documents.
    pub async fn retrieve_passages(&self, query: &str) -> Result<Vec<Document>, KendraError> {
        let response: RetrieveResponse = self.call(TARGET_RETRIEVE, &self.request_body(query)).await?;
        Ok(response
            .result_items
            .into_iter()
            .map(|item| {
                to_document(
                    item.document_title,
                    item.content,
                    item.document_uri,
                    item.score_attributes,
                )
            })
            .collect())
    }

    /// Call the `Query` API and map excerpts to documents.
    pub async fn query_excerpts(&self, query: &str) -> Result<Vec<Document>, KendraError> {
        let response: QueryResponse = self.call(TARGET_QUERY, &self.request_body(query)).await?;
        Ok(response
            .result_items
            .into_iter()
            .take(self.top_k)
            .map(|item| {
                to_document(
                    item.document_title.and_then(|t| t.text),
                    item.document_excerpt.and_then(|t| t.text),
                    item.document_uri,
                    item.score_attributes,
                )
            })
            .collect())
    }
}

#[async_trait]
impl Retriever for KendraRetriever {
    async fn retrieve(&self, query: &str) -> anyhow::Result<Vec<Document>> {
        // Kendra requires at least one character of query text.
        if query.trim().is_empty() {
            debug!("Blank query, skipping retrieval");
            return Ok(Vec::new());
        }

        let mut documents = self.retrieve_passages(query).await?;
        if documents.is_empty() {
            info!("Retrieve returned no passages, falling back to Query");
            documents = self.query_excerpts(query).await?;
        }

        info!("Retrieved {} documents", documents.len());
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn retriever(server: &MockServer) -> KendraRetriever {
        KendraRetriever::new("us-east-1".to_string(), "idx-1".to_string())
            .with_endpoint(format!("{}/", server.uri()))
            .with_credentials(AwsCredentials::new("AKID", "secret"))
    }

    fn retrieve_mock() -> wiremock::MockBuilder {
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-amz-target", TARGET_RETRIEVE))
    }

    fn query_mock() -> wiremock::MockBuilder {
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-amz-target", TARGET_QUERY))
    }

    #[tokio::test]
    async fn test_retrieve_maps_passages() {
        let server = MockServer::start().await;
        retrieve_mock()
            .and(header("content-type", CONTENT_TYPE))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(body_partial_json(json!({
                "IndexId": "idx-1",
                "QueryText": "What is Kendra?",
                "PageSize": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "QueryId": "q-1",
                "ResultItems": [
                    {
                        "Id": "r-1",
                        "DocumentId": "d-1",
                        "DocumentTitle": "Kendra FAQ",
                        "Content": "Kendra is an enterprise search service.",
                        "DocumentURI": "https://example.com/faq",
                        "ScoreAttributes": {"ScoreConfidence": "HIGH"}
                    },
                    {
                        "Id": "r-2",
                        "DocumentTitle": "Pricing",
                        "Content": "Priced per index hour.",
                        "DocumentURI": "s3://docs/pricing.pdf"
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let documents = retriever(&server).retrieve("  What is Kendra?  ").await.unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].source, "https://example.com/faq");
        assert_eq!(documents[0].title.as_deref(), Some("Kendra FAQ"));
        assert_eq!(documents[0].score.as_deref(), Some("HIGH"));
        assert_eq!(
            documents[0].page_content,
            "Document Title: Kendra FAQ\nDocument Excerpt: \nKendra is an enterprise search service.\n"
        );
        assert_eq!(documents[1].source, "s3://docs/pricing.pdf");
        assert!(documents[1].score.is_none());
    }

    #[tokio::test]
    async fn test_falls_back_to_query_when_retrieve_is_empty() {
        let server = MockServer::start().await;
        retrieve_mock()
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ResultItems": []})))
            .expect(1)
            .mount(&server)
            .await;
        query_mock()
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ResultItems": [
                    {
                        "Type": "DOCUMENT",
                        "DocumentTitle": {"Text": "Guide"},
                        "DocumentExcerpt": {"Text": "Step one."},
                        "DocumentURI": "https://example.com/guide"
                    },
                    {"Type": "DOCUMENT", "DocumentURI": "a"},
                    {"Type": "DOCUMENT", "DocumentURI": "b"},
                    {"Type": "DOCUMENT", "DocumentURI": "c"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let documents = retriever(&server).retrieve("guide").await.unwrap();

        assert_eq!(documents.len(), 3);
        assert_eq!(documents[0].source, "https://example.com/guide");
        assert!(documents[0].page_content.contains("Step one."));
        assert_eq!(documents[2].source, "b");
    }

    #[tokio::test]
    async fn test_long_query_is_truncated() {
        let server = MockServer::start().await;
        retrieve_mock()
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ResultItems": [{"Content": "x", "DocumentURI": "u"}]
            })))
            .mount(&server)
            .await;

        let long_query = "é".repeat(1500);
        retriever(&server).retrieve(&long_query).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["QueryText"].as_str().unwrap().chars().count(), MAX_QUERY_CHARS);
    }

    #[tokio::test]
    async fn test_service_error_is_surfaced() {
        let server = MockServer::start().await;
        retrieve_mock()
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "com.amazonaws.kendra#ResourceNotFoundException",
                "message": "Index idx-1 not found"
            })))
            .mount(&server)
            .await;

        let err = retriever(&server).retrieve_passages("q").await.unwrap_err();
        match err {
            KendraError::Service { status, kind, message } => {
                assert_eq!(status, 400);
                assert_eq!(kind, "ResourceNotFoundException");
                assert_eq!(message, "Index idx-1 not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_zero_top_k_requests_one_result() {
        let server = MockServer::start().await;
        retrieve_mock()
            .and(body_partial_json(json!({"PageSize": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ResultItems": [{"Content": "x", "DocumentURI": "u"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let documents = retriever(&server)
            .with_top_k(0)
            .retrieve("q")
            .await
            .unwrap();
        assert_eq!(documents.len(), 1);
    }

    #[tokio::test]
    async fn test_endpoint_path_is_used_and_signed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/kendra/"))
            .and(header("x-amz-target", TARGET_RETRIEVE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ResultItems": [{"Content": "x", "DocumentURI": "u"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credentials = AwsCredentials::new("AKID", "secret");
        let retriever = KendraRetriever::new("us-east-1".to_string(), "idx-1".to_string())
            .with_endpoint(format!("{}/kendra/", server.uri()))
            .with_credentials(credentials.clone());
        retriever.retrieve_passages("q").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let request = &requests[0];
        let header_value = |name: &str| {
            request
                .headers
                .get(name)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        };
        let amz_date = header_value("x-amz-date");
        let now = chrono::NaiveDateTime::parse_from_str(&amz_date, "%Y%m%dT%H%M%SZ")
            .unwrap()
            .and_utc();
        let host = request.url.host_str().unwrap().to_string();
        let host = format!("{host}:{}", request.url.port().unwrap());

        let expected = Signer::new(credentials, "us-east-1", SERVICE).sign_post(
            &host,
            "/kendra/",
            &[("content-type", CONTENT_TYPE), ("x-amz-target", TARGET_RETRIEVE)],
            &request.body,
            now,
        );
        let expected_authorization = &expected
            .iter()
            .find(|(k, _)| *k == "authorization")
            .unwrap()
            .1;
        assert_eq!(&header_value("authorization"), expected_authorization);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_at_call_time() {
        let mut retriever = KendraRetriever::new(String::new(), String::new());
        retriever.credentials = None;

        let err = retriever.retrieve_passages("q").await.unwrap_err();
        assert!(matches!(err, KendraError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_blank_query_skips_service() {
        let server = MockServer::start().await;
        retrieve_mock()
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let documents = retriever(&server).retrieve("   ").await.unwrap();
        assert!(documents.is_empty());
    }
}
