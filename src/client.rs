use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::RequestError;
use crate::models::{
    AiAnalysis, Filters, JobId, JobListing, PageLimit, ParsedQuery, SearchResult, Stats,
    lenient_record,
};

// --- Index trait ---

/// Read side of the remote job index.
///
/// Implementations never retry; any transport failure or non-2xx status comes
/// back as a [`RequestError`].
#[async_trait]
pub trait JobIndex: Send + Sync {
    /// Keyword/filter lookup. `query = None` lists everything (browse).
    async fn fetch_traditional(
        &self,
        query: Option<&str>,
        filters: &Filters,
        offset: u32,
    ) -> Result<Vec<JobListing>, RequestError>;

    /// LLM-interpreted search. There is no browse form of this call.
    async fn fetch_ai_assisted(
        &self,
        query: &str,
        limit: PageLimit,
    ) -> Result<SearchResult, RequestError>;

    async fn fetch_stats(&self) -> Result<Stats, RequestError>;

    async fn fetch_job(&self, id: JobId) -> Result<JobListing, RequestError>;
}

// --- Wire shapes ---

#[derive(Debug, Deserialize)]
struct AiSearchResponse {
    #[serde(default)]
    jobs: Option<Vec<JobListing>>,
    #[serde(default, deserialize_with = "lenient_record")]
    ai_analysis: Option<AiAnalysis>,
    #[serde(default, deserialize_with = "lenient_record")]
    llm_parsing: Option<ParsedQuery>,
    #[serde(default)]
    search_summary: Option<String>,
}

impl From<AiSearchResponse> for SearchResult {
    fn from(response: AiSearchResponse) -> Self {
        SearchResult {
            jobs: response.jobs.unwrap_or_default(),
            ai_analysis: response.ai_analysis,
            parsed_query: response.llm_parsing,
            summary: response.search_summary,
        }
    }
}

// --- HTTP implementation ---

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct HttpJobIndex {
    base: Url,
    client: reqwest::Client,
}

impl HttpJobIndex {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = base_url_with_slash(base_url)?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("jobseek/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { base, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RequestError> {
        self.base
            .join(path)
            .map_err(|e| RequestError::Transport(format!("invalid endpoint '{}': {}", path, e)))
    }

    pub fn traditional_url(
        &self,
        query: Option<&str>,
        filters: &Filters,
        offset: u32,
    ) -> Result<Url, RequestError> {
        let mut url = self.endpoint("jobs/")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(q) = query {
                pairs.append_pair("q", q);
            }
            if !filters.company.trim().is_empty() {
                pairs.append_pair("company", filters.company.trim());
            }
            if !filters.location.trim().is_empty() {
                pairs.append_pair("location", filters.location.trim());
            }
            pairs
                .append_pair("limit", &filters.limit.to_string())
                .append_pair("offset", &offset.to_string());
        }
        Ok(url)
    }

    pub fn ai_search_url(&self, query: &str, limit: PageLimit) -> Result<Url, RequestError> {
        let mut url = self.endpoint("jobs/ai-search")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &limit.to_string())
            .append_pair("enhance", "true");
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RequestError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Http(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RequestError::Decode(e.to_string()))
    }
}

/// `Url::join` drops the last path segment unless the base ends in `/`.
pub fn base_url_with_slash(raw: &str) -> Result<Url> {
    let mut base = Url::parse(raw.trim()).with_context(|| format!("Invalid base URL: {}", raw))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

#[async_trait]
impl JobIndex for HttpJobIndex {
    async fn fetch_traditional(
        &self,
        query: Option<&str>,
        filters: &Filters,
        offset: u32,
    ) -> Result<Vec<JobListing>, RequestError> {
        let url = self.traditional_url(query, filters, offset)?;
        let jobs: Option<Vec<JobListing>> = self.get_json(url).await?;
        Ok(jobs.unwrap_or_default())
    }

    async fn fetch_ai_assisted(
        &self,
        query: &str,
        limit: PageLimit,
    ) -> Result<SearchResult, RequestError> {
        let url = self.ai_search_url(query, limit)?;
        let response: AiSearchResponse = self.get_json(url).await?;
        Ok(response.into())
    }

    async fn fetch_stats(&self) -> Result<Stats, RequestError> {
        let url = self.endpoint("stats")?;
        self.get_json(url).await
    }

    async fn fetch_job(&self, id: JobId) -> Result<JobListing, RequestError> {
        let url = self.endpoint(&format!("jobs/{}", id))?;
        self.get_json(url).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{dead_address, serve_once};
    use super::*;

    fn index() -> HttpJobIndex {
        HttpJobIndex::new("http://localhost:8000").unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let base = base_url_with_slash("http://example.com/api").unwrap();
        assert_eq!(base.as_str(), "http://example.com/api/");
        assert!(base_url_with_slash("not a url").is_err());
    }

    #[test]
    fn test_traditional_url_search() {
        let filters = Filters::default();
        let url = index()
            .traditional_url(Some("rust developer"), &filters, 0)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/jobs/?q=rust+developer&limit=20&offset=0"
        );
    }

    #[test]
    fn test_traditional_url_browse_with_filters() {
        let filters = Filters {
            company: "Acme Corp".to_string(),
            location: "  ".to_string(),
            limit: PageLimit::Fifty,
        };
        let url = index().traditional_url(None, &filters, 0).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/jobs/?company=Acme+Corp&limit=50&offset=0"
        );
    }

    #[test]
    fn test_ai_search_url_sets_enhance() {
        let url = index()
            .ai_search_url("Remote React developer", PageLimit::Twenty)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/jobs/ai-search?query=Remote+React+developer&limit=20&enhance=true"
        );
    }

    #[test]
    fn test_ai_response_maps_to_search_result() {
        let raw = r#"{
            "query": "Remote React developer",
            "total_results": 1,
            "jobs": [{"job_id": 1, "title": "React Dev", "company": "A", "location": "Remote",
                      "ai_insights": {"relevance_score": "high", "key_highlights": ["React"]}}],
            "ai_analysis": {"summary": "One strong match"},
            "llm_parsing": {"keywords": ["React", "Remote"], "work_arrangement": "remote"},
            "search_summary": "Found 1 jobs matching 'Remote React developer'"
        }"#;
        let response: AiSearchResponse = serde_json::from_str(raw).unwrap();
        let result = SearchResult::from(response);
        assert_eq!(result.jobs.len(), 1);
        assert_eq!(
            result.jobs[0].ai_insights.as_ref().unwrap().relevance_score.as_deref(),
            Some("high")
        );
        assert_eq!(result.ai_analysis.unwrap().summary, "One strong match");
        assert_eq!(result.parsed_query.unwrap().keywords, vec!["React", "Remote"]);
        assert!(result.summary.unwrap().starts_with("Found 1"));
    }

    #[test]
    fn test_ai_response_with_nulls() {
        let raw = r#"{"jobs": null, "ai_analysis": null, "llm_parsing": null}"#;
        let result = SearchResult::from(serde_json::from_str::<AiSearchResponse>(raw).unwrap());
        assert!(result.jobs.is_empty());
        assert!(!result.has_ai_artifacts());
    }

    #[test]
    fn test_ai_response_with_fallback_analysis() {
        let raw = r#"{
            "query": "python developer",
            "jobs": [{"job_id": 7, "title": "Python Dev", "company": "B", "location": "Austin",
                      "ai_insights": {
                          "relevance_score": "medium",
                          "key_highlights": ["Position available", "Company hiring"],
                          "why_good_match": "Job matches search criteria",
                          "potential_concerns": ["Limited information available"]}}],
            "ai_analysis": {
                "summary": "Found 1 jobs matching your search.",
                "insights": ["Search returned 1 results",
                             "Consider refining your search terms for better matches"],
                "recommendations": ["Review job descriptions carefully",
                                    "Apply to positions that match your skills"],
                "salary_trends": "Salary information not available in this dataset",
                "skill_demand": "Check job descriptions for required skills"},
            "llm_parsing": {
                "keywords": ["python", "developer"],
                "location": null,
                "salary_expectation": null,
                "work_arrangement": null,
                "experience_level": null,
                "search_query": "python developer"},
            "search_summary": "Found 1 jobs matching 'python developer'"
        }"#;
        let result = SearchResult::from(serde_json::from_str::<AiSearchResponse>(raw).unwrap());

        let insight = result.jobs[0].ai_insights.as_ref().unwrap();
        assert_eq!(insight.potential_concerns, vec!["Limited information available"]);
        let analysis = result.ai_analysis.unwrap();
        assert_eq!(analysis.insights.len(), 2);
        assert!(analysis.salary_trends.unwrap().starts_with("Salary information"));
        let parsed = result.parsed_query.unwrap();
        assert_eq!(parsed.keywords, vec!["python", "developer"]);
        assert_eq!(parsed.location, None);
        assert_eq!(parsed.search_query.as_deref(), Some("python developer"));
    }

    #[test]
    fn test_ai_response_with_loose_model_output() {
        let raw = r#"{
            "jobs": [{"job_id": 1, "title": "React Dev",
                      "ai_insights": {"relevance_score": 0.9, "why_good_match": null}}],
            "ai_analysis": {"summary": null, "salary_trends": {"range": "$100k-$130k"}},
            "llm_parsing": {"keywords": null, "work_arrangement": "remote"},
            "search_summary": null
        }"#;
        let result = SearchResult::from(serde_json::from_str::<AiSearchResponse>(raw).unwrap());

        assert_eq!(result.jobs.len(), 1);
        let insight = result.jobs[0].ai_insights.as_ref().unwrap();
        assert_eq!(insight.relevance_score.as_deref(), Some("0.9"));
        assert_eq!(insight.why_good_match, None);
        let analysis = result.ai_analysis.unwrap();
        assert_eq!(analysis.summary, "");
        assert_eq!(analysis.salary_trends.as_deref(), Some("range: $100k-$130k"));
        let parsed = result.parsed_query.unwrap();
        assert!(parsed.keywords.is_empty());
        assert_eq!(parsed.work_arrangement.as_deref(), Some("remote"));
        assert_eq!(result.summary, None);
    }

    #[test]
    fn test_unusable_analysis_keeps_jobs() {
        let raw = r#"{
            "jobs": [{"job_id": 2, "title": "SWE"}],
            "ai_analysis": "The model returned prose instead of JSON",
            "llm_parsing": ["python"]
        }"#;
        let result = SearchResult::from(serde_json::from_str::<AiSearchResponse>(raw).unwrap());
        assert_eq!(result.jobs.len(), 1);
        assert!(!result.has_ai_artifacts());
    }

    #[tokio::test]
    async fn test_fetch_ai_assisted_with_loose_analysis() {
        let base = serve_once(
            "200 OK",
            r#"{"jobs": [{"job_id": 9, "title": "Data Engineer"}],
                "ai_analysis": {"summary": null, "insights": null},
                "llm_parsing": {"keywords": "data engineer"}}"#,
        )
        .await;
        let index = HttpJobIndex::new(&base).unwrap();
        let result = index
            .fetch_ai_assisted("data engineer", PageLimit::Ten)
            .await
            .unwrap();
        assert_eq!(result.jobs[0].id, JobId(9));
        assert!(result.ai_analysis.unwrap().insights.is_empty());
        assert_eq!(result.parsed_query.unwrap().keywords, vec!["data engineer"]);
    }

    #[tokio::test]
    async fn test_fetch_traditional_success() {
        let base = serve_once(
            "200 OK",
            r#"[{"job_id": 3, "title": "SWE", "company": "Acme", "location": "NYC"}]"#,
        )
        .await;
        let index = HttpJobIndex::new(&base).unwrap();
        let jobs = index
            .fetch_traditional(Some("swe"), &Filters::default(), 0)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, JobId(3));
    }

    #[tokio::test]
    async fn test_fetch_stats_success() {
        let base = serve_once(
            "200 OK",
            r#"{"total_documents": 1200, "collection_name": "jobs", "fields": ["title"]}"#,
        )
        .await;
        let index = HttpJobIndex::new(&base).unwrap();
        let stats = index.fetch_stats().await.unwrap();
        assert_eq!(stats.total_documents, 1200);
        assert_eq!(stats.fields, vec!["title"]);
    }

    #[tokio::test]
    async fn test_fetch_job_keeps_unknown_fields() {
        let base = serve_once(
            "200 OK",
            r#"{"job_id": 42, "title": "SWE", "company": "Acme", "location": "NYC", "benefits": "dental"}"#,
        )
        .await;
        let index = HttpJobIndex::new(&base).unwrap();
        let job = index.fetch_job(JobId(42)).await.unwrap();
        assert_eq!(job.id, JobId(42));
        assert_eq!(job.extra["benefits"], "dental");
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let base = serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#).await;
        let index = HttpJobIndex::new(&base).unwrap();
        let err = index.fetch_stats().await.unwrap_err();
        assert_eq!(err, RequestError::Http(500));
    }

    #[tokio::test]
    async fn test_bad_body_is_decode_error() {
        let base = serve_once("200 OK", r#"{"unexpected": true}"#).await;
        let index = HttpJobIndex::new(&base).unwrap();
        let err = index.fetch_stats().await.unwrap_err();
        assert!(matches!(err, RequestError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let base = dead_address().await;
        let index = HttpJobIndex::new(&base).unwrap();
        let err = index
            .fetch_ai_assisted("rust", PageLimit::Ten)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Transport(_)));
    }
}
