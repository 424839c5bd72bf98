use std::fmt;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::dates::{DateRange, format_catalog_date};
use crate::domain::{ApiKey, VolumeId};
use crate::error::UpcomingError;

pub const DEFAULT_BASE_URL: &str = "https://comicvine.gamespot.com";
pub const SEARCH_LIMIT: usize = 10;
pub const ISSUE_LIMIT: usize = 30;

const SEARCH_FIELDS: &str = "id,name,count_of_issues,start_year,publisher";
const ISSUE_FIELDS: &str = "id,name,issue_number,store_date,cover_date,image,description";
const STATUS_OK: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub id: VolumeId,
    pub name: String,
    pub issue_count: i64,
    /// Zero when the catalog has no start year.
    pub start_year: i32,
    pub publisher: Option<String>,
}

/// Issue as the catalog returns it. String fields are passed through
/// untouched, including blank values and the literal `"null"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawIssue {
    pub id: i64,
    pub name: Option<String>,
    pub issue_number: Option<String>,
    pub store_date: Option<String>,
    pub cover_date: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    InvalidKey,
    Forbidden,
    NotFound,
    Unexpected(u16),
    Failed(String),
}

impl ConnectionStatus {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => ConnectionStatus::Connected,
            401 => ConnectionStatus::InvalidKey,
            403 => ConnectionStatus::Forbidden,
            404 => ConnectionStatus::NotFound,
            other => ConnectionStatus::Unexpected(other),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::InvalidKey => write!(f, "Invalid API key (401)"),
            ConnectionStatus::Forbidden => write!(f, "Forbidden - check your key (403)"),
            ConnectionStatus::NotFound => write!(f, "Endpoint not found (404)"),
            ConnectionStatus::Unexpected(code) => write!(f, "Unexpected response: {code}"),
            ConnectionStatus::Failed(message) => write!(f, "{message}"),
        }
    }
}

pub trait CatalogClient: Send + Sync {
    fn search_volumes(
        &self,
        api_key: &ApiKey,
        query: &str,
    ) -> Result<Vec<SearchCandidate>, UpcomingError>;
    fn list_issues(
        &self,
        api_key: &ApiKey,
        volume: VolumeId,
        cover_dates: DateRange,
    ) -> Result<Vec<RawIssue>, UpcomingError>;
    fn test_connection(&self, api_key: &ApiKey) -> ConnectionStatus;
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub test_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("comicvine-upcoming/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(15),
            test_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct ComicVineHttpClient {
    client: Client,
    base_url: String,
    test_timeout: Duration,
}

impl ComicVineHttpClient {
    pub fn new() -> Result<Self, UpcomingError> {
        Self::with_settings(&HttpSettings::default())
    }

    pub fn with_settings(settings: &HttpSettings) -> Result<Self, UpcomingError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|err| UpcomingError::CatalogHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| UpcomingError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            test_timeout: settings.test_timeout,
        })
    }

    pub fn search_url(&self, api_key: &ApiKey, query: &str) -> Result<Url, UpcomingError> {
        let limit = SEARCH_LIMIT.to_string();
        self.endpoint(
            "search",
            &[
                ("api_key", api_key.as_str()),
                ("format", "json"),
                ("query", query),
                ("resources", "volume"),
                ("field_list", SEARCH_FIELDS),
                ("limit", limit.as_str()),
            ],
        )
    }

    pub fn issues_url(
        &self,
        api_key: &ApiKey,
        volume: VolumeId,
        cover_dates: DateRange,
    ) -> Result<Url, UpcomingError> {
        let filter = format!(
            "volume:{volume},cover_date:{}|{}",
            format_catalog_date(cover_dates.from),
            format_catalog_date(cover_dates.to)
        );
        let limit = ISSUE_LIMIT.to_string();
        self.endpoint(
            "issues",
            &[
                ("api_key", api_key.as_str()),
                ("format", "json"),
                ("filter", filter.as_str()),
                ("field_list", ISSUE_FIELDS),
                ("sort", "cover_date:asc"),
                ("limit", limit.as_str()),
            ],
        )
    }

    pub fn test_url(&self, api_key: &ApiKey) -> Result<Url, UpcomingError> {
        self.endpoint(
            "issues",
            &[
                ("api_key", api_key.as_str()),
                ("format", "json"),
                ("limit", "1"),
            ],
        )
    }

    fn endpoint(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url, UpcomingError> {
        Url::parse_with_params(&format!("{}/api/{resource}/", self.base_url), params)
            .map_err(|err| UpcomingError::CatalogHttp(err.to_string()))
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, UpcomingError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "ComicVine request failed".to_string());
        Err(UpcomingError::CatalogStatus { status, message })
    }

    fn get_text(&self, url: Url) -> Result<String, UpcomingError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| UpcomingError::CatalogHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| UpcomingError::CatalogHttp(err.to_string()))
    }
}

impl CatalogClient for ComicVineHttpClient {
    fn search_volumes(
        &self,
        api_key: &ApiKey,
        query: &str,
    ) -> Result<Vec<SearchCandidate>, UpcomingError> {
        let body = self.get_text(self.search_url(api_key, query)?)?;
        parse_search_results(&body)
    }

    fn list_issues(
        &self,
        api_key: &ApiKey,
        volume: VolumeId,
        cover_dates: DateRange,
    ) -> Result<Vec<RawIssue>, UpcomingError> {
        let body = self.get_text(self.issues_url(api_key, volume, cover_dates)?)?;
        parse_issue_results(&body)
    }

    fn test_connection(&self, api_key: &ApiKey) -> ConnectionStatus {
        let url = match self.test_url(api_key) {
            Ok(url) => url,
            Err(err) => return ConnectionStatus::Failed(err.to_string()),
        };
        match self.client.get(url).timeout(self.test_timeout).send() {
            Ok(response) => ConnectionStatus::from_status(response.status().as_u16()),
            Err(err) => ConnectionStatus::Failed(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status_code: Option<i64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Value,
}

impl Envelope {
    fn parse(body: &str) -> Result<Self, UpcomingError> {
        serde_json::from_str(body).map_err(|err| UpcomingError::CatalogDecode(err.to_string()))
    }

    /// Decodes each result row on its own. Rows that do not decode are
    /// skipped so one bad record never costs the rest of the page.
    fn into_rows<T: DeserializeOwned>(self, kind: &str) -> Result<Vec<T>, UpcomingError> {
        if let Some(code) = self.status_code.filter(|code| *code != STATUS_OK) {
            return Err(UpcomingError::CatalogStatus {
                status: u16::try_from(code).unwrap_or(u16::MAX),
                message: self.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        let rows = match self.results {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => {
                return Err(UpcomingError::CatalogDecode(format!(
                    "expected a results array, found {other}"
                )));
            }
        };
        Ok(rows
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| match serde_json::from_value(row) {
                Ok(item) => Some(item),
                Err(err) => {
                    tracing::warn!(kind, index, error = %err, "skipping malformed catalog row");
                    None
                }
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct VolumeDto {
    id: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    count_of_issues: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    start_year: Option<i64>,
    #[serde(default)]
    publisher: Value,
}

#[derive(Debug, Deserialize)]
struct IssueDto {
    id: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    issue_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    store_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    cover_date: Option<String>,
    #[serde(default)]
    image: Value,
    #[serde(default, deserialize_with = "lenient_text")]
    description: Option<String>,
}

/// String member of a nested object such as `publisher.name`.
fn nested_text(value: &Value, field: &str) -> Option<String> {
    value.get(field)?.as_str().map(str::to_string)
}

impl From<VolumeDto> for SearchCandidate {
    fn from(value: VolumeDto) -> Self {
        Self {
            id: VolumeId::new(value.id),
            name: value.name.unwrap_or_default(),
            issue_count: value.count_of_issues.unwrap_or(0),
            start_year: value
                .start_year
                .and_then(|year| i32::try_from(year).ok())
                .unwrap_or(0),
            publisher: nested_text(&value.publisher, "name"),
        }
    }
}

impl From<IssueDto> for RawIssue {
    fn from(value: IssueDto) -> Self {
        Self {
            id: value.id,
            name: value.name,
            issue_number: value.issue_number,
            store_date: value.store_date,
            cover_date: value.cover_date,
            image_url: nested_text(&value.image, "medium_url"),
            description: value.description,
        }
    }
}

pub fn parse_search_results(body: &str) -> Result<Vec<SearchCandidate>, UpcomingError> {
    Ok(Envelope::parse(body)?
        .into_rows::<VolumeDto>("volume")?
        .into_iter()
        .map(SearchCandidate::from)
        .collect())
}

pub fn parse_issue_results(body: &str) -> Result<Vec<RawIssue>, UpcomingError> {
    Ok(Envelope::parse(body)?
        .into_rows::<IssueDto>("issue")?
        .into_iter()
        .map(RawIssue::from)
        .collect())
}

/// Integers, or strings holding one. Anything else reads as absent.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Strings, or numbers rendered as text. Anything else reads as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
