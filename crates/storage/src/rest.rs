//! REST
//!
//! Client for the ExerciseDB API. Every read performs exactly one request. Failures are reported
//! as the matching `StorageError` and never retried.

use std::time::Duration;

use fittrack_domain as domain;
use log::debug;
use reqwest::{
    Method, Request, Response, Url,
    header::{ACCEPT, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use strum::{AsRefStr, Display, EnumString};

#[derive(Clone)]
pub struct RestSettings {
    pub base_url: String,
    pub api_key: String,
    pub host: String,
    /// Upper bound for establishing a connection and for each read from it.
    pub request_timeout: Duration,
    /// Upper bound for a whole request including the transfer of the response body.
    pub resource_timeout: Duration,
    /// Number of exercises that are fetched and filtered by a search.
    pub search_limit: u32,
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            base_url: "https://exercisedb.p.rapidapi.com".to_string(),
            api_key: String::new(),
            host: "exercisedb.p.rapidapi.com".to_string(),
            request_timeout: Duration::from_secs(30),
            resource_timeout: Duration::from_secs(60),
            search_limit: 200,
        }
    }
}

impl RestSettings {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait SendRequest {
    async fn send_request(&self, request: Request) -> Result<Response, domain::StorageError>;
}

#[derive(Clone)]
pub struct ReqwestSendRequest {
    client: reqwest::Client,
}

impl ReqwestSendRequest {
    pub fn new(settings: &RestSettings) -> Result<Self, domain::StorageError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.request_timeout)
            .read_timeout(settings.request_timeout)
            .timeout(settings.resource_timeout)
            .build()
            .map_err(|err| domain::StorageError::Other(Box::new(err)))?;
        Ok(Self { client })
    }
}

impl SendRequest for ReqwestSendRequest {
    async fn send_request(&self, request: Request) -> Result<Response, domain::StorageError> {
        self.client
            .execute(request)
            .await
            .map_err(|err| transport_error(&err))
    }
}

fn transport_error(err: &reqwest::Error) -> domain::StorageError {
    if err.is_timeout() {
        domain::StorageError::Timeout
    } else if err.is_connect() {
        domain::StorageError::NoConnection
    } else {
        domain::StorageError::ConnectionLost
    }
}

#[derive(AsRefStr, Display, EnumString, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    #[strum(serialize = "180")]
    Low,
    #[default]
    #[strum(serialize = "360")]
    Medium,
    #[strum(serialize = "720")]
    High,
    #[strum(serialize = "1080")]
    UltraHigh,
}

#[derive(Clone)]
pub struct REST<S> {
    sender: S,
    settings: RestSettings,
    base_url: Url,
}

impl REST<ReqwestSendRequest> {
    pub fn new(settings: RestSettings) -> Result<Self, domain::StorageError> {
        let sender = ReqwestSendRequest::new(&settings)?;
        Self::with_sender(sender, settings)
    }
}

impl<S: SendRequest> REST<S> {
    pub fn with_sender(sender: S, settings: RestSettings) -> Result<Self, domain::StorageError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| domain::StorageError::Other(Box::new(err)))?;
        if base_url.cannot_be_a_base() {
            return Err(domain::StorageError::Other(
                format!("invalid base URL: {}", settings.base_url).into(),
            ));
        }
        Ok(Self {
            sender,
            settings,
            base_url,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &RestSettings {
        &self.settings
    }

    /// Returns the URL of the animated image showing the exercise.
    ///
    /// The URL carries the API key, as image requests cannot send custom headers.
    #[must_use]
    pub fn image_url(&self, id: &domain::ExerciseID, resolution: Resolution) -> Url {
        let mut url = self.url(&["image"], None);
        url.query_pairs_mut()
            .append_pair("exerciseId", id.as_str())
            .append_pair("resolution", resolution.as_ref())
            .append_pair("rapidapi-key", &self.settings.api_key);
        url
    }

    fn url(&self, segments: &[&str], cursor: Option<domain::Cursor>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if let Some(cursor) = cursor {
            url.query_pairs_mut()
                .append_pair("limit", &cursor.limit.to_string())
                .append_pair("offset", &cursor.offset.to_string());
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, domain::StorageError> {
        debug!("GET {url}");
        let mut request = Request::new(Method::GET, url);
        let headers = request.headers_mut();
        headers.insert(
            HeaderName::from_static("x-rapidapi-key"),
            header_value(&self.settings.api_key)?,
        );
        headers.insert(
            HeaderName::from_static("x-rapidapi-host"),
            header_value(&self.settings.host)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let response = self.sender.send_request(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(domain::StorageError::from_status(status.as_u16()));
        }
        let body = response.bytes().await.map_err(|err| transport_error(&err))?;
        serde_json::from_slice(&body).map_err(|err| domain::StorageError::Decoding(err.to_string()))
    }

    async fn get_exercises(
        &self,
        segments: &[&str],
        cursor: Option<domain::Cursor>,
    ) -> Result<Vec<domain::Exercise>, domain::StorageError> {
        Ok(self
            .get::<Vec<Exercise>>(self.url(segments, cursor))
            .await?
            .into_iter()
            .map(domain::Exercise::from)
            .collect())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, domain::StorageError> {
    HeaderValue::from_str(value).map_err(|err| domain::StorageError::Other(Box::new(err)))
}

impl<S: SendRequest> domain::RemoteCatalogRepository for REST<S> {
    async fn fetch_exercises(
        &self,
        cursor: Option<domain::Cursor>,
    ) -> Result<Vec<domain::Exercise>, domain::StorageError> {
        self.get_exercises(&["exercises"], cursor).await
    }

    async fn fetch_exercises_by_body_part(
        &self,
        body_part: &str,
        cursor: Option<domain::Cursor>,
    ) -> Result<Vec<domain::Exercise>, domain::StorageError> {
        self.get_exercises(&["exercises", "bodyPart", body_part], cursor)
            .await
    }

    async fn fetch_exercises_by_target(
        &self,
        target: &str,
        cursor: Option<domain::Cursor>,
    ) -> Result<Vec<domain::Exercise>, domain::StorageError> {
        self.get_exercises(&["exercises", "target", target], cursor)
            .await
    }

    async fn fetch_exercises_by_equipment(
        &self,
        equipment: &str,
        cursor: Option<domain::Cursor>,
    ) -> Result<Vec<domain::Exercise>, domain::StorageError> {
        self.get_exercises(&["exercises", "equipment", equipment], cursor)
            .await
    }

    async fn fetch_exercise(
        &self,
        id: &domain::ExerciseID,
    ) -> Result<domain::Exercise, domain::StorageError> {
        Ok(self
            .get::<Exercise>(self.url(&["exercises", "exercise", id.as_str()], None))
            .await?
            .into())
    }

    // The API offers no search, so the first page of the catalog is filtered instead.
    async fn search_exercises(
        &self,
        query: &str,
    ) -> Result<Vec<domain::Exercise>, domain::StorageError> {
        Ok(self
            .get_exercises(
                &["exercises"],
                Some(domain::Cursor::first(self.settings.search_limit)),
            )
            .await?
            .into_iter()
            .filter(|exercise| exercise.matches(query))
            .collect())
    }

    async fn fetch_body_parts(&self) -> Result<Vec<String>, domain::StorageError> {
        self.get(self.url(&["exercises", "bodyPartList"], None))
            .await
    }

    async fn fetch_targets(&self) -> Result<Vec<String>, domain::StorageError> {
        self.get(self.url(&["exercises", "targetList"], None)).await
    }

    async fn fetch_equipment(&self) -> Result<Vec<String>, domain::StorageError> {
        self.get(self.url(&["exercises", "equipmentList"], None))
            .await
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub body_part: String,
    pub target: String,
    pub equipment: String,
    #[serde(default)]
    pub secondary_muscles: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub category: String,
}

#[cfg(test)]
impl From<&domain::Exercise> for Exercise {
    fn from(value: &domain::Exercise) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name.clone(),
            body_part: value.body_part.to_string(),
            target: value.target.clone(),
            equipment: value.equipment.clone(),
            secondary_muscles: value.secondary_muscles.clone(),
            instructions: value.instructions.clone(),
            description: value.description.clone(),
            difficulty: value.difficulty.to_string(),
            category: value.category.to_string(),
        }
    }
}

impl From<Exercise> for domain::Exercise {
    fn from(value: Exercise) -> Self {
        Self {
            id: value.id.into(),
            name: value.name,
            body_part: domain::BodyPart::from_name(&value.body_part),
            target: value.target,
            equipment: value.equipment,
            secondary_muscles: value.secondary_muscles,
            instructions: value.instructions,
            description: value.description,
            difficulty: domain::Difficulty::from_name(&value.difficulty),
            category: domain::Category::from_name(&value.category),
        }
    }
}
