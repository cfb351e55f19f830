//! Schedule backend client: password-grant login and schedule fetch.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use serde::Deserialize;
use shiftfeed_core::config::{ENV_API_HOST, ENV_API_KEY};
use shiftfeed_core::{ApiConfig, ConfigError};
use tracing::instrument;
use url::Url;

use crate::error::ScheduleError;
use crate::types::RawShift;

const LOGIN_PATH: &str = "auth/v1/token";
const SCHEDULES_PATH: &str = "rest/v1/schedules";

const SCHEDULE_COLUMNS: &str =
    "startTime,endTime,role,store,department,workDate,id,duration,status,updated_at";
const SCHEDULE_ORDER: &str = "startTime.asc.nullslast";

const CLIENT_ID: &str = concat!(
    "shiftfeed/",
    env!("CARGO_PKG_VERSION"),
    ", ",
    env!("CARGO_PKG_REPOSITORY")
);

/// Response body of the token endpoint. Only the access token is used.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Result of [`ScheduleClient::fetch_with_relogin`].
#[derive(Debug)]
pub struct FetchOutcome {
    pub shifts: Vec<RawShift>,
    /// Token the schedule was fetched with
    pub token: String,
    /// Whether a fresh login replaced the cached token
    pub fresh_login: bool,
}

pub struct ScheduleClient {
    client: reqwest::Client,
    base_url: Url,
    api: ApiConfig,
}

impl ScheduleClient {
    /// Client for `https://<api.host>`.
    pub fn new(api: &ApiConfig) -> Result<Self, ScheduleError> {
        Self::with_base_url(api, &format!("https://{}", api.host))
    }

    /// Client for an explicit base URL, e.g. a local mock server.
    pub fn with_base_url(api: &ApiConfig, base_url: &str) -> Result<Self, ScheduleError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ConfigError::invalid(ENV_API_HOST, format!("{}: {}", base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .default_headers(common_headers(&api.api_key)?)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api: api.clone(),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ScheduleError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ConfigError::invalid(ENV_API_HOST, e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Exchange the configured credentials for a session token.
    #[instrument(skip(self), level = "info")]
    pub async fn login(&self) -> Result<String, ScheduleError> {
        let url = self.endpoint(LOGIN_PATH, &[("grant_type", "password")])?;

        // Sent as text/plain like every other request, so no `.json()`
        let body = serde_json::json!({
            "email": self.api.username,
            "password": self.api.password,
        });

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, bearer(&self.api.api_key))
            .body(body.to_string())
            .send()
            .await?;

        let token: TokenResponse = self.handle_response(response).await.map_err(|e| match e {
            ScheduleError::Api { status, body } if (400..500).contains(&status) => {
                ScheduleError::Auth(format!("{}: {}", status, body))
            }
            other => other,
        })?;

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => {
                tracing::debug!(expires_in = ?token.expires_in, "Obtained session token");
                Ok(access_token)
            }
            _ => Err(ScheduleError::Auth(
                "token response did not contain an access token".to_string(),
            )),
        }
    }

    /// Fetch every schedule record visible to `token`.
    #[instrument(skip_all, level = "info")]
    pub async fn fetch_schedule(&self, token: &str) -> Result<Vec<RawShift>, ScheduleError> {
        let url = self.endpoint(
            SCHEDULES_PATH,
            &[("select", SCHEDULE_COLUMNS), ("order", SCHEDULE_ORDER)],
        )?;

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, bearer(token))
            .send()
            .await?;

        let shifts: Vec<RawShift> = self.handle_response(response).await?;
        tracing::debug!(count = shifts.len(), "Fetched schedule");
        Ok(shifts)
    }

    /// Fetch the schedule with the cached token if there is one, falling back
    /// to a single fresh login and retry when that fails for any reason.
    pub async fn fetch_with_relogin(
        &self,
        cached_token: Option<&str>,
    ) -> Result<FetchOutcome, ScheduleError> {
        if let Some(token) = cached_token.filter(|t| !t.is_empty()) {
            tracing::info!("Attempting to use cached token");
            match self.fetch_schedule(token).await {
                Ok(shifts) => {
                    return Ok(FetchOutcome {
                        shifts,
                        token: token.to_string(),
                        fresh_login: false,
                    })
                }
                Err(e) if e.should_relogin() => {
                    tracing::info!("Cached token rejected: {}", e);
                }
                Err(e) => {
                    tracing::warn!("Fetch with cached token failed: {}", e);
                }
            }
        }

        tracing::info!("Logging in");
        let token = self.login().await?;
        let shifts = self.fetch_schedule(&token).await?;

        Ok(FetchOutcome {
            shifts,
            token,
            fresh_login: true,
        })
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ScheduleError> {
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            serde_json::from_slice(&bytes)
                .map_err(|e| ScheduleError::InvalidResponse(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            let text = response.text().await.unwrap_or_default();
            Err(ScheduleError::Auth(format!("{}: {}", status, text)))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ScheduleError::Api {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Headers sent with every request.
fn common_headers(api_key: &str) -> Result<HeaderMap, ScheduleError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_ID));
    headers.insert(
        HeaderName::from_static("x-client-info"),
        HeaderValue::from_static(CLIENT_ID),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain;charset=UTF-8"),
    );

    let mut key = HeaderValue::from_str(api_key)
        .map_err(|_| ConfigError::invalid(ENV_API_KEY, "API key is not a valid header value"))?;
    key.set_sensitive(true);
    headers.insert(HeaderName::from_static("apikey"), key);

    Ok(headers)
}
