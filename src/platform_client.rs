use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use crate::error::PlatformError;
use crate::types::{
    ApiErrorBody, App, AppCreateRequest, AppHandle, AppResponse, AppStatus, DeploymentSpec,
};

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The remote application platform: create an app, then look it up by id.
#[allow(async_fn_in_trait)]
pub trait PlatformClient {
    async fn create(&self, spec: &DeploymentSpec) -> Result<AppHandle, PlatformError>;
    async fn get(&self, app: &AppHandle) -> Result<AppStatus, PlatformError>;
}

/// DigitalOcean App Platform over its public REST API.
#[derive(Clone)]
pub struct DigitalOceanClient {
    client: Client,
    base_url: String,
    token: String,
}

impl DigitalOceanClient {
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("do-deployer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, token, base_url))
    }

    /// Use a preconfigured HTTP client, e.g. one with custom proxy settings.
    pub fn with_client(
        client: Client,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn apps_url(&self) -> String {
        format!("{}/v2/apps", self.base_url)
    }

    async fn read_app(response: reqwest::Response) -> Result<App, PlatformError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        let parsed: AppResponse =
            serde_json::from_str(&body).map_err(|e| PlatformError::Decode(e.to_string()))?;
        Ok(parsed.app)
    }
}

impl PlatformClient for DigitalOceanClient {
    async fn create(&self, spec: &DeploymentSpec) -> Result<AppHandle, PlatformError> {
        let request = AppCreateRequest::from(spec);
        debug!("POST {} for app '{}'", self.apps_url(), spec.app_name);

        let response = self
            .client
            .post(self.apps_url())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let app = Self::read_app(response).await?;
        info!("Created app '{}' with id {}", spec.app_name, app.id);
        Ok(AppHandle(app.id))
    }

    async fn get(&self, app: &AppHandle) -> Result<AppStatus, PlatformError> {
        let url = format!("{}/{}", self.apps_url(), app.id());
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let app = Self::read_app(response).await?;
        Ok(AppStatus {
            live_url: app.live_url.unwrap_or_default(),
        })
    }
}

fn api_error(status: u16, body: &str) -> PlatformError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    PlatformError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_uses_message_field() {
        let err = api_error(401, r#"{"id":"unauthorized","message":"Unable to authenticate you"}"#);
        assert_eq!(
            err,
            PlatformError::Api {
                status: 401,
                message: "Unable to authenticate you".to_string(),
            }
        );
    }

    #[test]
    fn test_api_error_falls_back_to_raw_body() {
        let err = api_error(502, "  Bad Gateway\n");
        assert_eq!(
            err,
            PlatformError::Api {
                status: 502,
                message: "Bad Gateway".to_string(),
            }
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = DigitalOceanClient::new("token", "http://localhost:1234/").unwrap();
        assert_eq!(client.apps_url(), "http://localhost:1234/v2/apps");
    }
}
