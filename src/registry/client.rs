use super::{CompatibilityLevel, RegisteredSchema, SchemaRegistry};
use crate::config::RegistryConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const SCHEMA_REGISTRY_ACCEPT: &str = "application/vnd.schemaregistry.v1+json, application/json";

/// Confluent-compatible schema registry REST client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<(String, Option<String>)>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    id: i64,
}

#[derive(Debug, Serialize)]
struct CompatibilityRequest {
    compatibility: CompatibilityLevel,
}

#[derive(Debug, Deserialize)]
struct RegistryErrorBody {
    error_code: i64,
    message: String,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            Error::Config(format!("Invalid schema registry url '{}': {}", config.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Schema registry url '{}' cannot be used as a base url",
                config.url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            credentials: config.basic_auth_user_info.as_deref().map(split_user_info),
        })
    }

    /// Appends percent-encoded path segments to the registry base url.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(ACCEPT, SCHEMA_REGISTRY_ACCEPT);

        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, password.as_ref()),
            None => builder,
        }
    }
}

#[async_trait]
impl SchemaRegistry for RegistryClient {
    #[instrument(skip(self), fields(registry = %self.base_url))]
    async fn fetch_schema_by_id(&self, id: u32) -> Result<RegisteredSchema> {
        let url = self.endpoint(&["schemas", "ids", &id.to_string()]);
        let response = self.request(Method::GET, url).send().await?;

        read_response(response, || format!("schema id {}", id)).await
    }

    #[instrument(skip(self, schema), fields(registry = %self.base_url))]
    async fn register_schema(&self, subject: &str, schema: &RegisteredSchema) -> Result<u32> {
        let url = self.endpoint(&["subjects", subject, "versions"]);
        let response = self.request(Method::POST, url).json(schema).send().await?;

        let context = || format!("register under subject '{}'", subject);
        let registered: RegisterResponse = read_response(response, context).await?;

        u32::try_from(registered.id).map_err(|_| Error::RegistryLookup {
            context: context(),
            message: format!("registry returned out of range schema id {}", registered.id),
        })
    }

    #[instrument(skip(self), fields(registry = %self.base_url))]
    async fn set_subject_compatibility(
        &self,
        subject: &str,
        level: CompatibilityLevel,
    ) -> Result<()> {
        let url = self.endpoint(&["config", subject]);
        let response = self
            .request(Method::PUT, url)
            .json(&CompatibilityRequest {
                compatibility: level,
            })
            .send()
            .await?;

        let _: serde_json::Value =
            read_response(response, || format!("compatibility of subject '{}'", subject)).await?;
        debug!("Set compatibility of subject '{}' to {}", subject, level);
        Ok(())
    }
}

async fn read_response<T, F>(response: Response, context: F) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> String,
{
    let status = response.status();
    if status.is_success() {
        let body = response.bytes().await?;
        return Ok(serde_json::from_slice(&body)?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::RegistryLookup {
        context: context(),
        message: describe_failure(status, &body),
    })
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<RegistryErrorBody>(body) {
        Ok(err) => format!("{} (error code {}, HTTP {})", err.message, err.error_code, status.as_u16()),
        Err(_) if body.is_empty() => format!("HTTP {}", status),
        Err(_) => format!("HTTP {}: {}", status, body),
    }
}

/// Splits `user:password` the way `basic.auth.user.info` is written.
fn split_user_info(info: &str) -> (String, Option<String>) {
    match info.split_once(':') {
        Some((user, password)) => (user.to_string(), Some(password.to_string())),
        None => (info.to_string(), None),
    }
}
