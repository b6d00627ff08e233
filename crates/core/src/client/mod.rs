use std::{fmt, sync::Arc, time::Duration};

use reqwest::{
    Method, RequestBuilder, Response, StatusCode, Url,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{AppError, Result};

/// Credential source consulted on every request.
///
/// The session manager is the only implementor outside tests: it hands out
/// the currently attached bearer token and drops the session when the server
/// answers 401.
pub trait AuthHook: Send + Sync {
    fn bearer(&self) -> Option<String>;

    /// Called for every 401 response, before the error reaches the caller.
    fn unauthorized(&self, message: &str);
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Server(String),
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(alias = "error")]
    message: String,
}

/// JSON client for the FinanceX API.
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
    auth: Arc<dyn AuthHook>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration, auth: Arc<dyn AuthHook>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AppError::Setting(format!("invalid base_url: {err}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url,
            http,
            auth,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, ClientError> {
        let req = self.request(Method::GET, path)?;
        self.send_json(req).await
    }

    pub async fn get_with<Q, T>(&self, path: &str, query: &Q) -> std::result::Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(Method::GET, path)?.query(query);
        self.send_json(req).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> std::result::Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(Method::POST, path)?.json(body);
        self.send_json(req).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> std::result::Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(Method::PUT, path)?.json(body);
        self.send_json(req).await
    }

    /// Deletes a resource; any success body is ignored.
    pub async fn delete(&self, path: &str) -> std::result::Result<(), ClientError> {
        let req = self.request(Method::DELETE, path)?;
        self.send(req).await.map(|_| ())
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, ClientError> {
        let raw = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|err| ClientError::Server(format!("invalid url {raw}: {err}")))
    }

    fn request(&self, method: Method, path: &str) -> std::result::Result<RequestBuilder, ClientError> {
        let endpoint = self.endpoint(path)?;
        tracing::debug!("{method} {endpoint}");

        let mut req = self.http.request(method, endpoint);
        if let Some(token) = self.auth.bearer() {
            req = req.bearer_auth(token);
        }
        Ok(req)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> std::result::Result<T, ClientError> {
        let res = self.send(req).await?;
        res.json::<T>().await.map_err(ClientError::Transport)
    }

    async fn send(&self, req: RequestBuilder) -> std::result::Result<Response, ClientError> {
        let res = req.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let message = res
            .json::<ErrorResponse>()
            .await
            .map(|err| err.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        tracing::debug!("request failed with {status}: {message}");

        Err(self.classify(status, message))
    }

    fn classify(&self, status: StatusCode, message: String) -> ClientError {
        match status.as_u16() {
            401 => {
                self.auth.unauthorized(&message);
                ClientError::Unauthorized(message)
            }
            403 => ClientError::Forbidden(message),
            404 => ClientError::NotFound(message),
            409 => ClientError::Conflict(message),
            400 | 422 => ClientError::Validation(message),
            _ => ClientError::Server(message),
        }
    }
}
