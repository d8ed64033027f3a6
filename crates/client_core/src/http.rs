use async_trait::async_trait;
use reqwest::Client;
use shared::{
    error::ApiError,
    protocol::{ServiceCall, ServiceReply},
};
use tracing::debug;
use url::Url;

use crate::{
    error::{ServiceError, ServiceResult},
    service::RemoteService,
};

/// Posts each [`ServiceCall`] as JSON to `{backend_host}/rpc/{canister_id}`.
pub struct HttpRemoteService {
    http: Client,
    endpoint: Url,
}

impl HttpRemoteService {
    pub fn new(backend_host: &str, canister_id: &str) -> ServiceResult<Self> {
        let base = if backend_host.starts_with("http://") || backend_host.starts_with("https://")
        {
            backend_host.trim_end_matches('/').to_string()
        } else {
            return Err(ServiceError::Transport(format!(
                "backend host must start with http:// or https://: {backend_host}"
            )));
        };
        let endpoint = Url::parse(&format!("{base}/rpc/{canister_id}"))
            .map_err(|err| ServiceError::Transport(format!("invalid backend endpoint: {err}")))?;

        Ok(Self {
            http: Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn call(&self, call: ServiceCall) -> ServiceResult<ServiceReply> {
        let name = call.name();
        debug!(call = name, endpoint = %self.endpoint, "rpc: sending call");

        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&call)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() {
                    ServiceError::Unavailable
                } else {
                    ServiceError::Transport(err.to_string())
                }
            })?;

        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        if status.is_success() {
            return serde_json::from_slice::<ServiceReply>(&body)
                .map_err(|err| ServiceError::Decode(format!("{name}: {err}")));
        }

        match serde_json::from_slice::<ApiError>(&body) {
            Ok(err) => Err(ServiceError::Rejected(err)),
            Err(_) => Err(ServiceError::Transport(format!(
                "{name} failed with status {status}"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
