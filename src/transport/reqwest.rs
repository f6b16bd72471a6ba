use reqwest::Client;

use super::{Transport, TransportError, TransportRequest, TransportResponse, SYNC_PATH};

/// The default production [`Transport`], backed by the `reqwest` crate.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh, default-configured `reqwest::Client`.
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Wraps an existing `reqwest::Client`, e.g. one configured with custom TLS roots.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = format!("{}/{SYNC_PATH}", request.homeserver_url.trim_end_matches('/'));

        let mut query = Vec::new();
        if let Some(pos) = &request.query.pos {
            query.push(("pos", pos.clone()));
        }
        if let Some(timeout_ms) = request.query.timeout_ms {
            query.push(("timeout", timeout_ms.to_string()));
        }
        if let Some(set_presence) = request.query.set_presence {
            query.push(("set_presence", set_presence.to_string()));
        }

        let response = self
            .client
            .post(url)
            .bearer_auth(&request.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .query(&query)
            .body(request.body)
            .send()
            .await
            .map_err(|err| TransportError::Send(Box::new(err)))?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|err| TransportError::Send(Box::new(err)))?.to_vec();

        Ok(TransportResponse { status, body })
    }
}
