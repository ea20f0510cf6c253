//! HTTP client for an NGSI-LD context broker (Orion-LD, Scorpio, Stellio).

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::wire::{self, StatusPatch};
use crate::config::BrokerConfig;
use crate::domain::ports::EntityStoreClient;
use crate::domain::spot::{Spot, SpotStatus};
use crate::shared::errors::{DispatchError, DispatchResult};

const LD_JSON: &str = "application/ld+json";

/// [`EntityStoreClient`] backed by the broker's `/entities` API.
///
/// Every call is bounded by the configured request timeout; a call that
/// runs past it fails with `UpstreamUnavailable`.
#[derive(Clone)]
pub struct NgsiLdStoreClient {
    base_url: Url,
    spot_type: String,
    page_size: usize,
    context_link: Option<String>,
    client: reqwest::Client,
}

impl NgsiLdStoreClient {
    pub fn new(config: &BrokerConfig) -> DispatchResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DispatchError::Validation(format!("invalid broker url '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DispatchError::Validation(format!(
                "broker url '{}' cannot carry a path",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DispatchError::UpstreamUnavailable(format!("http client init: {e}")))?;

        Ok(Self {
            base_url,
            spot_type: config.spot_type.clone(),
            page_size: config.page_size.max(1),
            context_link: config.context_link.clone(),
            client,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn with_context(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.context_link {
            Some(link) => request.header(header::LINK, link),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> DispatchResult<Response> {
        self.with_context(request)
            .send()
            .await
            .map_err(transport_error)
    }

    /// Page through `GET /entities` for spot entities, keeping store order.
    ///
    /// Stops on a short page, or on a full page that adds no unseen spot
    /// (a broker that ignores `offset` keeps serving the first page).
    async fn query_spots(&self, q: Option<String>) -> DispatchResult<Vec<Spot>> {
        let mut spots = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = 0usize;

        loop {
            let mut params = vec![
                ("type", self.spot_type.clone()),
                ("limit", self.page_size.to_string()),
                ("offset", offset.to_string()),
            ];
            if let Some(q) = &q {
                params.push(("q", q.clone()));
            }

            let request = self
                .client
                .get(self.url(&["entities"]))
                .header(header::ACCEPT, LD_JSON)
                .query(&params);
            let response = classify(self.send(request).await?, "Entity", &self.spot_type).await?;
            let page: Vec<Value> = response.json().await.map_err(|e| {
                DispatchError::UpstreamUnavailable(format!("invalid entity list: {e}"))
            })?;

            let fetched = page.len();
            let before = spots.len();
            spots.extend(
                page.iter()
                    .filter_map(wire::parse_spot)
                    .filter(|spot| seen.insert(spot.id.clone())),
            );
            let added = spots.len() - before;
            debug!(offset, fetched, added, "Fetched spot page");

            if fetched < self.page_size {
                break;
            }
            if added == 0 {
                warn!(offset, fetched, "Broker returned a full page with no new spots, stopping");
                break;
            }
            offset += fetched;
        }

        Ok(spots)
    }
}

#[async_trait]
impl EntityStoreClient for NgsiLdStoreClient {
    async fn list_spots(&self) -> DispatchResult<Vec<Spot>> {
        self.query_spots(None).await
    }

    async fn list_garage_spots(&self, garage_id: &str) -> DispatchResult<Vec<Spot>> {
        self.query_spots(Some(format!("{}==\"{}\"", wire::GARAGE_REF_ATTR, garage_id)))
            .await
    }

    async fn get_spot(&self, spot_id: &str) -> DispatchResult<Spot> {
        let request = self
            .client
            .get(self.url(&["entities", spot_id]))
            .header(header::ACCEPT, LD_JSON);
        let response = classify(self.send(request).await?, "ParkingSpot", spot_id).await?;
        let entity: Value = response.json().await.map_err(|e| {
            DispatchError::UpstreamUnavailable(format!("invalid entity body for {spot_id}: {e}"))
        })?;

        wire::parse_spot(&entity).ok_or_else(|| {
            DispatchError::UpstreamUnavailable(format!("entity {spot_id} returned without id"))
        })
    }

    async fn update_spot_status(
        &self,
        spot_id: &str,
        status: SpotStatus,
        modified_at: DateTime<Utc>,
    ) -> DispatchResult<()> {
        let request = self
            .client
            .patch(self.url(&["entities", spot_id, "attrs"]))
            .json(&StatusPatch::new(status, modified_at));
        classify(self.send(request).await?, "ParkingSpot", spot_id).await?;
        debug!(spot_id, %status, "Spot status updated in broker");
        Ok(())
    }

    async fn create_entity(&self, entity: Value) -> DispatchResult<()> {
        let id = entity
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let request = self.client.post(self.url(&["entities"])).json(&entity);
        classify(self.send(request).await?, "Entity", &id).await?;
        Ok(())
    }

    async fn delete_entity(&self, entity_id: &str) -> DispatchResult<()> {
        let request = self.client.delete(self.url(&["entities", entity_id]));
        classify(self.send(request).await?, "Entity", entity_id).await?;
        Ok(())
    }

    async fn ping(&self) -> DispatchResult<()> {
        let request = self
            .client
            .get(self.url(&["entities"]))
            .header(header::ACCEPT, LD_JSON)
            .query(&[("type", self.spot_type.as_str()), ("limit", "1")]);
        classify(self.send(request).await?, "Entity", &self.spot_type).await?;
        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> DispatchError {
    if e.is_timeout() {
        DispatchError::UpstreamUnavailable(format!("broker request timed out: {e}"))
    } else {
        DispatchError::UpstreamUnavailable(format!("broker request failed: {e}"))
    }
}

/// Map a broker response onto the port's error taxonomy.
async fn classify(response: Response, entity: &'static str, id: &str) -> DispatchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = error_detail(response).await;
    warn!(%status, entity, id, detail = %detail, "Broker rejected request");

    Err(match status {
        StatusCode::NOT_FOUND => DispatchError::NotFound {
            entity,
            id: id.to_string(),
        },
        s if s.is_client_error() => DispatchError::ConflictOrRejected {
            status: s.as_u16(),
            detail,
        },
        s => DispatchError::UpstreamUnavailable(format!("broker answered {s}: {detail}")),
    })
}

/// NGSI-LD problem details carry `title`/`detail`; fall back to raw text.
async fn error_detail(response: Response) -> String {
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return format!("unreadable error body: {e}"),
    };

    serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .or_else(|| value.get("title"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string())
}

// ── Tests ──────────────────────────────────────────────────────
