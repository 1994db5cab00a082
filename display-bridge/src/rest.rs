//! REST calls back into the queue server
//!
//! Device-originated signals become the same HTTP operations the staff
//! console uses. Errors are logged and swallowed; the device keeps working
//! off the next event or poll.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::json;
use shared::models::{QueueDetail, Ticket};

use crate::config::BridgeConfig;

pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    queue_id: i64,
    queue_token: String,
}

impl ApiClient {
    pub fn new(config: &BridgeConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| anyhow::anyhow!("invalid API_TOKEN: {e}"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            base: config.api_url.trim_end_matches('/').to_string(),
            queue_id: config.queue_id,
            queue_token: config.queue_token.clone(),
        })
    }

    /// Full-state poll: the queue with all its tickets
    pub async fn queue_detail(&self) -> anyhow::Result<QueueDetail> {
        let detail = self
            .http
            .get(format!("{}/api/queues/{}", self.base, self.queue_id))
            .send()
            .await?
            .error_for_status()?
            .json::<QueueDetail>()
            .await?;
        Ok(detail)
    }

    pub async fn call_next(&self) {
        let result = self
            .http
            .post(format!("{}/api/queues/{}/call-next", self.base, self.queue_id))
            .json(&json!({}))
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => tracing::info!("call-next OK"),
            Ok(resp) => tracing::error!("call-next failed: {}", resp.status()),
            Err(e) => tracing::error!("call-next failed: {e}"),
        }
    }

    /// Resolve a ticket (staff-mode auto-advance)
    pub async fn update_status(&self, ticket_id: i64, status: &str, reason: &str) {
        let result = self
            .http
            .put(format!("{}/api/tickets/{ticket_id}/status", self.base))
            .json(&json!({ "status": status, "reason": reason }))
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(ticket_id, status, "current ticket resolved")
            }
            Ok(resp) => tracing::error!("update status failed: {}", resp.status()),
            Err(e) => tracing::error!("update status failed: {e}"),
        }
    }

    /// Claim a ticket with device-synthesized holder info (kiosk mode)
    pub async fn claim_kiosk_ticket(&self, holder_code: &str) {
        let result = self
            .http
            .post(format!("{}/api/queues/{}/tickets", self.base, self.queue_id))
            .json(&json!({
                "holder_name": "Kiosk",
                "holder_code": holder_code,
                "token": self.queue_token,
            }))
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<Ticket>().await {
                Ok(ticket) => tracing::info!(number = ticket.number, "kiosk ticket created"),
                Err(e) => tracing::error!("create ticket: bad response body: {e}"),
            },
            Ok(resp) => tracing::error!("create ticket failed: {}", resp.status()),
            Err(e) => tracing::error!("create ticket failed: {e}"),
        }
    }
}
