use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::canonical_json::canonical_json;

type HmacSha256 = Hmac<Sha256>;

/// Computes `HMAC-SHA256(secret, canonical_json(payload))`, lowercase hex,
/// prefixed the way `X-Webhook-Signature` expects it.
pub fn sign(secret: &str, canonical: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(canonical.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Outbound webhook sender for triggered incidents. Failures (non-200,
/// transport errors) are recorded on the [`gateway_types::Incident`] and
/// never propagate to the caller.
pub struct WebhookClient {
    client: reqwest::Client,
    url: Option<String>,
    secret: Option<String>,
}

impl WebhookClient {
    pub fn new(url: Option<String>, secret: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        WebhookClient {
            client,
            url: url.filter(|u| !u.is_empty()),
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Posts `payload` and returns `(sent, response_code)`. `sent` is true
    /// only on a 2xx response; every other outcome (4xx/5xx, timeout,
    /// connection refused) resolves to `(false, code_or_zero)`.
    pub async fn send(&self, incident_id: &str, payload: &serde_json::Value) -> (bool, u16) {
        let Some(url) = &self.url else {
            return (false, 0);
        };

        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("X-Gateway-Event", "alert")
            .header("X-Incident-ID", incident_id);

        if let Some(secret) = &self.secret {
            let signature = sign(secret, &canonical_json(payload));
            request = request.header("X-Webhook-Signature", signature);
        }

        match request.json(payload).send().await {
            Ok(resp) => {
                let code = resp.status().as_u16();
                (resp.status().is_success(), code)
            }
            Err(err) => {
                tracing::warn!(incident_id = %incident_id, error = %err, "incident webhook request failed");
                (false, 0)
            }
        }
    }
}
