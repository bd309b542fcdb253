use serde::{Deserialize, Serialize};

use crate::schema::Setting;

const RETELL_BASE_URL: &str = "https://api.retellai.com";
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Internal shape of a voice-call request; adapters translate this into
/// whatever the provider expects.
#[derive(Debug, Clone, Serialize)]
pub struct CallRequest {
    pub to_number: String,
    pub from_number: Option<String>,
    /// Rendered script the agent speaks from.
    pub script: String,
    /// Named variables substituted by the provider at call time.
    pub variables: Vec<(String, String)>,
    /// Where the provider posts the final status and transcript.
    pub callback_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallHandle {
    pub call_id: String,
    pub call_status: String,
}

/// Boundary for the voice-AI calling provider. Blocking I/O edge; the
/// orchestrator isolates failures per patient.
#[async_trait::async_trait]
pub trait VoiceProvider: Send + Sync {
    async fn place_call(&self, api_key: &str, request: CallRequest) -> anyhow::Result<CallHandle>;
}

/// Resolve the voice-provider key from settings; a missing key fails the
/// dependent operation with a descriptive error instead of a silent no-op.
pub fn voice_config(settings: &Setting) -> anyhow::Result<(&str, Option<&str>)> {
    let api_key = settings
        .retell_api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("voice provider API key not configured"))?;
    Ok((api_key, settings.retell_from_number.as_deref()))
}

pub struct RetellClient {
    client: reqwest::Client,
    base_url: String,
}

impl RetellClient {
    pub fn new() -> Self {
        Self::with_base_url(RETELL_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self { client, base_url }
    }
}

impl Default for RetellClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VoiceProvider for RetellClient {
    async fn place_call(&self, api_key: &str, request: CallRequest) -> anyhow::Result<CallHandle> {
        let from_number = request
            .from_number
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no from number configured for voice calls"))?;

        let variables: serde_json::Map<String, serde_json::Value> = request
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        let body = serde_json::json!({
            "from_number": from_number,
            "to_number": request.to_number,
            "webhook_url": request.callback_url,
            "retell_llm_dynamic_variables": variables,
            "metadata": {
                "script": request.script,
            },
        });

        let response = self
            .client
            .post(format!("{}/v2/create-phone-call", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("voice provider returned {status}: {body}");
        }

        let handle: CallHandle = response.json().await?;
        Ok(handle)
    }
}
