use serde::Deserialize;

use crate::schema::Setting;

const TWILIO_BASE_URL: &str = "https://api.twilio.com";
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

/// Credentials resolved from the settings row; absence of any field fails
/// the send with a descriptive error rather than a silent no-op.
#[derive(Debug, Clone)]
pub struct MessagingCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl MessagingCredentials {
    pub fn from_settings(settings: &Setting) -> anyhow::Result<Self> {
        if !settings.whatsapp_enabled {
            anyhow::bail!("WhatsApp messaging is disabled in settings");
        }
        let account_sid = settings
            .twilio_account_sid
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("messaging provider account SID not configured"))?;
        let auth_token = settings
            .twilio_auth_token
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("messaging provider auth token not configured"))?;
        let from_number = settings
            .twilio_phone_number
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("messaging provider phone number not configured"))?;
        Ok(Self {
            account_sid,
            auth_token,
            from_number,
        })
    }
}

/// Boundary for the WhatsApp/SMS messaging provider.
#[async_trait::async_trait]
pub trait MessageProvider: Send + Sync {
    /// Send a rendered body to a destination number; returns the provider's
    /// message id for later status-webhook correlation.
    async fn send_whatsapp(
        &self,
        credentials: &MessagingCredentials,
        to: &str,
        body: &str,
    ) -> anyhow::Result<String>;
}

pub struct TwilioClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

impl TwilioClient {
    pub fn new() -> Self {
        Self::with_base_url(TWILIO_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self { client, base_url }
    }
}

impl Default for TwilioClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MessageProvider for TwilioClient {
    async fn send_whatsapp(
        &self,
        credentials: &MessagingCredentials,
        to: &str,
        body: &str,
    ) -> anyhow::Result<String> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, credentials.account_sid
        );

        let params = [
            ("From", format!("whatsapp:{}", credentials.from_number)),
            ("To", format!("whatsapp:{}", format_phone_for_whatsapp(to))),
            ("Body", body.to_string()),
        ];

        let response = self
            .client
            .post(url)
            .basic_auth(&credentials.account_sid, Some(&credentials.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("messaging provider returned {status}: {body}");
        }

        let message: TwilioMessageResponse = response.json().await?;
        Ok(message.sid)
    }
}

/// Canonicalize a stored phone number into E.164 for WhatsApp addressing.
/// Numbers without a country code default to US, matching intake behavior.
pub fn format_phone_for_whatsapp(phone: &str) -> String {
    let digits = digits_only(phone);
    if digits.starts_with('1') {
        format!("+{digits}")
    } else {
        format!("+1{digits}")
    }
}

/// Strip everything but digits; inbound webhook numbers are matched against
/// stored patients on this form.
pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}
