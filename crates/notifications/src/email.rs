use anyhow::Context;

/// Recipient of a NotificationEmail.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Recipient {
    pub email: String,
    pub full_name: Option<String>,
}

/// NotificationEmail is a fully-rendered email, ready to send.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NotificationEmail {
    /// Derived from the Notification, so that the same Notification is
    /// never emailed twice by a provider which honors idempotency keys.
    pub idempotency_key: String,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
}

pub trait EmailSender: std::fmt::Debug + Send + Sync + 'static {
    fn send<'s>(
        &'s self,
        email: NotificationEmail,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailConfig {
    /// API key of the Resend account. When unset, emails are not sent.
    /// The API's base URL may be overridden through `RESEND_BASE_URL`.
    #[serde(skip_serializing)]
    pub resend_api_key: Option<String>,
    pub from_address: String,
    pub reply_to_address: Option<String>,
    /// Product name used in subjects and the email layout.
    pub product_name: String,
    /// Link to the dashboard included in the email layout.
    pub dashboard_url: Option<url::Url>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from_address: "Sobri'Up <notifications@sobriup.fr>".to_string(),
            reply_to_address: None,
            product_name: "Sobri'Up".to_string(),
            dashboard_url: None,
        }
    }
}

/// Sends emails using Resend.
#[derive(Debug)]
pub struct ResendSender {
    from_address: String,
    reply_to_address: Option<String>,
    resend_client: resend_rs::Resend,
    retry_options: resend_rs::rate_limit::RetryOptions,
}

impl ResendSender {
    fn request(
        &self,
        email: &NotificationEmail,
    ) -> resend_rs::idempotent::Idempotent<resend_rs::types::CreateEmailBaseOptions> {
        let mut request = resend_rs::types::CreateEmailBaseOptions::new(
            &self.from_address,
            [email.recipient.email.as_str()],
            &email.subject,
        )
        .with_html(email.body.as_str());

        if let Some(reply_to) = &self.reply_to_address {
            request = request.with_reply(reply_to.as_str());
        }
        request.with_idempotency_key(email.idempotency_key.as_str())
    }

    async fn send(&self, email: NotificationEmail) -> anyhow::Result<()> {
        let request = self.request(&email);
        let Self {
            resend_client,
            retry_options,
            ..
        } = self;

        // Emails of a single dispatch go out in quick succession,
        // and Resend rate-limits them.
        let response = resend_rs::rate_limit::send_with_retry_opts(
            || async { resend_client.emails.send(request.clone()).await },
            retry_options,
        )
        .await
        .context("calling resend API")?;

        tracing::debug!(
            idempotency_key = %email.idempotency_key,
            to = %email.recipient.email,
            email_id = %response.id,
            "successfully sent notification email"
        );
        Ok(())
    }
}

#[derive(Debug)]
pub enum Sender {
    Disabled,
    Resend(ResendSender),
}

impl Sender {
    /// Resend sender over `http`, whose timeouts bound each API call.
    pub fn resend(config: &EmailConfig, api_key: &str, http: reqwest::Client) -> Sender {
        Sender::Resend(ResendSender {
            from_address: config.from_address.clone(),
            reply_to_address: config.reply_to_address.clone(),
            resend_client: resend_rs::Resend::with_client(api_key, http),
            retry_options: resend_rs::rate_limit::RetryOptions {
                duration_ms: 150,
                jitter_range_ms: 0..1000,
                max_retries: 5,
            },
        })
    }

    /// Sender of `config`, which is Disabled if no API key is configured.
    pub fn from_config(config: &EmailConfig, http: reqwest::Client) -> Sender {
        match &config.resend_api_key {
            Some(api_key) if !api_key.is_empty() => Self::resend(config, api_key, http),
            _ => Sender::Disabled,
        }
    }
}

impl EmailSender for Sender {
    async fn send<'s>(&'s self, email: NotificationEmail) -> anyhow::Result<()> {
        match self {
            Sender::Disabled => {
                tracing::warn!(
                    to = %email.recipient.email,
                    subject = %email.subject,
                    idempotency_key = %email.idempotency_key,
                    "skipping sending notification email (disabled)"
                );
                Ok(())
            }
            Sender::Resend(resend) => resend.send(email).await,
        }
    }
}
