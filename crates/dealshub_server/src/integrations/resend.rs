//! Transactional email through Resend.

use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::json;

use super::{IntegrationResult, ensure_success, http_client};

const RESEND_URL: &str = "https://api.resend.com/emails";
const RESEND_TIMEOUT: Duration = Duration::from_secs(15);
const MAGIC_LINK_SUBJECT: &str = "Your Magic Login Link";

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_magic_link(
        &self,
        to: &str,
        display_name: &str,
        link: &str,
    ) -> IntegrationResult<()>;
}

pub struct ResendMailer {
    client: Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> IntegrationResult<Self> {
        Ok(Self {
            client: http_client(RESEND_TIMEOUT)?,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_magic_link(
        &self,
        to: &str,
        display_name: &str,
        link: &str,
    ) -> IntegrationResult<()> {
        let response = self
            .client
            .post(RESEND_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": MAGIC_LINK_SUBJECT,
                "html": magic_link_html(display_name, link),
            }))
            .send()
            .await?;
        ensure_success("resend", response)?;
        info!("event=magic_link_email module=mailer status=ok");
        Ok(())
    }
}

/// Login email body; the link expires with the token.
pub fn magic_link_html(display_name: &str, link: &str) -> String {
    format!(
        r#"<div style="font-family:sans-serif;max-width:480px">
  <h2>Magic Link Login</h2>
  <p>Hello {name},</p>
  <p>Click below to securely log in:</p>
  <a href="{link}" style="padding:12px 20px;background:#4E61D3;color:#fff;border-radius:6px;text-decoration:none">Log In</a>
  <p style="margin-top:12px;font-size:12px;color:#666">This link expires in 10 minutes.</p>
</div>"#,
        name = escape_html(display_name),
        link = escape_html(link),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::magic_link_html;

    #[test]
    fn email_body_escapes_display_name() {
        let html = magic_link_html("<b>ada</b>", "https://api.test/verify?token=abc");
        assert!(html.contains("&lt;b&gt;ada&lt;/b&gt;"));
        assert!(html.contains("https://api.test/verify?token=abc"));
    }
}
