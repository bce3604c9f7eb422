//! Mail delivery via the Microsoft Graph API.
//!
//! Authentication is the OAuth 2.0 client-credentials flow against Azure AD.
//! A fresh token is acquired for every delivery; tokens are never cached
//! across runs.
//!
//! The [`Mailer`] trait is the seam between report formatting and transport,
//! so the reporter can be exercised without network access.

use serde::{Deserialize, Serialize};

use crate::config::EmailSettings;

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
const GRAPH_SENDMAIL_BASE: &str = "https://graph.microsoft.com/v1.0/users";
const LOGIN_BASE: &str = "https://login.microsoftonline.com";

/// Sends one rendered report to a recipient list.
pub trait Mailer {
    /// Deliver an HTML mail.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] when the token handshake or the send call
    /// fails; callers downgrade this to a logged boolean failure.
    fn send(
        &self,
        subject: &str,
        html_body: &str,
        recipients: &[String],
    ) -> Result<(), DeliveryError>;
}

/// Transport failures during delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The client-credentials token handshake failed.
    #[error("Failed to acquire token: {0}")]
    Token(String),

    /// The sendMail request itself failed.
    #[error("sendMail request failed: {0}")]
    Send(String),
}

// ---------------------------------------------------------------------------
// Graph wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    message: Message<'a>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    subject: &'a str,
    body: MessageBody<'a>,
    #[serde(rename = "toRecipients")]
    to_recipients: Vec<Recipient<'a>>,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    #[serde(rename = "contentType")]
    content_type: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    #[serde(rename = "emailAddress")]
    email_address: EmailAddress<'a>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    address: &'a str,
}

fn send_mail_request<'a>(
    subject: &'a str,
    html_body: &'a str,
    recipients: &'a [String],
) -> SendMailRequest<'a> {
    SendMailRequest {
        message: Message {
            subject,
            body: MessageBody {
                content_type: "HTML",
                content: html_body,
            },
            to_recipients: recipients
                .iter()
                .map(|address| Recipient {
                    email_address: EmailAddress { address },
                })
                .collect(),
        },
    }
}

// ---------------------------------------------------------------------------
// Graph mailer
// ---------------------------------------------------------------------------

/// [`Mailer`] backed by `POST /users/{sender}/sendMail` on Microsoft Graph.
pub struct GraphMailer {
    settings: EmailSettings,
}

impl GraphMailer {
    #[must_use]
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }

    fn token_url(&self) -> String {
        format!("{LOGIN_BASE}/{}/oauth2/v2.0/token", self.settings.tenant_id)
    }

    /// Run the client-credentials handshake and return a bearer token.
    fn acquire_token(&self) -> Result<String, DeliveryError> {
        let mut response = ureq::post(&self.token_url())
            .send_form([
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .map_err(|e| DeliveryError::Token(e.to_string()))?;
        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| DeliveryError::Token(e.to_string()))?;
        Ok(token.access_token)
    }
}

impl Mailer for GraphMailer {
    fn send(
        &self,
        subject: &str,
        html_body: &str,
        recipients: &[String],
    ) -> Result<(), DeliveryError> {
        let token = self.acquire_token()?;
        let url = format!("{GRAPH_SENDMAIL_BASE}/{}/sendMail", self.settings.sender);
        let auth = format!("Bearer {token}");
        ureq::post(&url)
            .header("Authorization", auth.as_str())
            .send_json(send_mail_request(subject, html_body, recipients))
            .map_err(|e| DeliveryError::Send(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn make_settings() -> EmailSettings {
        EmailSettings {
            client_id: "client-id".to_owned(),
            client_secret: "client-secret".to_owned(),
            tenant_id: "tenant-id".to_owned(),
            sender: "alerts@example.com".to_owned(),
            recipients: vec!["ops@example.com".to_owned()],
        }
    }

    #[test]
    fn test_token_url_contains_tenant() {
        let mailer = GraphMailer::new(make_settings());
        assert_eq!(
            mailer.token_url(),
            "https://login.microsoftonline.com/tenant-id/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_send_mail_payload_shape() {
        let recipients = vec!["a@example.com".to_owned(), "b@example.com".to_owned()];
        let request = send_mail_request("Subject line", "<p>body</p>", &recipients);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "message": {
                    "subject": "Subject line",
                    "body": {
                        "contentType": "HTML",
                        "content": "<p>body</p>"
                    },
                    "toRecipients": [
                        { "emailAddress": { "address": "a@example.com" } },
                        { "emailAddress": { "address": "b@example.com" } }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_token_response_requires_access_token() {
        let parsed: Result<TokenResponse, _> =
            serde_json::from_str(r#"{"error_description": "bad secret"}"#);
        assert!(parsed.is_err());
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token": "tok", "expires_in": 3599}"#).unwrap();
        assert_eq!(parsed.access_token, "tok");
    }
}
