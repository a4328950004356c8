use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use crate::config::MailConfig;

const SENDER_NAME: &str = "Lost & Found Support";

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

/// SMTP mailer; the transport keeps its own connection pool and is shared by all requests.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let address: Address = cfg
            .username
            .parse()
            .with_context(|| format!("invalid sender address {}", cfg.username))?;

        let builder = if cfg.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
        }
        .with_context(|| format!("smtp relay {}", cfg.host))?;

        let transport = builder
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();

        info!(host = %cfg.host, port = cfg.port, tls = cfg.implicit_tls(), "smtp mailer configured");
        Ok(Self {
            transport,
            from: Mailbox::new(Some(SENDER_NAME.into()), address),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let to: Mailbox = mail
            .to
            .parse()
            .with_context(|| format!("invalid recipient {}", mail.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .context("build message")?;

        self.transport.send(message).await.context("smtp send")?;
        debug!(to = %mail.to, "mail sent");
        Ok(())
    }
}

pub fn password_reset_mail(to: &str, name: &str, reset_url: &str, ttl_minutes: i64) -> OutgoingMail {
    let html = format!(
        "<p>Hello {name},</p>\n\
         <p>You requested a password reset for your Lost &amp; Found account.</p>\n\
         <p>Click the link below to reset your password (valid for {ttl_minutes} minutes):</p>\n\
         <a href=\"{url}\">{url}</a>\n\
         <p>If you didn't request this, please ignore this email.</p>\n",
        name = escape_html(name),
        url = escape_html(reset_url),
    );
    OutgoingMail {
        to: to.to_string(),
        subject: "Password Reset Request".into(),
        html,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_mail_contains_link_and_escapes_name() {
        let mail = password_reset_mail(
            "bob@vitapstudent.ac.in",
            "<Bob>",
            "https://app.example/reset-password/abc123",
            15,
        );
        assert_eq!(mail.to, "bob@vitapstudent.ac.in");
        assert_eq!(mail.subject, "Password Reset Request");
        assert!(mail.html.contains("href=\"https://app.example/reset-password/abc123\""));
        assert!(mail.html.contains("&lt;Bob&gt;"));
        assert!(mail.html.contains("valid for 15 minutes"));
    }

    #[test]
    fn smtp_mailer_rejects_bad_sender() {
        let cfg = MailConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "not an address".into(),
            password: "secret".into(),
        };
        assert!(SmtpMailer::new(&cfg).is_err());
    }
}
