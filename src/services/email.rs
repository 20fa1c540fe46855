//! Notification emails
//!
//! Orders and contact submissions notify the studio; newsletter subscribers
//! get a welcome message. Bodies are rendered from the HTML templates in
//! `templates/email` and sent as multipart/alternative with a plain text part.
//! Without SMTP settings nothing is sent and `Ok(false)` is returned.

use crate::config::EmailConfig;
use crate::models::{ContactSubmission, OrderRequest};
use anyhow::{anyhow, Context as _, Result};
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tera::{Context, Tera};

const BASE_TEMPLATE: &str = include_str!("../../templates/email/base.html");
const ORDER_TEMPLATE: &str = include_str!("../../templates/email/order_notification.html");
const NEWSLETTER_TEMPLATE: &str =
    include_str!("../../templates/email/newsletter_confirmation.html");
const CONTACT_TEMPLATE: &str = include_str!("../../templates/email/contact_notification.html");

static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<style[^>]*>.*?</style>").expect("style pattern is valid"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// A rendered message ready to send
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Email service for studio notifications
pub struct EmailService {
    config: EmailConfig,
    templates: Tera,
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let mut templates = Tera::default();
        templates
            .add_raw_templates(vec![
                ("base.html", BASE_TEMPLATE),
                ("order_notification.html", ORDER_TEMPLATE),
                ("newsletter_confirmation.html", NEWSLETTER_TEMPLATE),
                ("contact_notification.html", CONTACT_TEMPLATE),
            ])
            .context("Failed to load email templates")?;

        let mailer = if config.is_smtp_configured() {
            Some(build_transport(&config)?)
        } else {
            None
        };

        Ok(Self {
            config,
            templates,
            mailer,
        })
    }

    /// Whether messages will actually be delivered
    pub fn is_configured(&self) -> bool {
        self.mailer.is_some()
    }

    /// Notify the studio of a new order request
    pub async fn send_order_notification(
        &self,
        order: &OrderRequest,
        artwork_title: Option<&str>,
    ) -> Result<bool> {
        let email = self.render_order_notification(order, artwork_title)?;
        self.send(email).await
    }

    /// Welcome a new newsletter subscriber
    pub async fn send_newsletter_confirmation(&self, to: &str, name: Option<&str>) -> Result<bool> {
        let email = self.render_newsletter_confirmation(to, name)?;
        self.send(email).await
    }

    /// Notify the studio of a contact form message
    pub async fn send_contact_notification(&self, submission: &ContactSubmission) -> Result<bool> {
        let email = self.render_contact_notification(submission)?;
        self.send(email).await
    }

    pub fn render_order_notification(
        &self,
        order: &OrderRequest,
        artwork_title: Option<&str>,
    ) -> Result<RenderedEmail> {
        let label = order.order_type.label();
        let options = order
            .options
            .as_ref()
            .map(|o| o.selected_labels())
            .unwrap_or_default();

        let mut context = Context::new();
        context.insert("order_id", &order.id);
        context.insert("artwork_title", artwork_title.unwrap_or("Niet gespecificeerd"));
        context.insert("order_label", label);
        context.insert("options", &options);
        context.insert("inspiration", order.inspiration.as_deref().unwrap_or(""));
        context.insert("name", &order.contact_info.name);
        context.insert("email", &order.contact_info.email);
        context.insert("phone", order.contact_info.phone.as_deref().unwrap_or(""));
        context.insert("message", order.contact_info.message.as_deref().unwrap_or(""));

        Ok(RenderedEmail {
            to: self.config.admin_email.clone(),
            subject: format!(
                "Nieuwe order aanvraag: {} - {}",
                artwork_title.unwrap_or("Kunstwerk"),
                label
            ),
            html: self.render("order_notification.html", &context)?,
        })
    }

    pub fn render_newsletter_confirmation(
        &self,
        to: &str,
        name: Option<&str>,
    ) -> Result<RenderedEmail> {
        let mut context = Context::new();
        context.insert("name", name.unwrap_or("klant"));

        Ok(RenderedEmail {
            to: to.to_string(),
            subject: "Welkom bij de Zaanse Plankjes Maffia nieuwsbrief!".to_string(),
            html: self.render("newsletter_confirmation.html", &context)?,
        })
    }

    pub fn render_contact_notification(
        &self,
        submission: &ContactSubmission,
    ) -> Result<RenderedEmail> {
        let mut context = Context::new();
        context.insert("name", &submission.name);
        context.insert("email", &submission.email);
        context.insert("subject", submission.subject.as_deref().unwrap_or(""));
        context.insert("message", &submission.message);

        let subject = match submission.subject.as_deref() {
            Some(subject) => format!("Nieuw contactformulier bericht: {}", subject),
            None => "Nieuw contactformulier bericht".to_string(),
        };

        Ok(RenderedEmail {
            to: self.config.admin_email.clone(),
            subject,
            html: self.render("contact_notification.html", &context)?,
        })
    }

    fn render(&self, template: &str, context: &Context) -> Result<String> {
        self.templates
            .render(template, context)
            .with_context(|| format!("Failed to render email template {}", template))
    }

    async fn send(&self, email: RenderedEmail) -> Result<bool> {
        let Some(mailer) = &self.mailer else {
            tracing::warn!(
                to = %email.to,
                subject = %email.subject,
                "SMTP not configured, email not sent"
            );
            return Ok(false);
        };

        let from = self
            .config
            .from
            .as_deref()
            .or(self.config.smtp_user.as_deref())
            .unwrap_or_default();

        let message = Message::builder()
            .from(
                from.parse::<Mailbox>()
                    .map_err(|e| anyhow!("Invalid from address: {}", e))?,
            )
            .to(email
                .to
                .parse::<Mailbox>()
                .map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(email.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                html_to_text(&email.html),
                email.html,
            ))
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let response = mailer
            .send(message)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        tracing::info!(
            to = %email.to,
            code = %response.code(),
            "Email sent: {}",
            email.subject
        );
        Ok(true)
    }
}

fn build_transport(config: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
    let host = config.smtp_host.as_deref().unwrap_or_default();
    let creds = Credentials::new(
        config.smtp_user.clone().unwrap_or_default(),
        config.smtp_password.clone().unwrap_or_default(),
    );

    // 465 is implicit TLS, everything else upgrades with STARTTLS
    let builder = if config.smtp_port == 465 {
        AsyncSmtpTransport::<Tokio1Executor>::relay(host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
    }
    .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?;

    Ok(builder.credentials(creds).port(config.smtp_port).build())
}

/// Plain text alternative: drop styles and tags, keep non-empty lines
pub fn html_to_text(html: &str) -> String {
    let without_style = STYLE_RE.replace_all(html, "");
    let text = TAG_RE.replace_all(&without_style, "\n");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactInfo, ContactStatus, OrderOptions, OrderType};
    use chrono::Utc;

    fn service() -> EmailService {
        EmailService::new(EmailConfig::default()).unwrap()
    }

    fn order() -> OrderRequest {
        OrderRequest {
            id: "order-1".to_string(),
            artwork_id: Some("art-1".to_string()),
            order_type: OrderType::ToteBag,
            options: Some(OrderOptions {
                thinner_wood: Some(true),
                ..Default::default()
            }),
            inspiration: None,
            contact_info: ContactInfo {
                name: "Jan <b>de Vries</b>".to_string(),
                email: "jan@example.nl".to_string(),
                phone: Some("0612345678".to_string()),
                message: Some("Regel een\nRegel twee".to_string()),
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_notification() {
        let email = service()
            .render_order_notification(&order(), Some("Zaanse Schans"))
            .unwrap();

        assert_eq!(email.to, "info@plankjesmaffia.nl");
        assert_eq!(email.subject, "Nieuwe order aanvraag: Zaanse Schans - Tote bag print");
        assert!(email.html.contains("order-1"));
        assert!(email.html.contains("Dunner hout"));
        assert!(email.html.contains("Telefoon:"));
        assert!(email.html.contains("Regel een<br>Regel twee"));
        // Customer input is escaped
        assert!(email.html.contains("Jan &lt;b&gt;de Vries&lt;&#x2F;b&gt;"));
        assert!(!email.html.contains("Inspiratie:"));
    }

    #[test]
    fn test_order_notification_without_artwork() {
        let email = service().render_order_notification(&order(), None).unwrap();
        assert_eq!(email.subject, "Nieuwe order aanvraag: Kunstwerk - Tote bag print");
        assert!(email.html.contains("Niet gespecificeerd"));
    }

    #[test]
    fn test_newsletter_confirmation_greeting() {
        let service = service();
        let named = service
            .render_newsletter_confirmation("els@example.nl", Some("Els"))
            .unwrap();
        assert_eq!(named.to, "els@example.nl");
        assert_eq!(named.subject, "Welkom bij de Zaanse Plankjes Maffia nieuwsbrief!");
        assert!(named.html.contains("Beste Els,"));

        let anonymous = service
            .render_newsletter_confirmation("els@example.nl", None)
            .unwrap();
        assert!(anonymous.html.contains("Beste klant,"));
        assert!(anonymous.html.contains("uitschrijven"));
    }

    #[test]
    fn test_contact_notification_subject() {
        let mut submission = ContactSubmission {
            id: 1,
            name: "Piet".to_string(),
            email: "piet@example.nl".to_string(),
            subject: Some("Workshop".to_string()),
            message: "Hallo".to_string(),
            status: ContactStatus::New,
            read_at: None,
            created_at: Utc::now(),
        };
        let service = service();

        let email = service.render_contact_notification(&submission).unwrap();
        assert_eq!(email.subject, "Nieuw contactformulier bericht: Workshop");
        assert!(email.html.contains("Onderwerp:"));
        assert!(email
            .html
            .contains("Dit is een automatische notificatie van het Zaanse Plankjes Maffia systeem."));

        submission.subject = None;
        let email = service.render_contact_notification(&submission).unwrap();
        assert_eq!(email.subject, "Nieuw contactformulier bericht");
        assert!(!email.html.contains("Onderwerp:"));
    }

    #[test]
    fn test_html_to_text() {
        let text = html_to_text(
            "<html><head><style>body { color: red; }</style></head>\
             <body><p>Beste Els,</p><p>Tom &amp; Jerry</p></body></html>",
        );
        assert_eq!(text, "Beste Els,\nTom & Jerry");
    }

    #[tokio::test]
    async fn test_unconfigured_smtp_reports_not_sent() {
        let service = service();
        assert!(!service.is_configured());
        let sent = service
            .send_newsletter_confirmation("els@example.nl", None)
            .await
            .unwrap();
        assert!(!sent);
    }
}
