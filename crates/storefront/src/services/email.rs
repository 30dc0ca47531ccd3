//! Transactional email.
//!
//! [`Mailer`] is the seam the notifier sends through. [`SmtpMailer`] delivers
//! via SMTP using lettre with multipart bodies rendered from Askama
//! templates; [`LogMailer`] only logs and is used when SMTP is not configured.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use herbwell_core::{Email, OrderStatus};

use crate::config::EmailConfig;

/// One purchased line as shown in an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailLine {
    pub name: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Carrier details included once an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentInfo {
    pub tracking_number: String,
    pub estimated_delivery: String,
}

/// Content of an order status notification. Amounts are preformatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusEmail {
    pub order_number: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub lines: Vec<EmailLine>,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    /// Present only for shipped orders.
    pub shipment: Option<ShipmentInfo>,
}

impl OrderStatusEmail {
    #[must_use]
    pub fn subject(&self) -> String {
        format!(
            "Your Herbwell order {} is {}",
            self.order_number,
            self.status.label().to_lowercase()
        )
    }

    #[must_use]
    pub const fn headline(&self) -> &'static str {
        match self.status {
            OrderStatus::Pending => "We received your order",
            OrderStatus::Processing => "We're preparing your order",
            OrderStatus::Shipped => "Your order is on its way",
            OrderStatus::Delivered => "Your order has been delivered",
            OrderStatus::Cancelled => "Your order has been cancelled",
        }
    }
}

/// HTML body of the order status email.
#[derive(Template)]
#[template(path = "email/order_status.html")]
struct OrderStatusEmailHtml<'a> {
    email: &'a OrderStatusEmail,
}

/// Plain text body of the order status email.
#[derive(Template)]
#[template(path = "email/order_status.txt")]
struct OrderStatusEmailText<'a> {
    email: &'a OrderStatusEmail,
}

/// Render the `(text, html)` bodies of a status email.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn render_order_status(email: &OrderStatusEmail) -> Result<(String, String), EmailError> {
    let text = OrderStatusEmailText { email }.render()?;
    let html = OrderStatusEmailHtml { email }.render()?;
    Ok((text, html))
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Delivery refused by the transport.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Sends customer notifications.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver an order status email to `to`.
    async fn send_order_status(&self, to: &Email, email: &OrderStatusEmail)
    -> Result<(), EmailError>;
}

/// SMTP mailer.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &Email,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_order_status(
        &self,
        to: &Email,
        email: &OrderStatusEmail,
    ) -> Result<(), EmailError> {
        let (text, html) = render_order_status(email)?;
        self.send_multipart_email(to, &email.subject(), text, html)
            .await
    }
}

/// Mailer that renders and logs instead of sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_order_status(
        &self,
        to: &Email,
        email: &OrderStatusEmail,
    ) -> Result<(), EmailError> {
        let (text, _) = render_order_status(email)?;
        tracing::info!(
            to = %to,
            subject = %email.subject(),
            body_len = text.len(),
            "SMTP not configured, email logged only"
        );
        Ok(())
    }
}
