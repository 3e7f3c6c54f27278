//! Transactional email.
//!
//! Uses SMTP via lettre for delivery with Askama text and HTML templates.
//! Email is optional: a [`Mailer`] built without SMTP settings logs and skips
//! every message.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub use lettre::transport::smtp::Error as SmtpError;

use quillhouse_core::Money;

use crate::models::order::Order;

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
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
}

struct OrderLineView {
    title: String,
    format: &'static str,
    quantity: i32,
    total: Money,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    name: &'a str,
    order_number: &'a str,
    lines: &'a [OrderLineView],
    subtotal: Money,
    has_discount: bool,
    discount: Money,
    shipping_fee: Money,
    total: Money,
    has_ebooks: bool,
    has_print: bool,
    library_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    lines: &'a [OrderLineView],
    subtotal: Money,
    has_discount: bool,
    discount: Money,
    shipping_fee: Money,
    total: Money,
    has_ebooks: bool,
    has_print: bool,
    library_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_shipped.txt")]
struct OrderShippedText<'a> {
    name: &'a str,
    order_number: &'a str,
    courier_name: &'a str,
    awb_code: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_shipped.html")]
struct OrderShippedHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    courier_name: &'a str,
    awb_code: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.txt")]
struct OrderCancelledText<'a> {
    name: &'a str,
    order_number: &'a str,
    reason: &'a str,
    has_refund: bool,
    refund: Money,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.html")]
struct OrderCancelledHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    reason: &'a str,
    has_refund: bool,
    refund: Money,
}

#[derive(Template)]
#[template(path = "email/application_received.txt")]
struct ApplicationReceivedText<'a> {
    name: &'a str,
    job_title: &'a str,
}

#[derive(Template)]
#[template(path = "email/application_received.html")]
struct ApplicationReceivedHtml<'a> {
    name: &'a str,
    job_title: &'a str,
}

/// A rendered message body.
struct Rendered {
    subject: String,
    text: String,
    html: String,
}

fn render_order_confirmation(name: &str, order: &Order, site_url: &str) -> Result<Rendered, EmailError> {
    let lines: Vec<OrderLineView> = order
        .items
        .iter()
        .map(|item| OrderLineView {
            title: item.title.clone(),
            format: item.format.as_str(),
            quantity: item.quantity,
            total: item
                .unit_price
                .times(u32::try_from(item.quantity).unwrap_or(0)),
        })
        .collect();
    let has_ebooks = order.items.iter().any(|item| !item.format.is_physical());
    let library_url = format!("{}/library", site_url.trim_end_matches('/'));

    let text = OrderConfirmationText {
        name,
        order_number: &order.order_number,
        lines: &lines,
        subtotal: order.subtotal,
        has_discount: !order.discount.is_zero(),
        discount: order.discount,
        shipping_fee: order.shipping_fee,
        total: order.total,
        has_ebooks,
        has_print: order.has_print_items(),
        library_url: &library_url,
    }
    .render()?;
    let html = OrderConfirmationHtml {
        name,
        order_number: &order.order_number,
        lines: &lines,
        subtotal: order.subtotal,
        has_discount: !order.discount.is_zero(),
        discount: order.discount,
        shipping_fee: order.shipping_fee,
        total: order.total,
        has_ebooks,
        has_print: order.has_print_items(),
        library_url: &library_url,
    }
    .render()?;

    Ok(Rendered {
        subject: format!("Order {} confirmed", order.order_number),
        text,
        html,
    })
}

fn render_order_shipped(name: &str, order: &Order) -> Result<Rendered, EmailError> {
    let courier_name = order.courier_name.as_deref().unwrap_or("our courier partner");
    let awb_code = order.awb_code.as_deref().unwrap_or_default();

    Ok(Rendered {
        subject: format!("Order {} has shipped", order.order_number),
        text: OrderShippedText {
            name,
            order_number: &order.order_number,
            courier_name,
            awb_code,
        }
        .render()?,
        html: OrderShippedHtml {
            name,
            order_number: &order.order_number,
            courier_name,
            awb_code,
        }
        .render()?,
    })
}

fn render_order_cancelled(
    name: &str,
    order: &Order,
    refund: Option<Money>,
) -> Result<Rendered, EmailError> {
    let reason = order.cancel_reason.as_deref().unwrap_or_default();
    let has_refund = refund.is_some_and(|amount| !amount.is_zero());
    let refund = refund.unwrap_or_default();

    Ok(Rendered {
        subject: format!("Order {} cancelled", order.order_number),
        text: OrderCancelledText {
            name,
            order_number: &order.order_number,
            reason,
            has_refund,
            refund,
        }
        .render()?,
        html: OrderCancelledHtml {
            name,
            order_number: &order.order_number,
            reason,
            has_refund,
            refund,
        }
        .render()?,
    })
}

fn render_application_received(name: &str, job_title: &str) -> Result<Rendered, EmailError> {
    Ok(Rendered {
        subject: format!("Your application for {job_title}"),
        text: ApplicationReceivedText { name, job_title }.render()?,
        html: ApplicationReceivedHtml { name, job_title }.render()?,
    })
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    site_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// `site_url` is the storefront base URL used for links.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, site_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_owned(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            site_url: site_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Send the payment confirmation for an order.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(&self, to: &str, name: &str, order: &Order) -> Result<(), EmailError> {
        let rendered = render_order_confirmation(name, order, &self.site_url)?;
        self.send_multipart_email(to, &rendered).await
    }

    /// Send the shipment notice for an order with an AWB.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_shipped(&self, to: &str, name: &str, order: &Order) -> Result<(), EmailError> {
        let rendered = render_order_shipped(name, order)?;
        self.send_multipart_email(to, &rendered).await
    }

    /// Send the cancellation notice, mentioning the refund if one was issued.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_cancelled(
        &self,
        to: &str,
        name: &str,
        order: &Order,
        refund: Option<Money>,
    ) -> Result<(), EmailError> {
        let rendered = render_order_cancelled(name, order, refund)?;
        self.send_multipart_email(to, &rendered).await
    }

    /// Acknowledge a job application.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_application_received(&self, to: &str, name: &str, job_title: &str) -> Result<(), EmailError> {
        let rendered = render_application_received(name, job_title)?;
        self.send_multipart_email(to, &rendered).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(&self, to: &str, rendered: &Rendered) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_owned()))?)
            .subject(&rendered.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(rendered.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(rendered.html.clone()),
                    ),
            )?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

/// Fire-and-log front for [`EmailService`].
///
/// Handlers call these after the state change has committed; a failed email
/// is logged and never fails the request.
#[derive(Clone, Default)]
pub struct Mailer {
    service: Option<EmailService>,
}

impl Mailer {
    /// A mailer that sends through `service`.
    #[must_use]
    pub const fn new(service: EmailService) -> Self {
        Self {
            service: Some(service),
        }
    }

    /// A mailer that skips every message.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { service: None }
    }

    /// Build from optional SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn from_config(config: Option<&EmailConfig>, site_url: &str) -> Result<Self, SmtpError> {
        match config {
            Some(config) => Ok(Self::new(EmailService::new(config, site_url)?)),
            None => {
                tracing::warn!("SMTP not configured, transactional email disabled");
                Ok(Self::disabled())
            }
        }
    }

    /// Whether messages are actually sent.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.service.is_some()
    }

    pub async fn order_confirmation(&self, to: &str, name: &str, order: &Order) {
        let Some(service) = &self.service else {
            tracing::info!(order = %order.order_number, "Email disabled, skipping order confirmation");
            return;
        };
        if let Err(e) = service.send_order_confirmation(to, name, order).await {
            tracing::error!(error = %e, order = %order.order_number, "Failed to send order confirmation");
        }
    }

    pub async fn order_shipped(&self, to: &str, name: &str, order: &Order) {
        let Some(service) = &self.service else {
            tracing::info!(order = %order.order_number, "Email disabled, skipping shipment notice");
            return;
        };
        if let Err(e) = service.send_order_shipped(to, name, order).await {
            tracing::error!(error = %e, order = %order.order_number, "Failed to send shipment notice");
        }
    }

    pub async fn order_cancelled(&self, to: &str, name: &str, order: &Order, refund: Option<Money>) {
        let Some(service) = &self.service else {
            tracing::info!(order = %order.order_number, "Email disabled, skipping cancellation notice");
            return;
        };
        if let Err(e) = service.send_order_cancelled(to, name, order, refund).await {
            tracing::error!(error = %e, order = %order.order_number, "Failed to send cancellation notice");
        }
    }

    pub async fn application_received(&self, to: &str, name: &str, job_title: &str) {
        let Some(service) = &self.service else {
            tracing::info!(job_title, "Email disabled, skipping application receipt");
            return;
        };
        if let Err(e) = service.send_application_received(to, name, job_title).await {
            tracing::error!(error = %e, job_title, "Failed to send application receipt");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use quillhouse_core::{
        AuthorId, BookFormat, BookId, OrderId, OrderItemId, OrderStatus, PaymentStatus, UserId,
    };

    use super::*;
    use crate::models::order::OrderItem;

    fn order() -> Order {
        let now = Utc::now();
        let item = |id: i32, format: BookFormat, price: i64, quantity: i32| OrderItem {
            id: OrderItemId::new(id),
            order_id: OrderId::new(7),
            book_id: BookId::new(id),
            title: format!("The <Quiet> River {id}"),
            author_id: AuthorId::new(1),
            format,
            unit_price: Money::inr(Decimal::new(price, 0)),
            quantity,
        };

        Order {
            id: OrderId::new(7),
            order_number: "QH-100007".to_owned(),
            user_id: UserId::new(3),
            status: OrderStatus::Placed,
            payment_status: PaymentStatus::Paid,
            subtotal: Money::inr(Decimal::new(747, 0)),
            discount: Money::inr(Decimal::new(50, 0)),
            shipping_fee: Money::zero(),
            total: Money::inr(Decimal::new(697, 0)),
            coupon_code: Some("WELCOME50".to_owned()),
            affiliate_code: None,
            shipping_address: None,
            gateway_order_id: None,
            gateway_payment_id: None,
            shiprocket_order_id: None,
            shipment_id: None,
            awb_code: Some("AWB123456".to_owned()),
            courier_name: Some("Delhivery".to_owned()),
            cancel_reason: Some("Changed my mind".to_owned()),
            placed_at: Some(now),
            created_at: now,
            updated_at: now,
            items: vec![
                item(1, BookFormat::Print, 299, 2),
                item(2, BookFormat::Ebook, 149, 1),
            ],
        }
    }

    #[test]
    fn test_order_confirmation_lists_lines_and_totals() {
        let rendered = render_order_confirmation("Asha", &order(), "https://quillhouse.in/")
            .expect("render");

        assert_eq!(rendered.subject, "Order QH-100007 confirmed");
        assert!(rendered.text.contains("Hi Asha"));
        assert!(rendered.text.contains("x 2"));
        assert!(rendered.text.contains("Discount"));
        assert!(rendered.text.contains("https://quillhouse.in/library"));
        assert!(rendered.text.contains("when your books ship"));
    }

    #[test]
    fn test_html_escapes_titles() {
        let rendered = render_order_confirmation("Asha", &order(), "https://quillhouse.in")
            .expect("render");
        assert!(!rendered.html.contains("<Quiet>"));
        assert!(rendered.html.contains("&lt;Quiet&gt;") || rendered.html.contains("&#60;Quiet&#62;"));
        // plain text is not escaped
        assert!(rendered.text.contains("<Quiet>"));
    }

    #[test]
    fn test_cancellation_mentions_refund_only_when_issued() {
        let order = order();

        let with_refund =
            render_order_cancelled("Asha", &order, Some(order.total)).expect("render");
        assert!(with_refund.text.contains("refund of"));
        assert!(with_refund.text.contains("Changed my mind"));

        let without = render_order_cancelled("Asha", &order, None).expect("render");
        assert!(!without.text.contains("refund of"));
    }

    #[test]
    fn test_shipment_notice_has_awb() {
        let rendered = render_order_shipped("Asha", &order()).expect("render");
        assert!(rendered.text.contains("AWB123456"));
        assert!(rendered.html.contains("Delhivery"));
    }

    #[test]
    fn test_application_receipt() {
        let rendered = render_application_received("Ravi", "Copy Editor").expect("render");
        assert_eq!(rendered.subject, "Your application for Copy Editor");
        assert!(rendered.text.contains("Copy Editor"));
    }

    #[tokio::test]
    async fn test_disabled_mailer_skips_quietly() {
        let mailer = Mailer::disabled();
        assert!(!mailer.is_enabled());
        mailer.order_confirmation("asha@example.com", "Asha", &order()).await;
        mailer.application_received("ravi@example.com", "Ravi", "Copy Editor").await;
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.zoho.in".to_owned(),
            smtp_port: 587,
            smtp_username: "orders@quillhouse.in".to_owned(),
            smtp_password: SecretString::from("hunter2"),
            from_address: "Quillhouse <orders@quillhouse.in>".to_owned(),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }
}
