//! Cart pricing, coupon checks and the Razorpay checkout flow.
//!
//! The session cart only stores book references. Every read prices it
//! again from the catalog, so the customer always sees (and pays) the
//! current price.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

use quillhouse_commerce::db::orders::CaptureOutcome;
use quillhouse_commerce::db::{AffiliateRepository, BookRepository, CouponRepository, OrderRepository};
use quillhouse_commerce::models::{Book, NewOrder, NewOrderItem, Order, ShippingAddress};
use quillhouse_commerce::razorpay::RazorpayClient;
use quillhouse_commerce::refunds;
use quillhouse_core::cart::{Cart, OrderTotals, PricedLine, ShippingPolicy};
use quillhouse_core::coupon::{CouponError, normalize_code};
use quillhouse_core::order_flow::CaptureRefusal;
use quillhouse_core::{BookFormat, BookId, Money, OrderId, OrderStatus, PaymentStatus, UserId};

use crate::error::AppError;

/// A cart line priced from the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub book_id: BookId,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub cover_url: Option<String>,
    pub format: BookFormat,
    pub quantity: u32,
    pub unit_price: Option<Money>,
    pub line_total: Option<Money>,
    /// Why the line cannot be bought right now.
    pub unavailable: Option<String>,
}

/// The cart as shown to the customer.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub coupon_code: Option<String>,
    /// Why the applied coupon no longer gives a discount.
    pub coupon_error: Option<String>,
    pub totals: OrderTotals,
    pub checkout_ready: bool,
}

/// Client payload for Razorpay Checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutPayload {
    pub order_id: OrderId,
    pub order_number: String,
    /// `None` when nothing is left to pay and the order was placed directly.
    pub gateway_order_id: Option<String>,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
    pub totals: OrderTotals,
    pub paid: bool,
}

/// Checkout request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    pub coupon_code: Option<String>,
    pub affiliate_code: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
}

/// Razorpay Checkout callback fields.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

struct ResolvedLine {
    book: Book,
    format: BookFormat,
    quantity: u32,
    unit_price: Money,
}

/// Price a line, or say why it can't be bought.
fn price_line(book: Option<&Book>, format: BookFormat, quantity: u32) -> Result<Money, String> {
    let Some(book) = book.filter(|b| b.is_published()) else {
        return Err("no longer available".to_owned());
    };

    let Some(price) = book.price_for(format) else {
        return Err(format!("not sold as {format}"));
    };

    if format.is_physical() && i64::from(book.stock) < i64::from(quantity) {
        return Err(if book.stock > 0 {
            format!("only {} in stock", book.stock)
        } else {
            "out of stock".to_owned()
        });
    }

    Ok(price)
}

/// Prices carts and runs checkout.
pub struct Checkout<'a> {
    pool: &'a PgPool,
    razorpay: &'a RazorpayClient,
    shipping: &'a ShippingPolicy,
}

impl<'a> Checkout<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        razorpay: &'a RazorpayClient,
        shipping: &'a ShippingPolicy,
    ) -> Self {
        Self {
            pool,
            razorpay,
            shipping,
        }
    }

    async fn load_books(&self, cart: &Cart) -> Result<HashMap<BookId, Book>, AppError> {
        let ids: Vec<BookId> = cart.lines().iter().map(|l| l.book_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let books = BookRepository::new(self.pool).get_many(&ids).await?;
        Ok(books.into_iter().map(|b| (b.id, b)).collect())
    }

    /// Discount for `code` on `subtotal`.
    ///
    /// Anonymous carts are checked without the per-customer limit; it is
    /// enforced again at checkout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Coupon` if the code does not apply.
    pub async fn coupon_discount(
        &self,
        code: &str,
        user_id: Option<UserId>,
        subtotal: Money,
    ) -> Result<(String, Money), AppError> {
        let code = normalize_code(code)?;
        let coupons = CouponRepository::new(self.pool);

        let coupon = coupons
            .get_by_code(&code)
            .await?
            .ok_or(CouponError::NotFound)?;

        let uses = match user_id {
            Some(user_id) => coupons.uses_by_user(&code, user_id).await?,
            None => 0,
        };

        let discount = coupon.rules.validate(Utc::now(), subtotal, uses)?;
        Ok((code, discount))
    }

    /// Price the session cart.
    ///
    /// Unavailable lines are reported but left out of the totals. A coupon
    /// that no longer applies is reported in `coupon_error`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the catalog can't be read.
    pub async fn view(&self, cart: &Cart, user_id: Option<UserId>) -> Result<CartView, AppError> {
        let books = self.load_books(cart).await?;

        let mut lines = Vec::with_capacity(cart.lines().len());
        let mut priced = Vec::new();

        for line in cart.lines() {
            let book = books.get(&line.book_id);
            let price = price_line(book, line.format, line.quantity);

            if let Ok(unit_price) = &price {
                priced.push(PricedLine {
                    format: line.format,
                    unit_price: *unit_price,
                    quantity: line.quantity,
                });
            }

            lines.push(CartLineView {
                book_id: line.book_id,
                slug: book.map(|b| b.slug.clone()),
                title: book.map(|b| b.title.clone()),
                author_name: book.map(|b| b.author_name.clone()),
                cover_url: book.and_then(|b| b.cover_url.clone()),
                format: line.format,
                quantity: line.quantity,
                unit_price: price.as_ref().ok().copied(),
                line_total: price.as_ref().ok().map(|p| p.times(line.quantity)),
                unavailable: price.err(),
            });
        }

        let subtotal: Money = priced.iter().map(PricedLine::line_total).sum();

        let mut coupon_error = None;
        let mut discount = Money::zero();
        if let Some(code) = &cart.coupon_code {
            match self.coupon_discount(code, user_id, subtotal).await {
                Ok((_, amount)) => discount = amount,
                Err(AppError::Coupon(err)) => coupon_error = Some(err.to_string()),
                Err(err) => return Err(err),
            }
        }

        let checkout_ready = !lines.is_empty() && lines.iter().all(|l| l.unavailable.is_none());

        Ok(CartView {
            item_count: cart.item_count(),
            coupon_code: cart.coupon_code.clone(),
            coupon_error,
            totals: OrderTotals::compute(&priced, discount, self.shipping),
            lines,
            checkout_ready,
        })
    }

    /// Resolve every cart line, failing on the first unavailable one.
    async fn resolve(&self, cart: &Cart) -> Result<Vec<ResolvedLine>, AppError> {
        let books = self.load_books(cart).await?;
        let mut resolved = Vec::with_capacity(cart.lines().len());

        for line in cart.lines() {
            let book = books.get(&line.book_id);
            let unit_price = price_line(book, line.format, line.quantity)
                .map_err(|reason| AppError::Conflict(format!("Book {}: {reason}", line.book_id)))?;
            let book = book
                .cloned()
                .ok_or_else(|| AppError::Conflict(format!("Book {} is unavailable", line.book_id)))?;

            resolved.push(ResolvedLine {
                book,
                format: line.format,
                quantity: line.quantity,
                unit_price,
            });
        }

        Ok(resolved)
    }

    /// Create a pending order and its Razorpay order.
    ///
    /// An order with nothing left to pay (a full-value coupon on e-books) is
    /// placed immediately without going through the gateway.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty cart or a missing or
    /// invalid shipping address, `AppError::Conflict` if a line is
    /// unavailable, `AppError::Coupon` if the coupon does not apply and
    /// `AppError::Payment` if Razorpay refuses the order.
    #[instrument(skip(self, cart, request), fields(user_id = %user_id))]
    pub async fn start(
        &self,
        user_id: UserId,
        cart: &Cart,
        request: CheckoutRequest,
        session_affiliate: Option<String>,
    ) -> Result<CheckoutPayload, AppError> {
        if cart.is_empty() {
            return Err(AppError::BadRequest("Cart is empty".to_string()));
        }

        let lines = self.resolve(cart).await?;

        let needs_shipping = lines.iter().any(|l| l.format.is_physical());
        let shipping_address = if needs_shipping {
            let address = request
                .shipping_address
                .ok_or_else(|| AppError::BadRequest("Shipping address is required".to_string()))?;
            address.validate().map_err(AppError::BadRequest)?;
            Some(address)
        } else {
            None
        };

        let priced: Vec<PricedLine> = lines
            .iter()
            .map(|l| PricedLine {
                format: l.format,
                unit_price: l.unit_price,
                quantity: l.quantity,
            })
            .collect();
        let subtotal: Money = priced.iter().map(PricedLine::line_total).sum();

        let coupon_code = request
            .coupon_code
            .filter(|c| !c.trim().is_empty())
            .or_else(|| cart.coupon_code.clone());
        let (coupon_code, discount) = match coupon_code {
            Some(code) => {
                let (code, discount) = self.coupon_discount(&code, Some(user_id), subtotal).await?;
                (Some(code), discount)
            }
            None => (None, Money::zero()),
        };

        let affiliate_code = match request
            .affiliate_code
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .or(session_affiliate)
        {
            Some(code) if AffiliateRepository::new(self.pool).exists(&code).await? => Some(code),
            _ => None,
        };

        let totals = OrderTotals::compute(&priced, discount, self.shipping);

        let items = lines
            .into_iter()
            .map(|l| {
                Ok(NewOrderItem {
                    book_id: l.book.id,
                    title: l.book.title,
                    author_id: l.book.author_id,
                    format: l.format,
                    unit_price: l.unit_price,
                    quantity: i32::try_from(l.quantity)
                        .map_err(|_| AppError::BadRequest("Invalid quantity".to_string()))?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let orders = OrderRepository::new(self.pool);
        let order = orders
            .create_pending(&NewOrder {
                user_id,
                totals,
                coupon_code,
                affiliate_code,
                shipping_address,
                items,
            })
            .await?;

        if totals.total.is_zero() {
            let placed = match orders
                .capture_payment(order.id, &format!("free-{}", order.order_number))
                .await?
            {
                CaptureOutcome::Placed(placed) => placed,
                CaptureOutcome::Refused { order, refusal } => {
                    tracing::warn!(order = %order.order_number, %refusal, "Free order refused");
                    return Err(AppError::Conflict(format!(
                        "Order {} could not be placed: {refusal}",
                        order.order_number
                    )));
                }
            };
            tracing::info!(order = %placed.order_number, "Order placed without payment");

            return Ok(CheckoutPayload {
                order_id: placed.id,
                order_number: placed.order_number,
                gateway_order_id: None,
                amount: 0,
                currency: totals.total.currency.code().to_owned(),
                key_id: self.razorpay.key_id().to_owned(),
                totals,
                paid: true,
            });
        }

        let gateway_order = match self
            .razorpay
            .create_order(totals.total, &order.order_number)
            .await
        {
            Ok(gateway_order) => gateway_order,
            Err(err) => {
                orders.mark_payment_failed(order.id).await?;
                return Err(err.into());
            }
        };

        orders
            .set_gateway_order(order.id, &gateway_order.id)
            .await?;

        tracing::info!(
            order = %order.order_number,
            gateway_order_id = %gateway_order.id,
            total = %totals.total,
            "Checkout started"
        );

        Ok(CheckoutPayload {
            order_id: order.id,
            order_number: order.order_number,
            gateway_order_id: Some(gateway_order.id),
            amount: gateway_order.amount,
            currency: gateway_order.currency,
            key_id: self.razorpay.key_id().to_owned(),
            totals,
            paid: false,
        })
    }

    /// Verify a Razorpay payment and place the order.
    ///
    /// Returns the order and whether this call placed it. Replaying the
    /// confirmation for an already placed order returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown gateway order,
    /// `AppError::Payment` for a bad signature and `AppError::Conflict` if
    /// the order was paid with another payment, or could not be placed
    /// because a coupon limit or the stock ran out after checkout started.
    #[instrument(skip(self, confirmation), fields(user_id = %user_id, gateway_order_id = %confirmation.razorpay_order_id))]
    pub async fn verify(
        &self,
        user_id: UserId,
        confirmation: &PaymentConfirmation,
    ) -> Result<(Order, bool), AppError> {
        let orders = OrderRepository::new(self.pool);

        let order = orders
            .get_by_gateway_order(&confirmation.razorpay_order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.payment_status == PaymentStatus::Paid && order.status != OrderStatus::Cancelled {
            return if order.gateway_payment_id.as_deref()
                == Some(confirmation.razorpay_payment_id.as_str())
            {
                Ok((order, false))
            } else {
                Err(AppError::Conflict("Order is already paid".to_string()))
            };
        }

        if order.status != OrderStatus::PendingPayment {
            return Err(AppError::Conflict(format!(
                "Order is {}",
                order.status.as_str()
            )));
        }

        if let Err(err) = self.razorpay.verify_payment_signature(
            &confirmation.razorpay_order_id,
            &confirmation.razorpay_payment_id,
            &confirmation.razorpay_signature,
        ) {
            tracing::warn!(order = %order.order_number, "Payment signature mismatch");
            orders.mark_payment_failed(order.id).await?;
            return Err(AppError::Payment(err));
        }

        let placed = match orders
            .capture_payment(order.id, &confirmation.razorpay_payment_id)
            .await?
        {
            CaptureOutcome::Placed(placed) => placed,
            CaptureOutcome::Refused { order, refusal } => {
                return Err(self.refund_refused(&order, &refusal).await);
            }
        };

        tracing::info!(
            order = %placed.order_number,
            payment_id = %confirmation.razorpay_payment_id,
            "Payment captured"
        );

        Ok((placed, true))
    }

    /// Refund a payment whose order could not be placed.
    ///
    /// A failed refund is logged and left for the back-office; the order is
    /// already cancelled and paid, so it shows up there as refundable.
    async fn refund_refused(&self, order: &Order, refusal: &CaptureRefusal) -> AppError {
        tracing::warn!(order = %order.order_number, %refusal, "Paid order refused at capture");

        match refunds::refund_order(self.pool, self.razorpay, order, None, Some("not fulfilled"))
            .await
        {
            Ok(refund) => {
                tracing::info!(
                    order = %order.order_number,
                    refund_id = %refund.refund_id,
                    "Refused order refunded"
                );
            }
            Err(err) => {
                let event_id = sentry::capture_error(&err);
                tracing::error!(
                    order = %order.order_number,
                    error = %err,
                    sentry_event_id = %event_id,
                    "Refund of refused order failed"
                );
            }
        }

        AppError::Conflict(format!(
            "Order {} could not be placed: {refusal}. Your payment will be refunded.",
            order.order_number
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use quillhouse_core::{AuthorId, BookStatus};

    use super::*;

    fn book(status: BookStatus, stock: i32, ebook: Option<i64>) -> Book {
        let now = Utc::now();
        Book {
            id: BookId::new(7),
            slug: "monsoon-letters".to_owned(),
            title: "Monsoon Letters".to_owned(),
            subtitle: None,
            author_id: AuthorId::new(1),
            author_name: "R. Iyer".to_owned(),
            description: String::new(),
            isbn: None,
            language: "English".to_owned(),
            category: "Fiction".to_owned(),
            print_price: Money::inr(Decimal::from(350)),
            ebook_price: ebook.map(|p| Money::inr(Decimal::from(p))),
            stock,
            pages: Some(220),
            weight_grams: 300,
            cover_url: None,
            ebook_url: None,
            status,
            rejection_reason: None,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_price_line_published_print() {
        let b = book(BookStatus::Published, 5, None);
        assert_eq!(
            price_line(Some(&b), BookFormat::Print, 2),
            Ok(Money::inr(Decimal::from(350)))
        );
    }

    #[test]
    fn test_price_line_rejects_unpublished_and_missing() {
        let b = book(BookStatus::PendingReview, 5, None);
        assert!(price_line(Some(&b), BookFormat::Print, 1).is_err());
        assert!(price_line(None, BookFormat::Print, 1).is_err());
    }

    #[test]
    fn test_price_line_stock() {
        let b = book(BookStatus::Published, 1, None);
        assert_eq!(
            price_line(Some(&b), BookFormat::Print, 2),
            Err("only 1 in stock".to_owned())
        );

        let b = book(BookStatus::Published, 0, None);
        assert_eq!(
            price_line(Some(&b), BookFormat::Print, 1),
            Err("out of stock".to_owned())
        );
    }

    #[test]
    fn test_price_line_ebook_ignores_stock() {
        let b = book(BookStatus::Published, 0, Some(199));
        assert_eq!(
            price_line(Some(&b), BookFormat::Ebook, 1),
            Ok(Money::inr(Decimal::from(199)))
        );

        let no_ebook = book(BookStatus::Published, 0, None);
        assert!(price_line(Some(&no_ebook), BookFormat::Ebook, 1).is_err());
    }
}
