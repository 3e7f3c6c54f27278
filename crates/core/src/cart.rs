//! Shopping cart and order totals.
//!
//! The cart only holds references (book, format, quantity); prices are
//! resolved from the catalog at checkout so a stale session can never fix
//! a price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{BookFormat, BookId, Money};

/// Most copies of one book and format allowed in a single order.
pub const MAX_LINE_QUANTITY: u32 = 10;

/// One book in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub book_id: BookId,
    pub format: BookFormat,
    pub quantity: u32,
}

impl CartLine {
    fn clamp_quantity(format: BookFormat, quantity: u32) -> u32 {
        match format {
            BookFormat::Ebook => 1,
            BookFormat::Print => quantity.min(MAX_LINE_QUANTITY),
        }
    }
}

/// A customer's cart, kept in their session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    /// Coupon the customer applied, already normalized.
    pub coupon_code: Option<String>,
}

impl Cart {
    /// Add copies of a book, merging with an existing line.
    ///
    /// Print quantities are capped at [`MAX_LINE_QUANTITY`]; e-books are
    /// always a single copy. Adding zero copies does nothing.
    pub fn add(&mut self, book_id: BookId, format: BookFormat, quantity: u32) {
        if quantity == 0 {
            return;
        }

        if let Some(line) = self.line_mut(book_id, format) {
            line.quantity = CartLine::clamp_quantity(format, line.quantity.saturating_add(quantity));
            return;
        }

        self.lines.push(CartLine {
            book_id,
            format,
            quantity: CartLine::clamp_quantity(format, quantity),
        });
    }

    /// Set a line's quantity. Zero removes it.
    ///
    /// Returns `false` if the line was not in the cart.
    pub fn set_quantity(&mut self, book_id: BookId, format: BookFormat, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(book_id, format);
        }

        match self.line_mut(book_id, format) {
            Some(line) => {
                line.quantity = CartLine::clamp_quantity(format, quantity);
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if it was not in the cart.
    pub fn remove(&mut self, book_id: BookId, format: BookFormat) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|l| !(l.book_id == book_id && l.format == format));
        self.lines.len() != before
    }

    /// Empty the cart and drop any coupon.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.coupon_code = None;
    }

    /// Total number of copies across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    fn line_mut(&mut self, book_id: BookId, format: BookFormat) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|l| l.book_id == book_id && l.format == format)
    }
}

/// A cart line with its catalog price resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub format: BookFormat,
    pub unit_price: Money,
    pub quantity: u32,
}

impl PricedLine {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Charged on orders containing at least one print book.
    pub flat_fee: Money,
    /// Orders whose discounted subtotal reaches this ship free.
    pub free_above: Money,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_fee: Money::inr(Decimal::from(50)),
            free_above: Money::inr(Decimal::from(499)),
        }
    }
}

/// The money breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping_fee: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Compute totals for priced lines.
    ///
    /// The discount is clamped to the subtotal. Shipping is charged when
    /// the order has a print line and the discounted subtotal is under
    /// `policy.free_above`.
    #[must_use]
    pub fn compute(lines: &[PricedLine], discount: Money, policy: &ShippingPolicy) -> Self {
        let subtotal: Money = lines.iter().map(PricedLine::line_total).sum();
        let discount = discount.min(subtotal);
        let discounted = subtotal.saturating_sub(discount);

        let has_print = lines.iter().any(|l| l.format.is_physical());
        let shipping_fee = if has_print && discounted.amount < policy.free_above.amount {
            policy.flat_fee
        } else {
            Money::zero()
        };

        Self {
            subtotal,
            discount,
            shipping_fee,
            total: discounted + shipping_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rupees(n: i64) -> Money {
        Money::inr(Decimal::from(n))
    }

    fn print(price: i64, quantity: u32) -> PricedLine {
        PricedLine {
            format: BookFormat::Print,
            unit_price: rupees(price),
            quantity,
        }
    }

    fn ebook(price: i64) -> PricedLine {
        PricedLine {
            format: BookFormat::Ebook,
            unit_price: rupees(price),
            quantity: 1,
        }
    }

    #[test]
    fn test_add_merges_and_caps() {
        let mut cart = Cart::default();
        let book = BookId::new(1);
        cart.add(book, BookFormat::Print, 4);
        cart.add(book, BookFormat::Print, 9);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_formats_are_separate_lines() {
        let mut cart = Cart::default();
        let book = BookId::new(1);
        cart.add(book, BookFormat::Print, 1);
        cart.add(book, BookFormat::Ebook, 3);
        cart.add(book, BookFormat::Ebook, 1);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = Cart::default();
        let book = BookId::new(7);
        assert!(!cart.set_quantity(book, BookFormat::Print, 2));

        cart.add(book, BookFormat::Print, 1);
        assert!(cart.set_quantity(book, BookFormat::Print, 3));
        assert_eq!(cart.item_count(), 3);

        assert!(cart.set_quantity(book, BookFormat::Print, 0));
        assert!(cart.is_empty());
        assert!(!cart.remove(book, BookFormat::Print));
    }

    #[test]
    fn test_clear_drops_coupon() {
        let mut cart = Cart::default();
        cart.add(BookId::new(1), BookFormat::Print, 1);
        cart.coupon_code = Some("READ20".to_owned());
        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.coupon_code.is_none());
    }

    #[test]
    fn test_shipping_charged_below_threshold() {
        let totals = OrderTotals::compute(&[print(299, 1)], Money::zero(), &ShippingPolicy::default());
        assert_eq!(totals.shipping_fee, rupees(50));
        assert_eq!(totals.total, rupees(349));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let totals = OrderTotals::compute(&[print(250, 2)], Money::zero(), &ShippingPolicy::default());
        assert!(totals.shipping_fee.is_zero());
        assert_eq!(totals.total, rupees(500));
    }

    #[test]
    fn test_discount_can_bring_back_shipping() {
        let totals = OrderTotals::compute(&[print(250, 2)], rupees(100), &ShippingPolicy::default());
        assert_eq!(totals.subtotal, rupees(500));
        assert_eq!(totals.shipping_fee, rupees(50));
        assert_eq!(totals.total, rupees(450));
    }

    #[test]
    fn test_ebook_only_ships_free() {
        let totals = OrderTotals::compute(&[ebook(149)], Money::zero(), &ShippingPolicy::default());
        assert!(totals.shipping_fee.is_zero());
        assert_eq!(totals.total, rupees(149));
    }

    #[test]
    fn test_discount_clamped_to_subtotal() {
        let totals = OrderTotals::compute(&[ebook(99)], rupees(500), &ShippingPolicy::default());
        assert_eq!(totals.discount, rupees(99));
        assert!(totals.total.is_zero());
    }
}
