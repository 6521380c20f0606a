//! Document totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::document::{DocumentItem, NewDocumentItem};
use crate::money::Money;

/// The transactional amounts of one line.
pub trait LineAmounts {
    fn quantity(&self) -> u32;
    fn unit_price(&self) -> Money;
    fn discount(&self) -> Money;

    /// Quantity times unit price.
    fn gross(&self) -> Money {
        self.unit_price().multiply(self.quantity())
    }

    /// Gross minus discount, clamped at zero.
    fn net(&self) -> Money {
        self.gross().saturating_sub(self.discount())
    }
}

impl LineAmounts for DocumentItem {
    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn discount(&self) -> Money {
        self.discount
    }
}

impl LineAmounts for NewDocumentItem {
    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn discount(&self) -> Money {
        self.discount
    }
}

/// Derived amounts of a document, unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Σ quantity × unit price.
    pub line_subtotal: Money,
    /// Σ line discounts actually applied.
    pub line_discount_total: Money,
    /// Line subtotal after line discounts. Stored as the header subtotal.
    pub subtotal: Money,
    /// Header discount actually applied.
    pub header_discount: Money,
    /// Subtotal after the header discount.
    pub taxable_amount: Money,
    pub tax_rate: Decimal,
    pub tax_amount: Money,
    pub total: Money,
}

impl Totals {
    /// Returns a copy with every amount rounded to two decimals.
    pub fn rounded(&self) -> Totals {
        Totals {
            line_subtotal: self.line_subtotal.rounded(),
            line_discount_total: self.line_discount_total.rounded(),
            subtotal: self.subtotal.rounded(),
            header_discount: self.header_discount.rounded(),
            taxable_amount: self.taxable_amount.rounded(),
            tax_rate: self.tax_rate,
            tax_amount: self.tax_amount.rounded(),
            total: self.total.rounded(),
        }
    }
}

/// Computes document totals from its lines and header discount and tax rate.
///
/// Accumulates at full precision. A discount larger than its base is clamped
/// so no component goes negative; callers are expected to reject such input
/// before writing.
pub fn calculate_totals<'a, L, I>(lines: I, header_discount: Money, tax_rate: Decimal) -> Totals
where
    L: LineAmounts + 'a,
    I: IntoIterator<Item = &'a L>,
{
    let mut line_subtotal = Money::zero();
    let mut line_discount_total = Money::zero();

    for line in lines {
        let gross = line.gross();
        line_subtotal += gross;
        line_discount_total += line.discount().min(gross);
    }

    let subtotal = line_subtotal.saturating_sub(line_discount_total);
    let header_discount = header_discount.min(subtotal);
    let taxable_amount = subtotal.saturating_sub(header_discount);
    let tax_amount = taxable_amount.apply_rate(tax_rate);

    Totals {
        line_subtotal,
        line_discount_total,
        subtotal,
        header_discount,
        taxable_amount,
        tax_rate,
        tax_amount,
        total: taxable_amount + tax_amount,
    }
}
