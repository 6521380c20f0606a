//! Input validation shared by create and update.

use rust_decimal::Decimal;

use crate::document::{DocumentHeader, NewDocumentItem};
use crate::error::ValidationError;
use crate::money::Money;
use crate::totals::{Totals, calculate_totals};

/// Validates a header and its lines and returns the totals to store.
///
/// Catalog references are not checked here; that needs the catalog store.
pub fn validate_document(
    header: &DocumentHeader,
    items: &[NewDocumentItem],
) -> Result<Totals, ValidationError> {
    validate_header(header)?;
    validate_items(items)?;
    check_representable(header, items)?;

    let totals = calculate_totals(items, header.discount, header.tax_rate);
    if header.discount.is_negative() || header.discount > totals.subtotal {
        return Err(ValidationError::InvalidHeaderDiscount {
            discount: header.discount,
            max: totals.subtotal,
        });
    }

    Ok(totals)
}

fn validate_header(header: &DocumentHeader) -> Result<(), ValidationError> {
    if header.tax_rate < Decimal::ZERO || header.tax_rate > Decimal::ONE {
        return Err(ValidationError::InvalidTaxRate(header.tax_rate));
    }
    if let Some(code) = &header.code
        && code.trim().is_empty()
    {
        return Err(ValidationError::BlankCode);
    }
    Ok(())
}

fn validate_items(items: &[NewDocumentItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::NoItems);
    }

    for (index, item) in items.iter().enumerate() {
        let line = index + 1;
        if item.quantity == 0 {
            return Err(ValidationError::InvalidQuantity {
                line,
                quantity: item.quantity,
            });
        }
        if item.unit_price.is_negative() {
            return Err(ValidationError::NegativeUnitPrice {
                line,
                price: item.unit_price,
            });
        }
        let max = item
            .unit_price
            .checked_multiply(item.quantity)
            .ok_or(ValidationError::LineAmountOverflow { line })?;
        if item.discount.is_negative() || item.discount > max {
            return Err(ValidationError::InvalidLineDiscount {
                line,
                discount: item.discount,
                max,
            });
        }
    }

    Ok(())
}

/// Runs the totals arithmetic with overflow checks so the calculator never
/// saturates on accepted input.
fn check_representable(
    header: &DocumentHeader,
    items: &[NewDocumentItem],
) -> Result<(), ValidationError> {
    let mut gross_total = Money::zero();
    for (index, item) in items.iter().enumerate() {
        gross_total = item
            .unit_price
            .checked_multiply(item.quantity)
            .and_then(|gross| gross_total.checked_add(gross))
            .ok_or(ValidationError::LineAmountOverflow { line: index + 1 })?;
    }

    gross_total
        .checked_apply_rate(header.tax_rate)
        .and_then(|tax| gross_total.checked_add(tax))
        .map(|_| ())
        .ok_or(ValidationError::TotalOverflow)
}
