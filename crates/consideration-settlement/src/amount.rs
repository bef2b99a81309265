//! Time-based amount interpolation.
//!
//! An item whose `start_amount` differs from its `end_amount` moves linearly
//! between the two over the order's `[start_time, end_time)` window. Offer
//! amounts round down and consideration amounts round up, so rounding always
//! favours the offerer.

use chrono::{DateTime, Utc};
use consideration_types::{ConsiderationError, Result};
use rust_decimal::Decimal;

/// Which way a fractional base unit is rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// The amount due at `now` for an item ramping from `start_amount` to
/// `end_amount`. `now` must already be inside the window.
pub fn current_amount(
    start_amount: Decimal,
    end_amount: Decimal,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
    rounding: Rounding,
) -> Result<Decimal> {
    if start_amount == end_amount {
        return Ok(end_amount);
    }

    let duration = Decimal::from((end_time - start_time).num_seconds());
    if duration <= Decimal::ZERO {
        return Err(ConsiderationError::InvalidTime {
            start_time,
            end_time,
            now,
        });
    }
    let elapsed = Decimal::from((now - start_time).num_seconds()).clamp(Decimal::ZERO, duration);
    let remaining = duration - elapsed;

    let overflow = || ConsiderationError::Internal("amount interpolation overflow".into());
    let total = start_amount
        .checked_mul(remaining)
        .and_then(|a| end_amount.checked_mul(elapsed).and_then(|b| a.checked_add(b)))
        .ok_or_else(overflow)?;
    let exact = total.checked_div(duration).ok_or_else(overflow)?;

    Ok(match rounding {
        Rounding::Down => exact.floor(),
        Rounding::Up => exact.ceil(),
    })
}

/// Sum of `amounts`, failing instead of overflowing.
///
/// # Errors
/// `InvalidItemAmount` if the total exceeds [`Decimal::MAX`].
pub fn checked_total(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount)
            .ok_or_else(|| ConsiderationError::InvalidItemAmount {
                reason: format!("total exceeds {} after adding {amount}", Decimal::MAX),
            })
    })
}
