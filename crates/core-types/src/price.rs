//! Validation for raw price values entering the core.
//!
//! Collaborators that parse prices from floating point sources go through
//! [`decimal_from_f64`]; everything downstream works in `Decimal`.

use crate::error::CoreError;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Converts a raw floating point price, rejecting non-finite and negative values.
pub fn decimal_from_f64(value: f64, field: &str) -> Result<Decimal, CoreError> {
    if !value.is_finite() {
        return Err(CoreError::InvalidInput(
            field.to_string(),
            format!("{value} is not a finite number"),
        ));
    }
    let decimal = Decimal::from_f64(value).ok_or_else(|| {
        CoreError::InvalidInput(field.to_string(), format!("{value} is out of range"))
    })?;
    ensure_non_negative(decimal, field)
}

pub fn ensure_non_negative(value: Decimal, field: &str) -> Result<Decimal, CoreError> {
    if value < Decimal::ZERO {
        return Err(CoreError::InvalidInput(
            field.to_string(),
            format!("{value} is negative"),
        ));
    }
    Ok(value)
}

pub fn ensure_positive(value: Decimal, field: &str) -> Result<Decimal, CoreError> {
    if value <= Decimal::ZERO {
        return Err(CoreError::InvalidInput(
            field.to_string(),
            format!("{value} must be greater than zero"),
        ));
    }
    Ok(value)
}
