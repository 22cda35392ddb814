//! Discount Data

use jiff::civil::Date;
use mival::discounts::DiscountKind;
use rust_decimal::Decimal;

/// New Discount Code Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDiscountCode {
    pub code: String,
    pub value: Decimal,
    pub kind: DiscountKind,
    pub starts_on: Date,
    pub ends_on: Date,
    pub is_active: bool,
    pub is_accumulable: bool,
}
