use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::YEARLY_DISCOUNT_MONTHS;
use crate::entities::cart::BillingCycle;
use crate::entities::cart_item::{ItemType, Model as CartItemModel};
use crate::errors::ServiceError;

/// Display totals for a cart. Both figures are computed regardless of the
/// selected billing cycle: `monthly` is the monthly-equivalent price,
/// `yearly` the annual-equivalent price. The selected cycle only decides
/// which one is charged at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartTotals {
    #[schema(value_type = String, example = "10.90")]
    pub monthly: Decimal,
    #[schema(value_type = String, example = "111.00")]
    pub yearly: Decimal,
}

/// Computes monthly and yearly totals for a set of cart lines.
///
/// Monthly is the plain sum of `unit_price × quantity`. Yearly bills plans
/// for `12 - YEARLY_DISCOUNT_MONTHS` months (two months free) while add-ons
/// pay the full twelve. An empty cart yields exactly zero for both.
pub fn cart_totals(items: &[CartItemModel]) -> CartTotals {
    let mut plan_monthly = Decimal::ZERO;
    let mut addon_monthly = Decimal::ZERO;

    for item in items {
        let line_monthly = item.unit_price * Decimal::from(item.quantity);
        match item.item_type {
            ItemType::Plan => plan_monthly += line_monthly,
            ItemType::Addon => addon_monthly += line_monthly,
        }
    }

    let charged_months = Decimal::from(12 - YEARLY_DISCOUNT_MONTHS);
    CartTotals {
        monthly: plan_monthly + addon_monthly,
        yearly: plan_monthly * charged_months + addon_monthly * Decimal::from(12),
    }
}

/// Amount charged per billing period for one unit of a line item.
///
/// Monthly billing charges the monthly price every month. Yearly billing
/// charges once per year: ten months' worth for plans, twelve for add-ons.
pub fn recurring_unit_amount(
    unit_price: Decimal,
    item_type: ItemType,
    cycle: BillingCycle,
) -> Decimal {
    match cycle {
        BillingCycle::Monthly => unit_price,
        BillingCycle::Yearly => match item_type {
            ItemType::Plan => unit_price * Decimal::from(12 - YEARLY_DISCOUNT_MONTHS),
            ItemType::Addon => unit_price * Decimal::from(12),
        },
    }
}

/// Converts a major-unit amount into minor currency units, rounding to the
/// nearest integer (half away from zero). Rounding happens per line, before
/// summation, so local totals match what the provider actually charges.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            ServiceError::InternalError(format!("amount out of range for minor units: {}", amount))
        })
}

/// Converts minor units back to a major-unit decimal.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
