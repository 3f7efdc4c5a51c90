use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

/// Months of a yearly subscription a plan is not charged for.
/// Plans billed yearly pay 10 of 12 months; add-ons always pay the full 12.
pub const YEARLY_DISCOUNT_MONTHS: u32 = 2;

/// A hosting plan offered by the platform.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub monthly_price: Decimal,
    pub target_audience: String,
    pub limits: String,
}

/// An add-on product (presence-only, quantity fixed at 1 in carts).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Addon {
    pub id: String,
    pub name: String,
    pub monthly_price: Decimal,
}

/// Static plan catalog, fixed at process start. Prices must match the
/// storefront pricing page.
static PLANS: Lazy<HashMap<&'static str, Plan>> = Lazy::new(|| {
    let mut plans = HashMap::new();
    plans.insert(
        "static-micro",
        Plan {
            id: "static-micro".to_string(),
            name: "Static Micro".to_string(),
            monthly_price: dec!(3.90),
            target_audience: "React/Vue SPAs".to_string(),
            limits: "Shared RAM, 1GB Storage".to_string(),
        },
    );
    plans.insert(
        "node-starter",
        Plan {
            id: "node-starter".to_string(),
            name: "Node Starter".to_string(),
            monthly_price: dec!(9.90),
            target_audience: "Personal Blogs".to_string(),
            limits: "1 vCPU (Shared), 512MB RAM, 5GB Storage".to_string(),
        },
    );
    plans.insert(
        "node-pro",
        Plan {
            id: "node-pro".to_string(),
            name: "Node Pro".to_string(),
            monthly_price: dec!(39.90),
            target_audience: "E-commerce/SaaS".to_string(),
            limits: "2 vCPU (Dedicated), 4GB RAM, 20GB Storage".to_string(),
        },
    );
    plans
});

static ADDONS: Lazy<HashMap<&'static str, Addon>> = Lazy::new(|| {
    let mut addons = HashMap::new();
    addons.insert(
        "de-domain",
        Addon {
            id: "de-domain".to_string(),
            name: ".de Domain".to_string(),
            monthly_price: dec!(1.00),
        },
    );
    addons
});

/// Looks up a plan by id. `None` means the id is not sellable and callers
/// should treat it as a validation error, not a missing resource.
pub fn lookup_plan(id: &str) -> Option<&'static Plan> {
    PLANS.get(id)
}

/// Looks up an add-on by id.
pub fn lookup_addon(id: &str) -> Option<&'static Addon> {
    ADDONS.get(id)
}

/// All plans, cheapest first.
pub fn plans() -> Vec<&'static Plan> {
    let mut plans: Vec<_> = PLANS.values().collect();
    plans.sort_by(|a, b| a.monthly_price.cmp(&b.monthly_price));
    plans
}

/// All add-ons, cheapest first.
pub fn addons() -> Vec<&'static Addon> {
    let mut addons: Vec<_> = ADDONS.values().collect();
    addons.sort_by(|a, b| a.monthly_price.cmp(&b.monthly_price));
    addons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_plan() {
        let plan = lookup_plan("node-starter").expect("node-starter should exist");
        assert_eq!(plan.name, "Node Starter");
        assert_eq!(plan.monthly_price, dec!(9.90));
    }

    #[test]
    fn lookup_unknown_plan_returns_none() {
        assert!(lookup_plan("node-ultra").is_none());
        assert!(lookup_plan("").is_none());
    }

    #[test]
    fn lookup_known_addon() {
        let addon = lookup_addon("de-domain").expect("de-domain should exist");
        assert_eq!(addon.monthly_price, dec!(1.00));
    }

    #[test]
    fn plan_ids_are_not_addon_ids() {
        for plan in plans() {
            assert!(lookup_addon(&plan.id).is_none());
        }
    }

    #[test]
    fn plans_sorted_by_price() {
        let prices: Vec<_> = plans().iter().map(|p| p.monthly_price).collect();
        let mut sorted = prices.clone();
        sorted.sort();
        assert_eq!(prices, sorted);
    }
}
