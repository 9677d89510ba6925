//! # Session Context
//!
//! Everything a sale session needs from its surroundings, passed in
//! explicitly when the session starts.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SessionContext                                                         │
//! │  ├── shop            which pharmacy                                     │
//! │  ├── currency        base currency + rate table                         │
//! │  ├── display_currency starting display currency                         │
//! │  ├── permissions     can_sell_wholesale                                 │
//! │  ├── catalog         product snapshot (stock, prices)                   │
//! │  └── register        cash register + register session ids               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The context deserializes from the props the back office hands the sale
//! screen, so a front end can pass them through unchanged.

use rxpos_core::{Catalog, CurrencyCode, CurrencySettings};
use serde::{Deserialize, Serialize};

use crate::config::RegisterSettings;

/// The shop the register belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// What the signed-in seller may do. Evaluated by the backend; the
/// register only reads the flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub can_sell_wholesale: bool,
}

/// Cash register binding sent with each sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBinding {
    #[serde(default)]
    pub cash_register_id: Option<String>,
    #[serde(default)]
    pub cash_register_session_id: Option<String>,
}

impl From<&RegisterSettings> for RegisterBinding {
    fn from(settings: &RegisterSettings) -> Self {
        RegisterBinding {
            cash_register_id: settings.cash_register_id.clone(),
            cash_register_session_id: settings.cash_register_session_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub shop: ShopInfo,
    pub currency: CurrencySettings,
    /// Display currency a new session starts with. Defaults to the base.
    #[serde(default)]
    pub display_currency: Option<CurrencyCode>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub register: RegisterBinding,
    /// Default tax rate as a percentage.
    #[serde(default)]
    pub tax_rate: f64,
}

impl SessionContext {
    pub fn new(currency: CurrencySettings, catalog: Catalog) -> Self {
        SessionContext {
            shop: ShopInfo::default(),
            currency,
            display_currency: None,
            permissions: Permissions::default(),
            catalog,
            register: RegisterBinding::default(),
            tax_rate: 0.0,
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_register(mut self, register: RegisterBinding) -> Self {
        self.register = register;
        self
    }

    pub fn with_display_currency(mut self, currency: impl Into<CurrencyCode>) -> Self {
        self.display_currency = Some(currency.into());
        self
    }

    pub fn with_tax_rate(mut self, percent: f64) -> Self {
        self.tax_rate = percent;
        self
    }

    /// Fills the register binding from config where the props left it empty.
    pub fn apply_register_defaults(&mut self, settings: &RegisterSettings) {
        if self.register.cash_register_id.is_none() {
            self.register.cash_register_id = settings.cash_register_id.clone();
        }
        if self.register.cash_register_session_id.is_none() {
            self.register.cash_register_session_id = settings.cash_register_session_id.clone();
        }
    }

    pub fn initial_display_currency(&self) -> CurrencyCode {
        self.display_currency
            .clone()
            .unwrap_or_else(|| self.currency.base_currency.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_props() {
        let json = r#"{
            "shop": {"id": "4", "name": "Central Pharmacy"},
            "currency": {"baseCurrency": "USD", "rates": {"USD": 1, "SYP": 13000}},
            "permissions": {"can_sell_wholesale": true},
            "catalog": [{"id": 1, "name": "Vitamin C", "code": "VITC", "stock": 8,
                         "price_amount": 3.5, "price_currency": "USD"}],
            "register": {"cash_register_id": "2"}
        }"#;
        let ctx: SessionContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.shop.name, "Central Pharmacy");
        assert!(ctx.permissions.can_sell_wholesale);
        assert_eq!(ctx.catalog.len(), 1);
        assert_eq!(ctx.initial_display_currency().as_str(), "USD");
        assert_eq!(ctx.register.cash_register_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_register_defaults_fill_gaps_only() {
        let mut ctx = SessionContext::new(CurrencySettings::single("USD"), Catalog::default())
            .with_register(RegisterBinding {
                cash_register_id: Some("9".into()),
                cash_register_session_id: None,
            });
        ctx.apply_register_defaults(&RegisterSettings {
            cash_register_id: Some("1".into()),
            cash_register_session_id: Some("77".into()),
        });
        assert_eq!(ctx.register.cash_register_id.as_deref(), Some("9"));
        assert_eq!(ctx.register.cash_register_session_id.as_deref(), Some("77"));
    }
}
