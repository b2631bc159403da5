//! Domain Router
//!
//! Maps free text to a named query operation. Routing is pure and deterministic:
//! input is lower-cased and checked against ordered rule tables. A rule is a
//! conjunction of keyword groups; a group matches when any of its keywords
//! occurs as a substring. The first matching rule wins.
//!
//! Two levels use the same mechanism:
//! - [`dispatch`] picks a domain (or help, or a "coming soon" notice)
//! - [`route`] picks an operation inside a domain

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};

/// Query domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Sales,
    Inventory,
    Cashflow,
}

impl Domain {
    pub const ALL: [Self; 3] = [Self::Sales, Self::Inventory, Self::Cashflow];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Inventory => "inventory",
            Self::Cashflow => "cashflow",
        }
    }

    /// Operation used when no rule in the domain matches
    #[must_use]
    pub const fn default_operation(&self) -> Operation {
        match self {
            Self::Sales => Operation::SalesSummary,
            Self::Inventory => Operation::InventorySummary,
            Self::Cashflow => Operation::CashflowSummary,
        }
    }

    fn rules(&self) -> &'static [Rule<Operation>] {
        match self {
            Self::Sales => SALES_RULES,
            Self::Inventory => INVENTORY_RULES,
            Self::Cashflow => CASHFLOW_RULES,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sales" => Ok(Self::Sales),
            "inventory" => Ok(Self::Inventory),
            "cashflow" | "cash flow" | "cash_flow" => Ok(Self::Cashflow),
            other => Err(AppError::validation(format!("Unknown domain '{other}'"))),
        }
    }
}

/// Named query operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Operation {
    SalesSummary,
    SalesForecast,
    RegionalSales,
    ProductSales,
    TopProducts,
    InvoiceCreationGuide,
    InventorySummary,
    InventoryRisk,
    LowStockItems,
    OutOfStockItems,
    ProductInventory,
    CashflowSummary,
    TransactionBreakdown,
}

impl Operation {
    pub const ALL: [Self; 13] = [
        Self::SalesSummary,
        Self::SalesForecast,
        Self::RegionalSales,
        Self::ProductSales,
        Self::TopProducts,
        Self::InvoiceCreationGuide,
        Self::InventorySummary,
        Self::InventoryRisk,
        Self::LowStockItems,
        Self::OutOfStockItems,
        Self::ProductInventory,
        Self::CashflowSummary,
        Self::TransactionBreakdown,
    ];

    /// Stable name, also accepted by [`FromStr`]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SalesSummary => "get_sales_summary",
            Self::SalesForecast => "get_sales_forecast",
            Self::RegionalSales => "get_regional_sales",
            Self::ProductSales => "get_product_sales",
            Self::TopProducts => "get_top_products",
            Self::InvoiceCreationGuide => "get_invoice_creation_guide",
            Self::InventorySummary => "get_inventory_summary",
            Self::InventoryRisk => "get_inventory_risk",
            Self::LowStockItems => "get_low_stock_items",
            Self::OutOfStockItems => "get_out_of_stock_items",
            Self::ProductInventory => "get_product_inventory",
            Self::CashflowSummary => "get_cashflow_summary",
            Self::TransactionBreakdown => "get_transaction_breakdown",
        }
    }

    #[must_use]
    pub const fn domain(&self) -> Domain {
        match self {
            Self::SalesSummary
            | Self::SalesForecast
            | Self::RegionalSales
            | Self::ProductSales
            | Self::TopProducts
            | Self::InvoiceCreationGuide => Domain::Sales,
            Self::InventorySummary
            | Self::InventoryRisk
            | Self::LowStockItems
            | Self::OutOfStockItems
            | Self::ProductInventory => Domain::Inventory,
            Self::CashflowSummary | Self::TransactionBreakdown => Domain::Cashflow,
        }
    }

    /// Resolve a name within `domain`; unknown or foreign names fall back to the
    /// domain default.
    #[must_use]
    pub fn in_domain(domain: Domain, name: &str) -> Self {
        match name.parse::<Self>() {
            Ok(op) if op.domain() == domain => op,
            _ => domain.default_operation(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Operation> for &'static str {
    fn from(op: Operation) -> Self {
        op.name()
    }
}

impl FromStr for Operation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.name() == wanted)
            .ok_or_else(|| AppError::validation(format!("Unknown operation '{wanted}'")))
    }
}

/// Outcome of top-level dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Hand the text to a domain's router
    Domain(Domain),
    /// Show the capabilities text
    Help,
    /// Fixed message for a recognized but unsupported request
    Notice(&'static str),
}

/// Ordered keyword conjunction
struct Rule<T> {
    groups: &'static [&'static [&'static str]],
    target: T,
}

impl<T: Copy> Rule<T> {
    fn matches(&self, text: &str) -> bool {
        self.groups.iter().all(|group| contains_any(text, group))
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

fn first_match<T: Copy>(rules: &[Rule<T>], text: &str) -> Option<T> {
    rules.iter().find(|rule| rule.matches(text)).map(|rule| rule.target)
}

const INVOICE_WORDS: &[&str] = &["invoice", "sales invoice", "bill"];

static SALES_RULES: &[Rule<Operation>] = &[
    Rule {
        groups: &[&["create", "new", "how to", "make", "generate", "add"], INVOICE_WORDS],
        target: Operation::InvoiceCreationGuide,
    },
    Rule {
        groups: &[&["forecast", "projection", "prediction"]],
        target: Operation::SalesForecast,
    },
    Rule {
        groups: &[&["region", "area", "territory", "location"]],
        target: Operation::RegionalSales,
    },
    Rule {
        groups: &[&["product", "item", "sku"]],
        target: Operation::ProductSales,
    },
    Rule {
        groups: &[&["top", "best", "popular", "leading"]],
        target: Operation::TopProducts,
    },
];

static INVENTORY_RULES: &[Rule<Operation>] = &[
    Rule {
        groups: &[&["risk", "stockout", "prediction", "alert"]],
        target: Operation::InventoryRisk,
    },
    Rule {
        groups: &[&["low", "minimum"]],
        target: Operation::LowStockItems,
    },
    Rule {
        groups: &[&["out of stock", "zero"]],
        target: Operation::OutOfStockItems,
    },
    Rule {
        groups: &[&["product", "item"]],
        target: Operation::ProductInventory,
    },
];

static CASHFLOW_RULES: &[Rule<Operation>] = &[Rule {
    groups: &[&["breakdown", "detail", "category", "type", "overview"]],
    target: Operation::TransactionBreakdown,
}];

pub const PURCHASE_GUIDE_NOTICE: &str = "Purchase invoice creation guide coming soon!";
pub const PAYMENT_GUIDE_NOTICE: &str = "Payment voucher creation guide coming soon!";

const PROCEDURE_WORDS: &[&str] =
    &["how to", "how do i", "create", "make", "generate", "add", "new"];

static PROCEDURE_RULES: &[Rule<Intent>] = &[
    Rule {
        groups: &[PROCEDURE_WORDS, INVOICE_WORDS],
        target: Intent::Domain(Domain::Sales),
    },
    Rule {
        groups: &[PROCEDURE_WORDS, &["purchase", "vendor", "supplier"]],
        target: Intent::Notice(PURCHASE_GUIDE_NOTICE),
    },
    Rule {
        groups: &[PROCEDURE_WORDS, &["payment", "voucher", "receipt"]],
        target: Intent::Notice(PAYMENT_GUIDE_NOTICE),
    },
];

static DOMAIN_RULES: &[Rule<Intent>] = &[
    Rule {
        groups: &[&["cash", "flow", "financial", "payment", "voucher", "liquidity"]],
        target: Intent::Domain(Domain::Cashflow),
    },
    Rule {
        groups: &[&["sales", "revenue", "invoice", "order", "sell", "customer"]],
        target: Intent::Domain(Domain::Sales),
    },
    Rule {
        groups: &[&["inventory", "stock", "warehouse", "quantity", "low stock", "out of stock"]],
        target: Intent::Domain(Domain::Inventory),
    },
    Rule {
        groups: &[&["help", "what can", "assist", "support", "guide", "manual"]],
        target: Intent::Help,
    },
];

/// Choose the operation for `text` inside `domain`
#[must_use]
pub fn route(text: &str, domain: Domain) -> Operation {
    let lowered = text.to_lowercase();
    first_match(domain.rules(), &lowered).unwrap_or_else(|| domain.default_operation())
}

/// Top-level dispatch, or `None` when no keyword matched at all
#[must_use]
pub fn try_dispatch(text: &str) -> Option<Intent> {
    let lowered = text.to_lowercase();
    first_match(PROCEDURE_RULES, &lowered).or_else(|| first_match(DOMAIN_RULES, &lowered))
}

/// Top-level dispatch; unmatched text goes to sales
#[must_use]
pub fn dispatch(text: &str) -> Intent {
    try_dispatch(text).unwrap_or(Intent::Domain(Domain::Sales))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
        assert!("get_everything".parse::<Operation>().is_err());
    }

    #[test]
    fn test_operation_serializes_as_name() {
        assert_eq!(
            serde_json::to_string(&Operation::LowStockItems).unwrap(),
            r#""get_low_stock_items""#
        );
    }

    #[test]
    fn test_in_domain_falls_back_to_default() {
        assert_eq!(Operation::in_domain(Domain::Sales, "get_top_products"), Operation::TopProducts);
        assert_eq!(Operation::in_domain(Domain::Sales, "nonsense"), Operation::SalesSummary);
        // Valid name from another domain is not honored
        assert_eq!(
            Operation::in_domain(Domain::Cashflow, "get_inventory_risk"),
            Operation::CashflowSummary
        );
    }

    #[test]
    fn test_domain_from_str() {
        assert_eq!("Cash Flow".parse::<Domain>().unwrap(), Domain::Cashflow);
        assert_eq!("inventory".parse::<Domain>().unwrap(), Domain::Inventory);
        assert!("payroll".parse::<Domain>().is_err());
    }

    // Sales routing

    #[test]
    fn test_create_invoice_routes_to_guide() {
        assert_eq!(
            route("How do I create a sales invoice?", Domain::Sales),
            Operation::InvoiceCreationGuide
        );
        assert_eq!(route("make a new BILL", Domain::Sales), Operation::InvoiceCreationGuide);
    }

    #[test]
    fn test_create_without_invoice_is_not_guide() {
        assert_eq!(route("create a forecast", Domain::Sales), Operation::SalesForecast);
    }

    #[test]
    fn test_sales_rules_in_order() {
        assert_eq!(route("sales forecast", Domain::Sales), Operation::SalesForecast);
        assert_eq!(route("sales by region", Domain::Sales), Operation::RegionalSales);
        assert_eq!(route("product sales", Domain::Sales), Operation::ProductSales);
        assert_eq!(route("top sellers", Domain::Sales), Operation::TopProducts);
        // First match wins: "product" precedes "top"
        assert_eq!(route("top products", Domain::Sales), Operation::ProductSales);
        assert_eq!(route("Show me sales summary", Domain::Sales), Operation::SalesSummary);
    }

    // Inventory routing

    #[test]
    fn test_inventory_rules_in_order() {
        assert_eq!(route("any inventory alerts?", Domain::Inventory), Operation::InventoryRisk);
        assert_eq!(route("low stock", Domain::Inventory), Operation::LowStockItems);
        assert_eq!(route("what is out of stock", Domain::Inventory), Operation::OutOfStockItems);
        assert_eq!(route("stock per item", Domain::Inventory), Operation::ProductInventory);
        assert_eq!(route("inventory", Domain::Inventory), Operation::InventorySummary);
    }

    // Cashflow routing

    #[test]
    fn test_cashflow_rules() {
        assert_eq!(route("cash flow breakdown", Domain::Cashflow), Operation::TransactionBreakdown);
        assert_eq!(
            route("What's our cash flow position?", Domain::Cashflow),
            Operation::CashflowSummary
        );
    }

    // Top-level dispatch

    #[test]
    fn test_procedure_intents_take_priority() {
        assert_eq!(dispatch("How do I create a sales invoice?"), Intent::Domain(Domain::Sales));
        assert_eq!(dispatch("create a purchase order"), Intent::Notice(PURCHASE_GUIDE_NOTICE));
        assert_eq!(dispatch("how to add a payment voucher"), Intent::Notice(PAYMENT_GUIDE_NOTICE));
    }

    #[test]
    fn test_procedure_word_alone_falls_through() {
        // "new" with no document type continues to keyword dispatch
        assert_eq!(dispatch("new stock arrivals"), Intent::Domain(Domain::Inventory));
    }

    #[test]
    fn test_domain_priority_is_positional() {
        assert_eq!(dispatch("cash from sales"), Intent::Domain(Domain::Cashflow));
        assert_eq!(dispatch("sales of stock"), Intent::Domain(Domain::Sales));
        assert_eq!(dispatch("warehouse quantity"), Intent::Domain(Domain::Inventory));
    }

    #[test]
    fn test_help_and_default() {
        assert_eq!(dispatch("what can you do"), Intent::Help);
        assert_eq!(try_dispatch("good morning"), None);
        assert_eq!(dispatch("good morning"), Intent::Domain(Domain::Sales));
    }

    #[test]
    fn test_routing_is_case_insensitive() {
        assert_eq!(dispatch("INVENTORY"), Intent::Domain(Domain::Inventory));
        assert_eq!(route("FORECAST", Domain::Sales), Operation::SalesForecast);
    }
}
