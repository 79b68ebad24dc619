// common/src/models/role.rs
//! The role table: every role-to-route and role-to-navigation mapping lives
//! here and nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VanguardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Supplier,
    Vendor,
    Customer,
    // Older profiles stored the short form
    #[serde(alias = "expert")]
    BlockchainExpert,
}

/// A sidebar entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
}

const fn nav(href: &'static str, label: &'static str) -> NavItem {
    NavItem { href, label }
}

const SUPPLIER_NAV: &[NavItem] = &[
    nav("/supplier", "Dashboard"),
    nav("/supplier/products", "Products"),
    nav("/supplier/inventory", "Inventory"),
    nav("/supplier/transactions", "Transactions"),
    nav("/supplier/vendors", "Vendors"),
    nav("/supplier/analytics", "Analytics"),
];

const VENDOR_NAV: &[NavItem] = &[
    nav("/vendor", "Dashboard"),
    nav("/vendor/add-product", "Add Product"),
    nav("/vendor/my-products", "My Products"),
    nav("/vendor/orders", "Orders"),
    nav("/vendor/customers", "Customers"),
    nav("/vendor/analytics", "Analytics"),
    nav("/vendor/sales-history", "Sales History"),
];

const CUSTOMER_NAV: &[NavItem] = &[
    nav("/customer", "Dashboard"),
    nav("/customer/browse", "Browse Products"),
    nav("/customer/cart", "My Cart"),
    nav("/customer/orders", "My Orders"),
    nav("/customer/history", "Order History"),
];

const EXPERT_NAV: &[NavItem] = &[
    nav("/blockchain-expert", "Dashboard"),
    nav("/blockchain-expert/all-transactions", "All Transactions"),
    nav("/blockchain-expert/blockchain-logs", "Blockchain Logs"),
    nav("/blockchain-expert/consensus", "Consensus"),
    nav("/blockchain-expert/security", "Security"),
    nav("/blockchain-expert/fault-tolerance", "Fault Tolerance"),
    nav("/blockchain-expert/system-health", "System Health"),
];

impl Role {
    pub const ALL: [Role; 4] = [Role::Supplier, Role::Vendor, Role::Customer, Role::BlockchainExpert];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Supplier => "supplier",
            Role::Vendor => "vendor",
            Role::Customer => "customer",
            Role::BlockchainExpert => "blockchain-expert",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Supplier => "SUPPLIER",
            Role::Vendor => "VENDOR",
            Role::Customer => "CUSTOMER",
            Role::BlockchainExpert => "BLOCKCHAIN EXPERT",
        }
    }

    /// Dashboard root, `/{role}`
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Supplier => "/supplier",
            Role::Vendor => "/vendor",
            Role::Customer => "/customer",
            Role::BlockchainExpert => "/blockchain-expert",
        }
    }

    pub fn navigation(&self) -> &'static [NavItem] {
        match self {
            Role::Supplier => SUPPLIER_NAV,
            Role::Vendor => VENDOR_NAV,
            Role::Customer => CUSTOMER_NAV,
            Role::BlockchainExpert => EXPERT_NAV,
        }
    }

    pub fn sidebar_title(&self) -> &'static str {
        match self {
            Role::Vendor => "Vendor Portal",
            _ => "Navigation",
        }
    }

    /// Supplier and vendor profiles carry company details
    pub fn is_business(&self) -> bool {
        matches!(self, Role::Supplier | Role::Vendor)
    }

    /// True for the dashboard root and anything below it
    pub fn owns_path(&self, path: &str) -> bool {
        let root = self.dashboard_path();
        match path.strip_prefix(root) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// The role whose dashboard contains `path`, if any
    pub fn for_path(path: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.owns_path(path))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = VanguardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supplier" => Ok(Role::Supplier),
            "vendor" => Ok(Role::Vendor),
            "customer" => Ok(Role::Customer),
            "blockchain-expert" | "expert" => Ok(Role::BlockchainExpert),
            other => Err(VanguardError::validation(format!("Unknown role: {}", other))),
        }
    }
}
