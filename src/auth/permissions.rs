/*!
 * # Permissions Module
 *
 * Permission strings checked by route guards, the shop's staff roles,
 * and the default permission set each role is issued with.
 */

/// Staff roles carried in the `roles` claim.
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const TECHNICIAN: &str = "technician";
    pub const CUSTOMER_CARE: &str = "customer-care";
    pub const CASHIER: &str = "cashier";

    pub const ALL: [&str; 4] = [ADMIN, TECHNICIAN, CUSTOMER_CARE, CASHIER];
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Customers & loyalty
    pub const CUSTOMERS_READ: &str = "customers:read";
    pub const CUSTOMERS_WRITE: &str = "customers:write";

    // Inventory
    pub const INVENTORY_READ: &str = "inventory:read";
    pub const INVENTORY_ADJUST: &str = "inventory:adjust";

    // Point of sale
    pub const SALES_CREATE: &str = "sales:create";
    pub const SALES_READ: &str = "sales:read";

    // Procurement
    pub const PURCHASE_ORDERS_MANAGE: &str = "purchaseorders:manage";

    // Repairs
    pub const REPAIRS_READ: &str = "repairs:read";
    pub const REPAIRS_UPDATE: &str = "repairs:update";

    // Payments
    pub const PAYMENTS_READ: &str = "payments:read";
    pub const PAYMENTS_MANAGE: &str = "payments:manage";

    // Back office
    pub const FINANCE_MANAGE: &str = "finance:manage";
    pub const NOTIFICATIONS_SEND: &str = "notifications:send";
    pub const SETTINGS_MANAGE: &str = "settings:manage";

    pub const ALL: [&str; 14] = [
        CUSTOMERS_READ,
        CUSTOMERS_WRITE,
        INVENTORY_READ,
        INVENTORY_ADJUST,
        SALES_CREATE,
        SALES_READ,
        PURCHASE_ORDERS_MANAGE,
        REPAIRS_READ,
        REPAIRS_UPDATE,
        PAYMENTS_READ,
        PAYMENTS_MANAGE,
        FINANCE_MANAGE,
        NOTIFICATIONS_SEND,
        SETTINGS_MANAGE,
    ];
}

/// Returns the permissions a token for `role` is issued with.
///
/// Admins receive every permission even though the guard lets them through
/// regardless; unknown roles receive nothing.
pub fn permissions_for_role(role: &str) -> Vec<String> {
    use consts::*;

    let perms: &[&str] = match role {
        roles::ADMIN => &ALL,
        roles::TECHNICIAN => &[CUSTOMERS_READ, INVENTORY_READ, REPAIRS_READ, REPAIRS_UPDATE],
        roles::CUSTOMER_CARE => &[
            CUSTOMERS_READ,
            CUSTOMERS_WRITE,
            SALES_READ,
            REPAIRS_READ,
            REPAIRS_UPDATE,
            PAYMENTS_READ,
            NOTIFICATIONS_SEND,
        ],
        roles::CASHIER => &[
            CUSTOMERS_READ,
            CUSTOMERS_WRITE,
            INVENTORY_READ,
            SALES_CREATE,
            SALES_READ,
            PAYMENTS_READ,
            PAYMENTS_MANAGE,
        ],
        _ => &[],
    };

    perms.iter().map(|p| p.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cashier_can_sell_but_not_manage_finance() {
        let perms = permissions_for_role(roles::CASHIER);
        assert!(perms.iter().any(|p| p == consts::SALES_CREATE));
        assert!(!perms.iter().any(|p| p == consts::FINANCE_MANAGE));
    }

    #[test]
    fn technician_cannot_create_sales() {
        let perms = permissions_for_role(roles::TECHNICIAN);
        assert!(perms.iter().any(|p| p == consts::REPAIRS_UPDATE));
        assert!(!perms.iter().any(|p| p == consts::SALES_CREATE));
    }

    #[test]
    fn unknown_role_gets_nothing() {
        assert!(permissions_for_role("janitor").is_empty());
    }
}
