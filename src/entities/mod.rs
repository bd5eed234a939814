//! SeaORM entities, one module per table.

// Customers & loyalty
pub mod customer;
pub mod points_transaction;

// Inventory
pub mod inventory_adjustment;
pub mod inventory_item;
pub mod product;
pub mod product_variant;
pub mod serial_movement;
pub mod stock_movement;

// Point of sale
pub mod receipt;
pub mod sale;
pub mod sale_item;

// Procurement
pub mod purchase_order;
pub mod purchase_order_audit;
pub mod purchase_order_item;
pub mod purchase_order_message;
pub mod purchase_order_payment;
pub mod quality_check;
pub mod supplier;

// Repairs
pub mod device;
pub mod device_transition;
pub mod repair_part;
pub mod spare_part;

// Diagnostics
pub mod diagnostic_check;
pub mod diagnostic_device;
pub mod diagnostic_request;
pub mod diagnostic_template;

// Payments
pub mod customer_payment;
pub mod mobile_money_order;
pub mod payment_metric;
pub mod security_alert;

// Finance
pub mod expense;
pub mod finance_account;
pub mod transfer;

pub mod setting;
pub mod sms_log;
