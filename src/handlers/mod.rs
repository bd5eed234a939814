pub mod common;
pub mod customers;
pub mod diagnostics;
pub mod finance;
pub mod inventory;
pub mod notifications;
pub mod payment_webhooks;
pub mod payments;
pub mod purchase_orders;
pub mod repairs;
pub mod sales;
pub mod settings;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::notifications::{SmsService, WhatsAppClient};
use crate::services::{
    diagnostics::DiagnosticService, finance::FinanceService, inventory::InventoryService,
    loyalty::LoyaltyService, mobile_money::MobileMoneyService, payment_monitor::PaymentMonitorService,
    payments::PaymentService, purchase_orders::PurchaseOrderService, repairs::RepairService,
    sales::SalesService, settings::SettingsService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub loyalty: Arc<LoyaltyService>,
    pub inventory: Arc<InventoryService>,
    pub sales: Arc<SalesService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
    pub repairs: Arc<RepairService>,
    pub diagnostics: Arc<DiagnosticService>,
    pub payments: Arc<PaymentService>,
    pub mobile_money: Arc<MobileMoneyService>,
    pub payment_monitor: Arc<PaymentMonitorService>,
    pub finance: Arc<FinanceService>,
    pub settings: Arc<SettingsService>,
    pub sms: Arc<SmsService>,
    pub whatsapp: Arc<WhatsAppClient>,
}

impl AppServices {
    /// Wires every service onto the shared pool and event channel.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        let settings = Arc::new(SettingsService::new(db_pool.clone()));
        let sms = Arc::new(SmsService::new(
            db_pool.clone(),
            event_sender.clone(),
            settings.clone(),
            config,
        )?);

        Ok(Self {
            loyalty: Arc::new(LoyaltyService::new(db_pool.clone(), event_sender.clone())),
            inventory: Arc::new(InventoryService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            sales: Arc::new(SalesService::new(
                db_pool.clone(),
                event_sender.clone(),
                sms.clone(),
                config.sales_tax_rate,
            )),
            purchase_orders: Arc::new(PurchaseOrderService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            repairs: Arc::new(RepairService::new(
                db_pool.clone(),
                event_sender.clone(),
                sms.clone(),
            )),
            diagnostics: Arc::new(DiagnosticService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            payments: Arc::new(PaymentService::new(db_pool.clone(), event_sender.clone())),
            mobile_money: Arc::new(MobileMoneyService::new(
                db_pool.clone(),
                event_sender.clone(),
                config,
            )?),
            payment_monitor: Arc::new(PaymentMonitorService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.payment_monitor_window_hours,
            )),
            finance: Arc::new(FinanceService::new(
                db_pool,
                event_sender,
                config.currency.clone(),
            )),
            settings,
            sms,
            whatsapp: Arc::new(WhatsAppClient::new(config)?),
        })
    }
}
