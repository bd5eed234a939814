use crate::{
    db::{with_transaction, DbPool},
    entities::{
        expense,
        finance_account::{self, AccountType},
        transfer,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAccountInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub account_type: AccountType,
    #[schema(value_type = Option<String>)]
    pub opening_balance: Option<Decimal>,
    #[validate(length(max = 64))]
    pub account_number: Option<String>,
    #[validate(length(max = 255))]
    pub bank_name: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub is_payment_method: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordExpenseInput {
    pub account_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[schema(value_type = String, example = "25000")]
    pub amount: Decimal,
    pub expense_date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TransferInput {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    #[schema(value_type = String, example = "100000")]
    pub amount: Decimal,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FinanceSummary {
    /// Total balance of active accounts, keyed by currency
    #[schema(value_type = Object)]
    pub balances: BTreeMap<String, Decimal>,
    /// Total expenses keyed by category
    #[schema(value_type = Object)]
    pub expenses_by_category: BTreeMap<String, Decimal>,
    pub account_count: usize,
}

/// Balance after taking `amount` out of an account of the given type.
pub fn debit_balance(
    account_type: AccountType,
    balance: Decimal,
    amount: Decimal,
) -> Result<Decimal, ServiceError> {
    let remaining = balance.checked_sub(amount).ok_or_else(out_of_range)?;
    if remaining < Decimal::ZERO && !account_type.allows_overdraft() {
        return Err(ServiceError::InvalidOperation(
            "Insufficient balance".to_string(),
        ));
    }
    Ok(remaining)
}

fn out_of_range() -> ServiceError {
    ServiceError::ValidationError("Balance is out of range".to_string())
}

/// Order in which a transfer locks its two accounts.
///
/// Always the lower id first, so opposite transfers between the same pair
/// wait on each other instead of deadlocking.
pub fn lock_order(from: Uuid, to: Uuid) -> (Uuid, Uuid) {
    if from <= to {
        (from, to)
    } else {
        (to, from)
    }
}

fn require_positive(amount: Decimal) -> Result<(), ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

async fn lock_account<C: ConnectionTrait>(
    conn: &C,
    account_id: Uuid,
) -> Result<finance_account::Model, ServiceError> {
    let mut query = finance_account::Entity::find_by_id(account_id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    let account = query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", account_id)))?;
    if !account.is_active {
        return Err(ServiceError::InvalidOperation(format!(
            "Account {} is inactive",
            account.name
        )));
    }
    Ok(account)
}

async fn set_balance<C: ConnectionTrait>(
    conn: &C,
    account: finance_account::Model,
    balance: Decimal,
) -> Result<finance_account::Model, ServiceError> {
    let mut model: finance_account::ActiveModel = account.into();
    model.balance = Set(balance);
    Ok(model.update(conn).await?)
}

/// Accounts, expenses and transfers between accounts
#[derive(Clone)]
pub struct FinanceService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    default_currency: String,
}

impl FinanceService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        default_currency: String,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            default_currency,
        }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<finance_account::Model, ServiceError> {
        input.validate()?;
        let account = finance_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            account_type: Set(input.account_type),
            balance: Set(input.opening_balance.unwrap_or(Decimal::ZERO)),
            account_number: Set(input.account_number),
            bank_name: Set(input.bank_name),
            currency: Set(input
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| self.default_currency.clone())),
            is_active: Set(true),
            is_payment_method: Set(input.is_payment_method.unwrap_or(false)),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(account_id = %account.id, "Finance account created");
        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn list_accounts(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<finance_account::Model>, ServiceError> {
        let mut query = finance_account::Entity::find();
        if !include_inactive {
            query = query.filter(finance_account::Column::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(finance_account::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_account(&self, account_id: Uuid) -> Result<finance_account::Model, ServiceError> {
        finance_account::Entity::find_by_id(account_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", account_id)))
    }

    /// Records an expense and debits its account in one transaction.
    #[instrument(skip(self, input), fields(account_id = %input.account_id))]
    pub async fn record_expense(
        &self,
        input: RecordExpenseInput,
        actor: &str,
    ) -> Result<expense::Model, ServiceError> {
        input.validate()?;
        require_positive(input.amount)?;
        let actor = actor.to_string();

        let expense = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let account = lock_account(txn, input.account_id).await?;
                let balance = debit_balance(account.account_type, account.balance, input.amount)?;
                set_balance(txn, account, balance).await?;

                let now = Utc::now();
                Ok(expense::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    account_id: Set(input.account_id),
                    category: Set(input.category),
                    description: Set(input.description),
                    amount: Set(input.amount),
                    expense_date: Set(input.expense_date.unwrap_or_else(|| now.date_naive())),
                    reference: Set(input.reference),
                    created_by: Set(actor),
                    created_at: Set(now),
                }
                .insert(txn)
                .await?)
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::ExpenseRecorded {
                expense_id: expense.id,
                account_id: expense.account_id,
                amount: expense.amount,
            })
            .await;
        info!(expense_id = %expense.id, amount = %expense.amount, "Expense recorded");
        Ok(expense)
    }

    #[instrument(skip(self))]
    pub async fn list_expenses(
        &self,
        account_id: Option<Uuid>,
        category: Option<String>,
    ) -> Result<Vec<expense::Model>, ServiceError> {
        let mut query = expense::Entity::find();
        if let Some(account_id) = account_id {
            query = query.filter(expense::Column::AccountId.eq(account_id));
        }
        if let Some(category) = category {
            query = query.filter(expense::Column::Category.eq(category));
        }
        Ok(query
            .order_by_desc(expense::Column::ExpenseDate)
            .order_by_desc(expense::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    /// Moves money between two accounts of the same currency.
    #[instrument(skip(self, input), fields(from = %input.from_account_id, to = %input.to_account_id))]
    pub async fn transfer(
        &self,
        input: TransferInput,
        actor: &str,
    ) -> Result<transfer::Model, ServiceError> {
        input.validate()?;
        require_positive(input.amount)?;
        if input.from_account_id == input.to_account_id {
            return Err(ServiceError::ValidationError(
                "Cannot transfer to the same account".to_string(),
            ));
        }
        let actor = actor.to_string();

        let transfer = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let (first, second) = lock_order(input.from_account_id, input.to_account_id);
                let first = lock_account(txn, first).await?;
                let second = lock_account(txn, second).await?;
                let (from, to) = if first.id == input.from_account_id {
                    (first, second)
                } else {
                    (second, first)
                };
                if from.currency != to.currency {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Currency mismatch: {} to {}",
                        from.currency, to.currency
                    )));
                }

                let from_balance = debit_balance(from.account_type, from.balance, input.amount)?;
                let to_balance = to.balance.checked_add(input.amount).ok_or_else(out_of_range)?;
                set_balance(txn, from, from_balance).await?;
                set_balance(txn, to, to_balance).await?;

                Ok(transfer::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    from_account_id: Set(input.from_account_id),
                    to_account_id: Set(input.to_account_id),
                    amount: Set(input.amount),
                    description: Set(input.description),
                    created_by: Set(actor),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await?)
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::FundsTransferred {
                transfer_id: transfer.id,
                from_account_id: transfer.from_account_id,
                to_account_id: transfer.to_account_id,
                amount: transfer.amount,
            })
            .await;
        info!(transfer_id = %transfer.id, amount = %transfer.amount, "Funds transferred");
        Ok(transfer)
    }

    #[instrument(skip(self))]
    pub async fn list_transfers(
        &self,
        account_id: Option<Uuid>,
    ) -> Result<Vec<transfer::Model>, ServiceError> {
        let mut query = transfer::Entity::find();
        if let Some(account_id) = account_id {
            query = query.filter(
                transfer::Column::FromAccountId
                    .eq(account_id)
                    .or(transfer::Column::ToAccountId.eq(account_id)),
            );
        }
        Ok(query
            .order_by_desc(transfer::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<FinanceSummary, ServiceError> {
        let db = &*self.db_pool;
        let accounts = finance_account::Entity::find()
            .filter(finance_account::Column::IsActive.eq(true))
            .all(db)
            .await?;
        let expenses = expense::Entity::find().all(db).await?;

        let mut balances: BTreeMap<String, Decimal> = BTreeMap::new();
        for account in &accounts {
            *balances.entry(account.currency.clone()).or_default() += account.balance;
        }
        let mut expenses_by_category: BTreeMap<String, Decimal> = BTreeMap::new();
        for expense in &expenses {
            *expenses_by_category
                .entry(expense.category.clone())
                .or_default() += expense.amount;
        }

        Ok(FinanceSummary {
            balances,
            expenses_by_category,
            account_count: accounts.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn opposite_transfers_lock_in_the_same_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(lock_order(a, b), lock_order(b, a));
        let (first, second) = lock_order(a, b);
        assert!(first < second);
        assert_eq!(lock_order(a, a), (a, a));
    }

    #[test]
    fn debit_beyond_decimal_range_is_rejected() {
        let err = debit_balance(AccountType::CreditCard, Decimal::MIN, dec!(1)).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn debit_rejects_overdraft_except_credit_cards() {
        assert_eq!(
            debit_balance(AccountType::Cash, dec!(1000), dec!(400)).ok(),
            Some(dec!(600))
        );
        assert!(matches!(
            debit_balance(AccountType::Bank, dec!(100), dec!(400)),
            Err(ServiceError::InvalidOperation(msg)) if msg == "Insufficient balance"
        ));
        assert_eq!(
            debit_balance(AccountType::CreditCard, dec!(100), dec!(400)).ok(),
            Some(dec!(-300))
        );
    }
}
