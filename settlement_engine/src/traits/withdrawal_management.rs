use crate::{
    db_types::{LedgerActor, NewWithdrawal, Withdrawal, WithdrawalDecision},
    errors::SettlementError,
    settlement::ledger::LedgerSubject,
};

#[allow(async_fn_in_trait)]
pub trait WithdrawalManagement: Clone {
    /// Records a pending withdrawal, provided the actor can afford it, in a single atomic transaction.
    ///
    /// The pending record is written first, and the ledger for `subject` is then folded inside the same transaction.
    /// If the fold shows a negative available balance, the transaction is rolled back and
    /// `ConflictError::InsufficientBalance` is returned. Two concurrent requests can therefore never spend the same
    /// funds.
    async fn insert_withdrawal(
        &self,
        withdrawal: NewWithdrawal,
        subject: &LedgerSubject,
    ) -> Result<Withdrawal, SettlementError>;

    /// Applies an admin decision to a pending withdrawal. The update only matches a record whose status is still
    /// `pending`; anything else is an `InvariantViolation`.
    async fn resolve_withdrawal(
        &self,
        id: i64,
        decision: WithdrawalDecision,
        processed_by: &str,
    ) -> Result<Withdrawal, SettlementError>;

    async fn fetch_withdrawal(&self, id: i64) -> Result<Option<Withdrawal>, SettlementError>;

    /// The actor's withdrawal history, oldest first. The platform never withdraws, so its history is empty.
    async fn fetch_withdrawals_for_actor(&self, actor: &LedgerActor) -> Result<Vec<Withdrawal>, SettlementError>;
}
