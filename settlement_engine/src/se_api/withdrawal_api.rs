use std::fmt::Debug;

use log::*;

use crate::{
    config::WithdrawalPolicy,
    db_types::{LedgerActor, NewWithdrawal, Withdrawal, WithdrawalDecision},
    errors::{SettlementError, ValidationError},
    events::{EventProducers, WithdrawalChangedEvent},
    se_api::ledger_api::resolve_subject,
    traits::{ActorManagement, OrderManagement, WithdrawalManagement},
};

/// `WithdrawalApi` turns available balance into payout requests, and lets administrators settle them.
///
/// A withdrawal is `pending` when requested and ends up `completed` or `rejected`. Pending and completed
/// withdrawals both count against the available balance; a rejection hands the funds back.
pub struct WithdrawalApi<B> {
    db: B,
    producers: EventProducers,
    policy: WithdrawalPolicy,
}

impl<B> Debug for WithdrawalApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi ({:?})", self.policy)
    }
}

impl<B> WithdrawalApi<B> {
    pub fn new(db: B, producers: EventProducers, policy: WithdrawalPolicy) -> Self {
        Self { db, producers, policy }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> WithdrawalApi<B>
where B: WithdrawalManagement + OrderManagement + ActorManagement
{
    /// Requests a payout of `withdrawal.amount` from the actor's available balance.
    ///
    /// The amount must be positive and at least the minimum for the actor type, and account details are required.
    /// The balance check happens in the same transaction that records the request, so concurrent requests can never
    /// overdraw the balance between them. The loser gets `ConflictError::InsufficientBalance`.
    pub async fn request_withdrawal(&self, withdrawal: NewWithdrawal) -> Result<Withdrawal, SettlementError> {
        let minimum = self.policy.minimum_for(withdrawal.actor_type);
        if !withdrawal.amount.is_positive() || withdrawal.amount < minimum {
            return Err(ValidationError::InvalidAmount { amount: withdrawal.amount, minimum }.into());
        }
        if withdrawal.account_details.is_blank() {
            return Err(ValidationError::MissingAccountDetails.into());
        }
        let actor = withdrawal.ledger_actor();
        let subject = resolve_subject(&self.db, &actor).await?;
        trace!(
            "💸️ {actor} requests {} by {} to {}",
            withdrawal.amount,
            withdrawal.method,
            withdrawal.account_details.hint()
        );
        let record = self.db.insert_withdrawal(withdrawal, &subject).await?;
        info!("💸️ Withdrawal #{} of {} for {actor} is pending", record.id, record.amount);
        self.producers.publish_withdrawal_changed(WithdrawalChangedEvent::new(record.clone())).await;
        Ok(record)
    }

    /// Approves or rejects a pending withdrawal. Rejections must give a reason. Resolved withdrawals are final.
    pub async fn resolve_withdrawal(
        &self,
        id: i64,
        decision: WithdrawalDecision,
        processed_by: &str,
    ) -> Result<Withdrawal, SettlementError> {
        let decision = match decision {
            WithdrawalDecision::Reject { reason } if reason.trim().is_empty() => {
                return Err(ValidationError::MissingRejectionReason(id).into());
            },
            WithdrawalDecision::Reject { reason } => WithdrawalDecision::Reject { reason: reason.trim().to_string() },
            WithdrawalDecision::Approve => WithdrawalDecision::Approve,
        };
        let resolved = self.db.resolve_withdrawal(id, decision, processed_by).await?;
        info!("💸️ Withdrawal #{id} is now {} (by {processed_by})", resolved.status);
        self.producers.publish_withdrawal_changed(WithdrawalChangedEvent::new(resolved.clone())).await;
        Ok(resolved)
    }

    pub async fn withdrawals_for_actor(&self, actor: &LedgerActor) -> Result<Vec<Withdrawal>, SettlementError> {
        self.db.fetch_withdrawals_for_actor(actor).await
    }

    pub async fn fetch_withdrawal(&self, id: i64) -> Result<Option<Withdrawal>, SettlementError> {
        self.db.fetch_withdrawal(id).await
    }
}
