// Deal Evaluation System
//
// Decides which promotions apply to an order and what they are worth:
// - Eligibility Evaluator: pure predicate over deal + order context + usage
// - Discount Calculator: monetary effect of an eligible deal
// - Deal Selector: stacking/priority resolution and sequential application
// - Usage Tracker: append-only usage log with atomic cap enforcement
// - Deal Store: cached definitions plus admin CRUD

pub mod audit;
pub mod discount;
pub mod eligibility;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod selector;
pub mod store;
pub mod types;
pub mod usage;

pub use audit::{AuditLogger, AuditRecord};
pub use discount::DiscountCalculator;
pub use eligibility::EligibilityEvaluator;
pub use error::{DealError, DealResult};
pub use metrics::{Operation, PerformanceMetrics};
pub use models::{
    AppliedDeal, CartLine, CheckoutEvaluation, Deal, DealBenefit, OrderContext, UsageCounts,
    UsageRecord, UsageStats,
};
pub use selector::DealSelector;
pub use store::{DealDraft, DealStore};
pub use types::DealKind;
pub use usage::UsageTracker;

use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Deal Engine
///
/// Orchestrates the store, evaluator, calculator, selector and tracker, and
/// provides the checkout-facing operations.
pub struct DealEngine {
    store: Arc<DealStore>,
    usage_tracker: UsageTracker,
    audit_logger: AuditLogger,
    metrics: Arc<PerformanceMetrics>,
}

impl DealEngine {
    /// Create a new DealEngine with a shared store and metrics
    pub fn new(pool: PgPool) -> Self {
        let metrics = Arc::new(PerformanceMetrics::new());
        let store = Arc::new(DealStore::with_metrics(pool.clone(), metrics.clone()));
        let usage_tracker = UsageTracker::new(pool.clone());
        let audit_logger = AuditLogger::new(pool);

        Self {
            store,
            usage_tracker,
            audit_logger,
            metrics,
        }
    }

    /// Shared deal store, also used by the admin handlers
    pub fn store(&self) -> Arc<DealStore> {
        self.store.clone()
    }

    /// Engine performance metrics
    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    /// Pre-load the deal cache to avoid cold-start latency on the first
    /// checkout
    pub async fn warm_cache(&self) -> DealResult<()> {
        tracing::info!("Warming deal cache...");
        let deals = self.store.get_deals().await?;
        tracing::info!("Deal cache warmed with {} deals", deals.len());
        Ok(())
    }

    /// Check whether a single deal applies to the given order context
    pub async fn check_deal(&self, deal_id: Uuid, ctx: &OrderContext) -> DealResult<bool> {
        let _timer = self.metrics.start(Operation::EligibilityCheck);

        let deal = self
            .store
            .find_by_id(deal_id)
            .await?
            .ok_or(DealError::NotFound(deal_id))?;

        let usage = self.usage_counts_if_capped(&deal, ctx).await?;
        Ok(EligibilityEvaluator::is_eligible(&deal, ctx, &usage))
    }

    /// Evaluate a checkout against all deals
    ///
    /// Filters the deal set down to the eligible ones, runs selection, and
    /// returns the applied list with per-deal discounts and the adjusted
    /// total. Read-only: usage is committed separately so a preview costs
    /// nothing.
    pub async fn evaluate_checkout(
        &self,
        order_id: Uuid,
        ctx: &OrderContext,
    ) -> DealResult<CheckoutEvaluation> {
        let _timer = self.metrics.start(Operation::CheckoutEvaluation);

        let deals = self.store.get_deals().await?;

        let mut eligible = Vec::new();
        for deal in deals {
            let usage = self.usage_counts_if_capped(&deal, ctx).await?;
            if EligibilityEvaluator::is_eligible(&deal, ctx, &usage) {
                eligible.push(deal);
            }
        }

        let evaluation = DealSelector::select(&eligible, ctx);

        self.audit_logger
            .log_evaluation(
                order_id,
                json!({
                    "eligible_count": eligible.len(),
                    "applied": evaluation
                        .applied_deals
                        .iter()
                        .map(|a| json!({ "deal_id": a.deal_id, "discount": a.discount_amount }))
                        .collect::<Vec<_>>(),
                    "subtotal": evaluation.subtotal,
                    "final_total": evaluation.final_total,
                }),
                &format!(
                    "Applied {} of {} eligible deals, discount {}",
                    evaluation.applied_deals.len(),
                    eligible.len(),
                    evaluation.discount_total
                ),
            )
            .await;

        Ok(evaluation)
    }

    /// Commit usage for the applied deals of a checkout
    ///
    /// Each applied deal goes through the tracker's atomic cap guard. A deal
    /// that lost the race since evaluation is dropped from the returned list
    /// (checkout proceeds without it); any other failure propagates.
    pub async fn commit_usage(
        &self,
        order_id: Uuid,
        ctx: &OrderContext,
        applied: Vec<AppliedDeal>,
    ) -> DealResult<Vec<AppliedDeal>> {
        let _timer = self.metrics.start(Operation::UsageRecording);

        let mut committed = Vec::with_capacity(applied.len());

        for entry in applied {
            let deal = self
                .store
                .find_by_id(entry.deal_id)
                .await?
                .ok_or(DealError::NotFound(entry.deal_id))?;

            match self
                .usage_tracker
                .record_usage(&deal, ctx.customer_id, order_id, entry.discount_amount)
                .await
            {
                Ok(record) => {
                    self.audit_logger
                        .log_usage_commit(
                            order_id,
                            entry.deal_id,
                            json!({
                                "usage_record_id": record.id,
                                "discount": entry.discount_amount,
                                "customer_id": ctx.customer_id,
                            }),
                            &format!("Recorded usage of deal {}", deal.name),
                        )
                        .await;
                    committed.push(entry);
                }
                Err(DealError::NoLongerAvailable(deal_id)) => {
                    tracing::warn!(
                        "Deal {} no longer available at commit time, dropped from order {}",
                        deal_id,
                        order_id
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(committed)
    }

    /// Aggregated usage statistics for a deal
    pub async fn usage_stats(&self, deal_id: Uuid) -> DealResult<UsageStats> {
        let _timer = self.metrics.start(Operation::StatsQuery);

        // Statistics for deleted deals still aggregate their surviving records
        self.usage_tracker.usage_stats(deal_id).await
    }

    /// Fetch a usage snapshot only when the deal actually carries caps
    async fn usage_counts_if_capped(
        &self,
        deal: &Deal,
        ctx: &OrderContext,
    ) -> DealResult<UsageCounts> {
        if deal.max_total_usage.is_none() && deal.max_usage_per_customer.is_none() {
            return Ok(UsageCounts::default());
        }

        self.usage_tracker
            .counts_for(deal.id, ctx.customer_id)
            .await
    }
}
