// Deal Store
//
// Loads deal definitions from PostgreSQL, validates them, and caches the
// evaluated set with a 60-second TTL. Admin writes go straight to the
// database and invalidate the cache so evaluation picks them up on the next
// refresh.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::deals::error::{DealError, DealResult};
use crate::deals::metrics::PerformanceMetrics;
use crate::deals::models::{Deal, DealBenefit, DealRow};

/// Time-to-live for the cached deal set
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Columns selected for every deal read, kept in one place so the row
/// mapping cannot drift between queries
const DEAL_COLUMNS: &str = "id, name, description, badge_text, deal_type, benefit, \
     applicable_categories, applicable_items, applicable_branches, \
     start_date, end_date, start_time, end_time, days_of_week, \
     max_usage_per_customer, max_total_usage, priority, allow_stacking, \
     is_active, show_on_website, usage_count, created_at, updated_at";

/// Input for creating or replacing a deal definition
#[derive(Debug, Clone)]
pub struct DealDraft {
    pub name: String,
    pub description: Option<String>,
    pub badge_text: Option<String>,
    pub benefit: DealBenefit,
    pub applicable_categories: Option<Vec<i32>>,
    pub applicable_items: Option<Vec<i32>>,
    pub applicable_branches: Option<Vec<i32>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub days_of_week: Option<Vec<i16>>,
    pub max_usage_per_customer: Option<i32>,
    pub max_total_usage: Option<i32>,
    pub priority: i32,
    pub allow_stacking: bool,
    pub is_active: bool,
    pub show_on_website: bool,
}

/// In-memory cache of the full deal set
struct DealCache {
    deals: Vec<Deal>,
    loaded_at: Option<Instant>,
}

impl DealCache {
    fn new() -> Self {
        Self {
            deals: Vec::new(),
            loaded_at: None,
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        match self.loaded_at {
            Some(loaded_at) => loaded_at.elapsed() > ttl,
            None => true,
        }
    }
}

/// Deal definition store with TTL caching and admin CRUD
pub struct DealStore {
    pool: PgPool,
    cache: Arc<RwLock<DealCache>>,
    cache_ttl: Duration,
    metrics: Option<Arc<PerformanceMetrics>>,
}

impl DealStore {
    /// Create a new DealStore
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(DealCache::new())),
            cache_ttl: CACHE_TTL,
            metrics: None,
        }
    }

    /// Create a new DealStore that reports cache hits/misses
    pub fn with_metrics(pool: PgPool, metrics: Arc<PerformanceMetrics>) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(DealCache::new())),
            cache_ttl: CACHE_TTL,
            metrics: Some(metrics),
        }
    }

    /// Database pool, for collaborators that run their own queries
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The full deal set, cached with TTL
    ///
    /// Evaluation reads this; the evaluator itself re-checks `is_active` and
    /// all temporal filters, so serving a slightly stale set only delays
    /// visibility of admin edits by at most the TTL.
    pub async fn get_deals(&self) -> DealResult<Vec<Deal>> {
        // Fast path under the read lock
        {
            let cache = self.cache.read().await;
            if !cache.is_stale(self.cache_ttl) {
                if let Some(ref metrics) = self.metrics {
                    metrics.record_cache_hit();
                }
                return Ok(cache.deals.clone());
            }
        }

        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_miss();
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the write lock
        if !cache.is_stale(self.cache_ttl) {
            return Ok(cache.deals.clone());
        }

        let deals = self.load_deals().await?;
        cache.deals = deals.clone();
        cache.loaded_at = Some(Instant::now());

        Ok(deals)
    }

    /// Force the next `get_deals` to reload from the database
    pub async fn invalidate_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.loaded_at = None;
    }

    /// Load and validate all deals from the database
    async fn load_deals(&self) -> DealResult<Vec<Deal>> {
        let rows = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {} FROM deals ORDER BY priority DESC, created_at",
            DEAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut deals = Vec::with_capacity(rows.len());
        for row in rows {
            let deal = Deal::try_from(row)?;
            // Malformed definitions are rejected at write time; failing fast
            // here means a corrupted row is a loud contract violation
            deal.benefit.validate()?;
            deals.push(deal);
        }

        Ok(deals)
    }

    /// One deal by id, bypassing the cache
    pub async fn find_by_id(&self, id: Uuid) -> DealResult<Option<Deal>> {
        let row = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {} FROM deals WHERE id = $1",
            DEAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Deal::try_from).transpose()
    }

    /// All deals for the admin listing, bypassing the cache
    pub async fn list_all(&self) -> DealResult<Vec<Deal>> {
        let rows = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {} FROM deals ORDER BY priority DESC, created_at",
            DEAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Deal::try_from).collect()
    }

    /// Active deals flagged for storefront display (display only, the
    /// storefront never evaluates)
    pub async fn website_deals(&self) -> DealResult<Vec<Deal>> {
        let rows = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {} FROM deals WHERE is_active AND show_on_website \
             ORDER BY priority DESC, created_at",
            DEAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Deal::try_from).collect()
    }

    /// Create a new deal
    pub async fn create(&self, draft: DealDraft) -> DealResult<Deal> {
        Self::validate_draft(&draft)?;

        let benefit_json = serde_json::to_value(&draft.benefit)?;

        let row = sqlx::query_as::<_, DealRow>(&format!(
            r#"
            INSERT INTO deals (
                name, description, badge_text, deal_type, benefit,
                applicable_categories, applicable_items, applicable_branches,
                start_date, end_date, start_time, end_time, days_of_week,
                max_usage_per_customer, max_total_usage,
                priority, allow_stacking, is_active, show_on_website
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19)
            RETURNING {}
            "#,
            DEAL_COLUMNS
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.badge_text)
        .bind(draft.benefit.kind())
        .bind(benefit_json)
        .bind(&draft.applicable_categories)
        .bind(&draft.applicable_items)
        .bind(&draft.applicable_branches)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(&draft.days_of_week)
        .bind(draft.max_usage_per_customer)
        .bind(draft.max_total_usage)
        .bind(draft.priority)
        .bind(draft.allow_stacking)
        .bind(draft.is_active)
        .bind(draft.show_on_website)
        .fetch_one(&self.pool)
        .await?;

        self.invalidate_cache().await;

        Deal::try_from(row)
    }

    /// Replace a deal's definition
    ///
    /// Handlers merge partial updates against the existing record before
    /// calling this, so the draft always carries the complete definition.
    pub async fn update(&self, id: Uuid, draft: DealDraft) -> DealResult<Deal> {
        Self::validate_draft(&draft)?;

        let benefit_json = serde_json::to_value(&draft.benefit)?;

        let row = sqlx::query_as::<_, DealRow>(&format!(
            r#"
            UPDATE deals
            SET name = $1,
                description = $2,
                badge_text = $3,
                deal_type = $4,
                benefit = $5,
                applicable_categories = $6,
                applicable_items = $7,
                applicable_branches = $8,
                start_date = $9,
                end_date = $10,
                start_time = $11,
                end_time = $12,
                days_of_week = $13,
                max_usage_per_customer = $14,
                max_total_usage = $15,
                priority = $16,
                allow_stacking = $17,
                is_active = $18,
                show_on_website = $19,
                updated_at = NOW()
            WHERE id = $20
            RETURNING {}
            "#,
            DEAL_COLUMNS
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.badge_text)
        .bind(draft.benefit.kind())
        .bind(benefit_json)
        .bind(&draft.applicable_categories)
        .bind(&draft.applicable_items)
        .bind(&draft.applicable_branches)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(&draft.days_of_week)
        .bind(draft.max_usage_per_customer)
        .bind(draft.max_total_usage)
        .bind(draft.priority)
        .bind(draft.allow_stacking)
        .bind(draft.is_active)
        .bind(draft.show_on_website)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DealError::NotFound(id))?;

        self.invalidate_cache().await;

        Deal::try_from(row)
    }

    /// Flip only the active flag
    pub async fn toggle_active(&self, id: Uuid) -> DealResult<Deal> {
        let row = sqlx::query_as::<_, DealRow>(&format!(
            r#"
            UPDATE deals
            SET is_active = NOT is_active, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            DEAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DealError::NotFound(id))?;

        self.invalidate_cache().await;

        Deal::try_from(row)
    }

    /// Hard-delete a deal; its usage records remain for statistics
    pub async fn delete(&self, id: Uuid) -> DealResult<()> {
        let result = sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DealError::NotFound(id));
        }

        self.invalidate_cache().await;

        Ok(())
    }

    /// Structural validation applied to every create/update
    fn validate_draft(draft: &DealDraft) -> DealResult<()> {
        if draft.name.trim().is_empty() {
            return Err(DealError::InvalidDefinition(
                "name must not be empty".to_string(),
            ));
        }

        draft.benefit.validate()?;

        if !(0..=100).contains(&draft.priority) {
            return Err(DealError::InvalidDefinition(
                "priority must be between 0 and 100".to_string(),
            ));
        }

        if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
            if start > end {
                return Err(DealError::InvalidDefinition(
                    "start_date must not be after end_date".to_string(),
                ));
            }
        }

        if draft.start_time.is_some() != draft.end_time.is_some() {
            return Err(DealError::InvalidDefinition(
                "start_time and end_time must be set together".to_string(),
            ));
        }

        if let Some(ref days) = draft.days_of_week {
            let mut seen = [false; 7];
            for day in days {
                let idx = usize::try_from(*day).ok().filter(|i| *i < 7).ok_or_else(|| {
                    DealError::InvalidDefinition(
                        "days_of_week entries must be 0-6 (Sunday = 0)".to_string(),
                    )
                })?;
                if seen[idx] {
                    return Err(DealError::InvalidDefinition(
                        "days_of_week must not contain duplicates".to_string(),
                    ));
                }
                seen[idx] = true;
            }
        }

        for (cap, label) in [
            (draft.max_usage_per_customer, "max_usage_per_customer"),
            (draft.max_total_usage, "max_total_usage"),
        ] {
            if let Some(value) = cap {
                if value <= 0 {
                    return Err(DealError::InvalidDefinition(format!(
                        "{} must be positive when set",
                        label
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> DealDraft {
        DealDraft {
            name: "Weekday lunch special".to_string(),
            description: None,
            badge_text: None,
            benefit: DealBenefit::PercentageDiscount { percent: dec!(15) },
            applicable_categories: None,
            applicable_items: None,
            applicable_branches: None,
            start_date: None,
            end_date: None,
            start_time: None,
            end_time: None,
            days_of_week: None,
            max_usage_per_customer: None,
            max_total_usage: None,
            priority: 50,
            allow_stacking: false,
            is_active: true,
            show_on_website: true,
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(DealStore::validate_draft(&draft()).is_ok());
    }

    #[test]
    fn test_draft_rejects_empty_name() {
        let mut d = draft();
        d.name = "   ".to_string();
        assert!(DealStore::validate_draft(&d).is_err());
    }

    #[test]
    fn test_draft_rejects_priority_out_of_range() {
        let mut d = draft();
        d.priority = 101;
        assert!(DealStore::validate_draft(&d).is_err());

        d.priority = -1;
        assert!(DealStore::validate_draft(&d).is_err());
    }

    #[test]
    fn test_draft_rejects_inverted_date_range() {
        let mut d = draft();
        d.start_date = NaiveDate::from_ymd_opt(2025, 7, 1);
        d.end_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        assert!(DealStore::validate_draft(&d).is_err());
    }

    #[test]
    fn test_draft_rejects_half_open_time_window() {
        let mut d = draft();
        d.start_time = NaiveTime::from_hms_opt(9, 0, 0);
        assert!(DealStore::validate_draft(&d).is_err());
    }

    #[test]
    fn test_draft_rejects_bad_weekdays() {
        let mut d = draft();
        d.days_of_week = Some(vec![0, 7]);
        assert!(DealStore::validate_draft(&d).is_err());

        d.days_of_week = Some(vec![1, 1]);
        assert!(DealStore::validate_draft(&d).is_err());

        d.days_of_week = Some(vec![0, 6]);
        assert!(DealStore::validate_draft(&d).is_ok());
    }

    #[test]
    fn test_draft_rejects_non_positive_caps() {
        let mut d = draft();
        d.max_total_usage = Some(0);
        assert!(DealStore::validate_draft(&d).is_err());
    }

    #[test]
    fn test_cache_staleness() {
        let mut cache = DealCache::new();
        assert!(cache.is_stale(Duration::from_secs(60)));

        cache.loaded_at = Some(Instant::now());
        assert!(!cache.is_stale(Duration::from_secs(60)));
        assert!(cache.is_stale(Duration::from_secs(0)));
    }
}
