// HTTP handlers for deal administration
//
// The admin UI is a plain producer/consumer of deal records; all evaluation
// logic stays behind the engine. Handlers validate, delegate to the store,
// and map results straight to JSON.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::deals::{Deal, DealBenefit, DealDraft, DealError, UsageStats};
use crate::AppState;

/// Request DTO for creating a deal
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDealRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
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
    #[validate(range(min = 0, max = 100, message = "Priority must be 0-100"))]
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub allow_stacking: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub show_on_website: bool,
}

fn default_true() -> bool {
    true
}

/// Request DTO for updating a deal; omitted fields keep their current value
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDealRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub badge_text: Option<String>,
    pub benefit: Option<DealBenefit>,
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
    #[validate(range(min = 0, max = 100, message = "Priority must be 0-100"))]
    pub priority: Option<i32>,
    pub allow_stacking: Option<bool>,
    pub is_active: Option<bool>,
    pub show_on_website: Option<bool>,
}

impl CreateDealRequest {
    fn into_draft(self) -> DealDraft {
        DealDraft {
            name: self.name,
            description: self.description,
            badge_text: self.badge_text,
            benefit: self.benefit,
            applicable_categories: self.applicable_categories,
            applicable_items: self.applicable_items,
            applicable_branches: self.applicable_branches,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time,
            end_time: self.end_time,
            days_of_week: self.days_of_week,
            max_usage_per_customer: self.max_usage_per_customer,
            max_total_usage: self.max_total_usage,
            priority: self.priority,
            allow_stacking: self.allow_stacking,
            is_active: self.is_active,
            show_on_website: self.show_on_website,
        }
    }
}

impl UpdateDealRequest {
    /// Merge the patch over the existing record into a full draft
    fn merge_into_draft(self, existing: Deal) -> DealDraft {
        DealDraft {
            name: self.name.unwrap_or(existing.name),
            description: self.description.or(existing.description),
            badge_text: self.badge_text.or(existing.badge_text),
            benefit: self.benefit.unwrap_or(existing.benefit),
            applicable_categories: self
                .applicable_categories
                .or(existing.applicable_categories),
            applicable_items: self.applicable_items.or(existing.applicable_items),
            applicable_branches: self.applicable_branches.or(existing.applicable_branches),
            start_date: self.start_date.or(existing.start_date),
            end_date: self.end_date.or(existing.end_date),
            start_time: self.start_time.or(existing.start_time),
            end_time: self.end_time.or(existing.end_time),
            days_of_week: self.days_of_week.or(existing.days_of_week),
            max_usage_per_customer: self
                .max_usage_per_customer
                .or(existing.max_usage_per_customer),
            max_total_usage: self.max_total_usage.or(existing.max_total_usage),
            priority: self.priority.unwrap_or(existing.priority),
            allow_stacking: self.allow_stacking.unwrap_or(existing.allow_stacking),
            is_active: self.is_active.unwrap_or(existing.is_active),
            show_on_website: self.show_on_website.unwrap_or(existing.show_on_website),
        }
    }
}

/// Handler for POST /api/deals
pub async fn create_deal_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateDealRequest>,
) -> Result<(StatusCode, Json<Deal>), DealError> {
    request.validate()?;

    tracing::debug!("Creating deal: {}", request.name);
    let deal = state.deal_store.create(request.into_draft()).await?;

    tracing::info!("Created deal {} ({})", deal.name, deal.id);
    Ok((StatusCode::CREATED, Json(deal)))
}

/// Handler for GET /api/deals
pub async fn list_deals_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Deal>>, DealError> {
    let deals = state.deal_store.list_all().await?;
    Ok(Json(deals))
}

/// Handler for GET /api/deals/website
/// Active deals flagged for storefront display
pub async fn website_deals_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Deal>>, DealError> {
    let deals = state.deal_store.website_deals().await?;
    Ok(Json(deals))
}

/// Handler for GET /api/deals/:id
pub async fn get_deal_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Deal>, DealError> {
    let deal = state
        .deal_store
        .find_by_id(id)
        .await?
        .ok_or(DealError::NotFound(id))?;

    Ok(Json(deal))
}

/// Handler for PUT /api/deals/:id
/// Partial update: omitted fields keep their current values
pub async fn update_deal_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDealRequest>,
) -> Result<Json<Deal>, DealError> {
    request.validate()?;

    let existing = state
        .deal_store
        .find_by_id(id)
        .await?
        .ok_or(DealError::NotFound(id))?;

    let deal = state
        .deal_store
        .update(id, request.merge_into_draft(existing))
        .await?;

    tracing::info!("Updated deal {}", id);
    Ok(Json(deal))
}

/// Handler for PATCH /api/deals/:id/toggle
/// Flips only the active flag
pub async fn toggle_deal_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Deal>, DealError> {
    let deal = state.deal_store.toggle_active(id).await?;

    tracing::info!(
        "Toggled deal {} to {}",
        id,
        if deal.is_active { "active" } else { "inactive" }
    );
    Ok(Json(deal))
}

/// Handler for DELETE /api/deals/:id
pub async fn delete_deal_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, DealError> {
    state.deal_store.delete(id).await?;

    tracing::info!("Deleted deal {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/deals/:id/stats
pub async fn deal_stats_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UsageStats>, DealError> {
    let stats = state.deal_engine.usage_stats(id).await?;
    Ok(Json(stats))
}
