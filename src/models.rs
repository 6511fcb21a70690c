use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Represents a menu item in the database
///
/// Prices are stored as NUMERIC and handled as `Decimal` end to end so the
/// deal engine never sees floating-point money.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MenuItem {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Margherita Pizza")]
    pub name: String,
    /// Category reference used by deal applicability filters
    #[schema(example = 3)]
    pub category_id: i32,
    #[schema(value_type = f64, example = 12.50)]
    pub price: Decimal,
    #[schema(example = "San Marzano tomatoes, mozzarella, basil")]
    pub description: String,
    #[schema(example = "https://cdn.example.com/margherita.jpg")]
    pub image_url: Option<String>,
    /// Unavailable items are rejected at checkout
    #[schema(example = true)]
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the data needed to create a new menu item
///
/// Used for POST /api/menu-items requests; id and timestamps are generated
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateMenuItem {
    #[schema(example = "Carbonara")]
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,
    #[schema(example = 2)]
    #[validate(range(min = 1, message = "Category reference must be positive"))]
    pub category_id: i32,
    #[schema(value_type = f64, example = 14.00)]
    pub price: Decimal,
    #[schema(example = "Guanciale, egg yolk, pecorino")]
    pub description: String,
    #[schema(example = "https://cdn.example.com/carbonara.jpg")]
    pub image_url: Option<String>,
    #[schema(example = true)]
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Represents the data for updating an existing menu item
///
/// All fields are optional to support partial updates
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateMenuItem {
    #[schema(example = "Updated Name")]
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: Option<String>,
    #[schema(example = 4)]
    #[validate(range(min = 1, message = "Category reference must be positive"))]
    pub category_id: Option<i32>,
    #[schema(value_type = f64, example = 15.50)]
    pub price: Option<Decimal>,
    #[schema(example = "Updated description")]
    pub description: Option<String>,
    #[schema(example = "https://cdn.example.com/updated.jpg")]
    pub image_url: Option<String>,
    #[schema(example = false)]
    pub is_available: Option<bool>,
}
