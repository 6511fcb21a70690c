mod db;
mod deals;
mod error;
mod models;
mod orders;
mod query;
mod validation;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use deals::{DealEngine, DealStore};
use error::ApiError;
use models::{CreateMenuItem, MenuItem, UpdateMenuItem};
use orders::{
    MenuRepository, OrderDealsRepository, OrderItemsRepository, OrderService, OrdersRepository,
};
use query::{QueryParams, QueryValidator};
use validator::Validate;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        create_menu_item,
        get_menu_item_by_id,
        update_menu_item,
        delete_menu_item,
    ),
    components(
        schemas(MenuItem, CreateMenuItem, UpdateMenuItem)
    ),
    tags(
        (name = "menu", description = "Menu item management endpoints")
    ),
    info(
        title = "Bistro API",
        version = "1.0.0",
        description = "Restaurant ordering backend with deal evaluation",
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub deal_store: Arc<DealStore>,
    pub deal_engine: Arc<DealEngine>,
    pub order_service: OrderService,
}

/// Handler for POST /api/menu-items
/// Creates a new menu item
#[utoipa::path(
    post,
    path = "/api/menu-items",
    request_body = CreateMenuItem,
    responses(
        (status = 201, description = "Menu item created successfully", body = MenuItem),
        (status = 400, description = "Invalid input data"),
        (status = 409, description = "Duplicate menu item name"),
        (status = 500, description = "Internal server error")
    ),
    tag = "menu"
)]
async fn create_menu_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateMenuItem>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    tracing::debug!("Creating new menu item: {}", payload.name);

    payload.validate()?;
    validation::validate_price(payload.price).map_err(ApiError::InvalidInput)?;

    if db::check_duplicate_menu_item(&state.db, &payload.name).await? {
        tracing::warn!("Attempt to create duplicate menu item: {}", payload.name);
        return Err(ApiError::Conflict {
            message: format!("Menu item with name '{}' already exists", payload.name),
        });
    }

    let item = sqlx::query_as::<_, MenuItem>(
        r#"
        INSERT INTO menu_items (name, category_id, price, description, image_url, is_available)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, name, category_id, price, description, image_url,
                  is_available, created_at, updated_at
        "#,
    )
    .bind(&payload.name)
    .bind(payload.category_id)
    .bind(payload.price)
    .bind(&payload.description)
    .bind(&payload.image_url)
    .bind(payload.is_available)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Successfully created menu item with id: {}", item.id);
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for GET /api/menu-items
/// Supports search, filtering, sorting, and pagination
async fn get_menu_items(
    Query(params): Query<QueryParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    tracing::debug!("Fetching menu items with query parameters: {:?}", params);

    let validated =
        QueryValidator::validate(params).map_err(|e| ApiError::InvalidInput(e.message))?;

    let mut builder = query::SQLQueryBuilder::new();

    if let Some(search) = validated.search {
        builder.add_search_filter(&search);
    }
    if let Some(category) = validated.category {
        builder.add_category_filter(category);
    }
    builder.add_price_range(validated.min_price, validated.max_price);
    if validated.available_only {
        builder.add_available_only();
    }

    if let Some(sort_field) = validated.sort_field {
        builder.set_sort(sort_field, validated.sort_order);
    }

    builder.set_pagination(validated.page, validated.limit);

    let (query_str, params) = builder.build();

    let mut query = sqlx::query_as::<_, MenuItem>(&query_str);
    for param in params {
        query = query.bind(param);
    }

    let items = query.fetch_all(&state.db).await?;

    tracing::debug!("Query returned {} menu items", items.len());
    Ok(Json(items))
}

/// Handler for GET /api/menu-items/:id
#[utoipa::path(
    get,
    path = "/api/menu-items/{id}",
    params(
        ("id" = i32, Path, description = "Menu item ID")
    ),
    responses(
        (status = 200, description = "Menu item found", body = MenuItem),
        (status = 404, description = "Menu item not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "menu"
)]
async fn get_menu_item_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MenuItem>, ApiError> {
    tracing::debug!("Fetching menu item with id: {}", id);

    let item = sqlx::query_as::<_, MenuItem>(
        r#"
        SELECT id, name, category_id, price, description, image_url,
               is_available, created_at, updated_at
        FROM menu_items
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound {
        resource: "MenuItem".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(item))
}

/// Handler for PUT /api/menu-items/:id
/// Partial update: omitted fields keep their current values
#[utoipa::path(
    put,
    path = "/api/menu-items/{id}",
    params(
        ("id" = i32, Path, description = "Menu item ID")
    ),
    request_body = UpdateMenuItem,
    responses(
        (status = 200, description = "Menu item updated successfully", body = MenuItem),
        (status = 400, description = "Invalid input data"),
        (status = 404, description = "Menu item not found"),
        (status = 409, description = "Duplicate menu item name"),
        (status = 500, description = "Internal server error")
    ),
    tag = "menu"
)]
async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateMenuItem>,
) -> Result<Json<MenuItem>, ApiError> {
    tracing::debug!("Updating menu item with id: {}", id);

    payload.validate()?;
    validation::validate_optional_price(payload.price).map_err(ApiError::InvalidInput)?;

    // A transaction keeps the existence check, duplicate check and update
    // atomic
    let mut tx = state.db.begin().await?;

    let existing = sqlx::query_as::<_, MenuItem>(
        r#"
        SELECT id, name, category_id, price, description, image_url,
               is_available, created_at, updated_at
        FROM menu_items
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound {
        resource: "MenuItem".to_string(),
        id: id.to_string(),
    })?;

    if let Some(ref new_name) = payload.name {
        if new_name != &existing.name {
            let duplicate_exists: Option<bool> = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM menu_items WHERE name = $1 AND id != $2)",
            )
            .bind(new_name)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if duplicate_exists.unwrap_or(false) {
                tracing::warn!(
                    "Attempt to update menu item {} to duplicate name: {}",
                    id,
                    new_name
                );
                return Err(ApiError::Conflict {
                    message: format!("Menu item with name '{}' already exists", new_name),
                });
            }
        }
    }

    let updated_item = sqlx::query_as::<_, MenuItem>(
        r#"
        UPDATE menu_items
        SET name = $1,
            category_id = $2,
            price = $3,
            description = $4,
            image_url = $5,
            is_available = $6,
            updated_at = NOW()
        WHERE id = $7
        RETURNING id, name, category_id, price, description, image_url,
                  is_available, created_at, updated_at
        "#,
    )
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.category_id.unwrap_or(existing.category_id))
    .bind(payload.price.unwrap_or(existing.price))
    .bind(payload.description.unwrap_or(existing.description))
    .bind(payload.image_url.or(existing.image_url))
    .bind(payload.is_available.unwrap_or(existing.is_available))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Successfully updated menu item with id: {}", id);
    Ok(Json(updated_item))
}

/// Handler for DELETE /api/menu-items/:id
#[utoipa::path(
    delete,
    path = "/api/menu-items/{id}",
    params(
        ("id" = i32, Path, description = "Menu item ID")
    ),
    responses(
        (status = 204, description = "Menu item deleted successfully"),
        (status = 404, description = "Menu item not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "menu"
)]
async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!("Deleting menu item with id: {}", id);

    let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound {
            resource: "MenuItem".to_string(),
            id: id.to_string(),
        });
    }

    tracing::info!("Successfully deleted menu item with id: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Builds the application state from a database pool
fn build_state(db: PgPool) -> AppState {
    let deal_engine = Arc::new(DealEngine::new(db.clone()));
    let deal_store = deal_engine.store();

    let order_service = OrderService::new(
        OrdersRepository::new(db.clone()),
        OrderItemsRepository::new(db.clone()),
        OrderDealsRepository::new(db.clone()),
        MenuRepository::new(db.clone()),
        deal_engine.clone(),
    );

    AppState {
        db,
        deal_store,
        deal_engine,
        order_service,
    }
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Menu management
        .route("/api/menu-items", post(create_menu_item))
        .route("/api/menu-items", get(get_menu_items))
        .route("/api/menu-items/:id", get(get_menu_item_by_id))
        .route("/api/menu-items/:id", put(update_menu_item))
        .route("/api/menu-items/:id", delete(delete_menu_item))
        // Deal administration and storefront listing
        .route("/api/deals", post(deals::handlers::create_deal_handler))
        .route("/api/deals", get(deals::handlers::list_deals_handler))
        .route("/api/deals/website", get(deals::handlers::website_deals_handler))
        .route("/api/deals/:id", get(deals::handlers::get_deal_handler))
        .route("/api/deals/:id", put(deals::handlers::update_deal_handler))
        .route("/api/deals/:id", delete(deals::handlers::delete_deal_handler))
        .route("/api/deals/:id/toggle", patch(deals::handlers::toggle_deal_handler))
        .route("/api/deals/:id/stats", get(deals::handlers::deal_stats_handler))
        // Checkout and orders
        .route("/api/orders", post(orders::handlers::checkout_handler))
        .route("/api/orders", get(orders::handlers::order_history_handler))
        .route("/api/orders/preview", post(orders::handlers::preview_handler))
        .route("/api/orders/:id", get(orders::handlers::get_order_handler))
        .route(
            "/api/orders/:id/status",
            patch(orders::handlers::update_order_status_handler),
        )
        .route(
            "/api/orders/:id/payment",
            patch(orders::handlers::update_payment_status_handler),
        )
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Bistro API - Starting...");

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let state = build_state(db_pool);

    // Pre-load the deal cache before accepting traffic
    if let Err(e) = state.deal_engine.warm_cache().await {
        tracing::warn!("Failed to warm deal cache: {}", e);
    }

    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Bistro API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
