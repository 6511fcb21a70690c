use sqlx::PgPool;
use uuid::Uuid;

use crate::models::MenuItem;
use crate::orders::error::OrderError;
use crate::orders::{Order, OrderDeal, OrderItem, OrderStatus, PaymentStatus};

/// Repository for menu item lookups during checkout
#[derive(Clone)]
pub struct MenuRepository {
    pool: PgPool,
}

impl MenuRepository {
    /// Create a new MenuRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a menu item by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<MenuItem>, OrderError> {
        let item = sqlx::query_as::<_, MenuItem>(
            r#"
            SELECT id, name, category_id, price, description, image_url,
                   is_available, created_at, updated_at
            FROM menu_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Find multiple menu items by IDs
    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<MenuItem>, OrderError> {
        let items = sqlx::query_as::<_, MenuItem>(
            r#"
            SELECT id, name, category_id, price, description, image_url,
                   is_available, created_at, updated_at
            FROM menu_items
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

/// New order line passed to the repository:
/// (menu_item_id, quantity, price_snapshot, subtotal)
pub type NewOrderLine = (i32, i32, rust_decimal::Decimal, rust_decimal::Decimal);

/// New applied-deal row passed to the repository:
/// (deal_id, deal_name, discount_amount)
pub type NewOrderDeal = (Uuid, String, rust_decimal::Decimal);

/// Repository for order persistence
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    /// Create a new OrdersRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an order with its items and applied deals in one transaction
    ///
    /// The id is assigned by the caller before checkout so usage records and
    /// audit entries written during evaluation reference the same order.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        order_id: Uuid,
        customer_id: Option<i32>,
        branch_id: i32,
        subtotal: rust_decimal::Decimal,
        discount_total: rust_decimal::Decimal,
        total_price: rust_decimal::Decimal,
        items: Vec<NewOrderLine>,
        deals: Vec<NewOrderDeal>,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, customer_id, branch_id, status, payment_status,
                                subtotal, discount_total, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, customer_id, branch_id, status, payment_status,
                      subtotal, discount_total, total_price, created_at, updated_at
            "#,
        )
        .bind(order_id)
        .bind(customer_id)
        .bind(branch_id)
        .bind(OrderStatus::Pending)
        .bind(PaymentStatus::Unpaid)
        .bind(subtotal)
        .bind(discount_total)
        .bind(total_price)
        .fetch_one(&mut *tx)
        .await?;

        for (menu_item_id, quantity, price_snapshot, line_subtotal) in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, menu_item_id, quantity, price_snapshot, subtotal)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id)
            .bind(menu_item_id)
            .bind(quantity)
            .bind(price_snapshot)
            .bind(line_subtotal)
            .execute(&mut *tx)
            .await?;
        }

        for (deal_id, deal_name, discount_amount) in deals {
            sqlx::query(
                r#"
                INSERT INTO order_deals (order_id, deal_id, deal_name, discount_amount)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order.id)
            .bind(deal_id)
            .bind(deal_name)
            .bind(discount_amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(order)
    }

    /// Find an order by ID
    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, branch_id, status, payment_status,
                   subtotal, discount_total, total_price, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Find orders for a customer with optional status filter, newest first
    pub async fn find_by_customer(
        &self,
        customer_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = match status {
            Some(status_filter) => {
                sqlx::query_as::<_, Order>(
                    r#"
                    SELECT id, customer_id, branch_id, status, payment_status,
                           subtotal, discount_total, total_price, created_at, updated_at
                    FROM orders
                    WHERE customer_id = $1 AND status = $2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(customer_id)
                .bind(status_filter)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>(
                    r#"
                    SELECT id, customer_id, branch_id, status, payment_status,
                           subtotal, discount_total, total_price, created_at, updated_at
                    FROM orders
                    WHERE customer_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(customer_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(orders)
    }

    /// Update order status
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, customer_id, branch_id, status, payment_status,
                      subtotal, discount_total, total_price, created_at, updated_at
            "#,
        )
        .bind(new_status)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OrderError::NotFound)?;

        Ok(order)
    }

    /// Update payment status
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        new_payment_status: PaymentStatus,
    ) -> Result<Order, OrderError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET payment_status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, customer_id, branch_id, status, payment_status,
                      subtotal, discount_total, total_price, created_at, updated_at
            "#,
        )
        .bind(new_payment_status)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OrderError::NotFound)?;

        Ok(order)
    }
}

/// Repository for order item reads
#[derive(Clone)]
pub struct OrderItemsRepository {
    pool: PgPool,
}

impl OrderItemsRepository {
    /// Create a new OrderItemsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find all items for a given order
    pub async fn find_by_order_id(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, menu_item_id, quantity, price_snapshot, subtotal
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

/// Repository for applied-deal reads
#[derive(Clone)]
pub struct OrderDealsRepository {
    pool: PgPool,
}

impl OrderDealsRepository {
    /// Create a new OrderDealsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the deals applied to a given order
    pub async fn find_by_order_id(&self, order_id: Uuid) -> Result<Vec<OrderDeal>, OrderError> {
        let deals = sqlx::query_as::<_, OrderDeal>(
            r#"
            SELECT id, order_id, deal_id, deal_name, discount_amount
            FROM order_deals
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(deals)
    }
}

#[cfg(test)]
mod tests {
    // Repository methods run against a live database and are exercised
    // through the handler integration tests in src/tests.rs.
}
