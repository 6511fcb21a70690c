use chrono::Local;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::deals::{CartLine, CheckoutEvaluation, DealEngine, OrderContext};
use crate::orders::{
    CheckoutRequest, MenuRepository, Order, OrderDealsRepository, OrderError, OrderItemsRepository,
    OrderResponse, OrderStatus, OrdersRepository, PaymentStatus, PriceCalculator, StatusMachine,
};

/// Service for order business logic
///
/// Owns the checkout sequence: price snapshots, deal evaluation, usage
/// commitment, and persistence.
#[derive(Clone)]
pub struct OrderService {
    orders_repo: OrdersRepository,
    order_items_repo: OrderItemsRepository,
    order_deals_repo: OrderDealsRepository,
    menu_repo: MenuRepository,
    deal_engine: Arc<DealEngine>,
}

impl OrderService {
    /// Create a new OrderService
    pub fn new(
        orders_repo: OrdersRepository,
        order_items_repo: OrderItemsRepository,
        order_deals_repo: OrderDealsRepository,
        menu_repo: MenuRepository,
        deal_engine: Arc<DealEngine>,
    ) -> Self {
        Self {
            orders_repo,
            order_items_repo,
            order_deals_repo,
            menu_repo,
            deal_engine,
        }
    }

    /// Build the evaluation context for a checkout request
    ///
    /// Validates quantities and item existence, snapshots current prices,
    /// and injects the evaluation timestamp (venue-local wall time) at this
    /// boundary so everything below it is clock-free.
    async fn build_context(&self, request: &CheckoutRequest) -> Result<OrderContext, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }

        let mut ids = Vec::with_capacity(request.items.len());
        for item in &request.items {
            if item.quantity <= 0 {
                return Err(OrderError::InvalidQuantity(format!(
                    "Quantity must be positive, got {}",
                    item.quantity
                )));
            }
            ids.push(item.menu_item_id);
        }

        let menu_items = self.menu_repo.find_by_ids(&ids).await?;
        let menu_map: HashMap<i32, _> = menu_items
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let mut lines = Vec::with_capacity(request.items.len());
        for item_request in &request.items {
            let menu_item = menu_map
                .get(&item_request.menu_item_id)
                .ok_or(OrderError::MenuItemNotFound(item_request.menu_item_id))?;

            if !menu_item.is_available {
                return Err(OrderError::ValidationError(format!(
                    "Menu item '{}' is currently unavailable",
                    menu_item.name
                )));
            }

            lines.push(CartLine {
                item_id: menu_item.id,
                category_id: menu_item.category_id,
                quantity: item_request.quantity as u32,
                unit_price: menu_item.price,
            });
        }

        Ok(OrderContext::from_lines(
            lines,
            request.branch_id,
            request.customer_id,
            Local::now().naive_local(),
        ))
    }

    /// Evaluate a cart without persisting anything
    ///
    /// Used by the cart page to show "you will save X". No usage is
    /// committed, so a preview can never consume a capped deal.
    pub async fn preview(&self, request: CheckoutRequest) -> Result<CheckoutEvaluation, OrderError> {
        let ctx = self.build_context(&request).await?;

        // Previews get a throwaway id for the audit trail
        let evaluation = self
            .deal_engine
            .evaluate_checkout(Uuid::new_v4(), &ctx)
            .await?;

        Ok(evaluation)
    }

    /// Check out a cart: evaluate deals, commit usage, persist the order
    ///
    /// A deal that loses its usage-cap guard between evaluation and commit is
    /// dropped and the checkout proceeds without its discount; the surviving
    /// deals keep their evaluated amounts.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<OrderResponse, OrderError> {
        let ctx = self.build_context(&request).await?;
        let order_id = Uuid::new_v4();

        let evaluation = self.deal_engine.evaluate_checkout(order_id, &ctx).await?;
        let committed = self
            .deal_engine
            .commit_usage(order_id, &ctx, evaluation.applied_deals)
            .await?;

        let discount_total: Decimal = committed.iter().map(|deal| deal.discount_amount).sum();
        let total_price = (ctx.subtotal - discount_total).max(Decimal::ZERO);

        let item_rows = ctx
            .lines
            .iter()
            .map(|line| {
                let quantity = line.quantity as i32;
                let line_subtotal = PriceCalculator::line_subtotal(quantity, line.unit_price);
                (line.item_id, quantity, line.unit_price, line_subtotal)
            })
            .collect();

        let deal_rows = committed
            .iter()
            .map(|deal| (deal.deal_id, deal.name.clone(), deal.discount_amount))
            .collect();

        let order = self
            .orders_repo
            .create(
                order_id,
                request.customer_id,
                request.branch_id,
                ctx.subtotal,
                discount_total,
                total_price,
                item_rows,
                deal_rows,
            )
            .await?;

        tracing::info!(
            "Checked out order {} with {} deals, total {}",
            order.id,
            committed.len(),
            order.total_price
        );

        self.to_response(order).await
    }

    /// Get a specific order by ID with its items and applied deals
    pub async fn get_order_by_id(&self, order_id: Uuid) -> Result<OrderResponse, OrderError> {
        let order = self
            .orders_repo
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        self.to_response(order).await
    }

    /// Get all orders for a customer with optional status filter
    pub async fn get_customer_orders(
        &self,
        customer_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderResponse>, OrderError> {
        let orders = self
            .orders_repo
            .find_by_customer(customer_id, status)
            .await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.to_response(order).await?);
        }

        Ok(responses)
    }

    /// Update order status, validating the transition
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderResponse, OrderError> {
        let order = self
            .orders_repo
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        StatusMachine::transition(order.status, new_status)
            .map_err(OrderError::InvalidTransition)?;

        let updated = self.orders_repo.update_status(order_id, new_status).await?;

        self.to_response(updated).await
    }

    /// Update payment status
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        new_payment_status: PaymentStatus,
    ) -> Result<OrderResponse, OrderError> {
        self.orders_repo
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        let updated = self
            .orders_repo
            .update_payment_status(order_id, new_payment_status)
            .await?;

        self.to_response(updated).await
    }

    async fn to_response(&self, order: Order) -> Result<OrderResponse, OrderError> {
        let items = self.order_items_repo.find_by_order_id(order.id).await?;
        let deals = self.order_deals_repo.find_by_order_id(order.id).await?;

        Ok(OrderResponse {
            id: order.id,
            customer_id: order.customer_id,
            branch_id: order.branch_id,
            status: order.status,
            payment_status: order.payment_status,
            subtotal: order.subtotal,
            discount_total: order.discount_total,
            total_price: order.total_price,
            items: items.into_iter().map(Into::into).collect(),
            applied_deals: deals.into_iter().map(Into::into).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}
