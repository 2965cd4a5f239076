use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres, Row};

use crate::{
    Address, Money, NewOrderItem, Order, OrderFilter, OrderId, OrderItem, OrderStatus, ProductId,
    Result, StoreError, UserId,
    store::{OrderStore, StatusUpdate},
};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

const ORDER_COLUMNS: &str = "order_id, user_id, currency, total_amount_cents, item_count, \
     street_address, city, state, country, zip_code, email, status, payment_method, \
     created_at, updated_at, paid_at, shipped_at, delivered_at";

const ITEM_COLUMNS: &str =
    "order_item_id, order_id, product_id, product_name, quantity, unit_price_cents, cost_cents";

/// Number of parameters bound by [`bind_update`].
const UPDATE_PARAMS: usize = 6;

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Order {
            order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
            user_id: UserId::new(narrow("user_id", row.try_get("user_id")?)?),
            currency: row.try_get("currency")?,
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            item_count: narrow("item_count", row.try_get("item_count")?)?,
            address: Address {
                street_address: row.try_get("street_address")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                country: row.try_get("country")?,
                zip_code: row.try_get("zip_code")?,
            },
            email: row.try_get("email")?,
            status,
            payment_method: row.try_get("payment_method")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            paid_at: row.try_get("paid_at")?,
            shipped_at: row.try_get("shipped_at")?,
            delivered_at: row.try_get("delivered_at")?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            order_item_id: row.try_get("order_item_id")?,
            order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
            product_id: ProductId::new(narrow("product_id", row.try_get("product_id")?)?),
            product_name: row.try_get("product_name")?,
            quantity: narrow("quantity", row.try_get("quantity")?)?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            cost: Money::from_cents(row.try_get("cost_cents")?),
        })
    }
}

fn narrow(column: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn status_names(statuses: &[OrderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// Appends the filter predicate, numbering parameters after `param_count`.
fn push_filter(sql: &mut String, filter: &OrderFilter, param_count: &mut usize) {
    if filter.order_id.is_some() {
        *param_count += 1;
        sql.push_str(&format!(" AND order_id = ${param_count}"));
    }
    if filter.user_id.is_some() {
        *param_count += 1;
        sql.push_str(&format!(" AND user_id = ${param_count}"));
    }
    if filter.statuses.is_some() {
        *param_count += 1;
        sql.push_str(&format!(" AND status = ANY(${param_count})"));
    }
    if filter.created_after.is_some() {
        *param_count += 1;
        sql.push_str(&format!(" AND created_at > ${param_count}"));
    }
    if filter.created_before.is_some() {
        *param_count += 1;
        sql.push_str(&format!(" AND created_at < ${param_count}"));
    }
}

/// Binds the filter parameters in the order [`push_filter`] numbered them.
fn bind_filter<'q>(mut query: PgQuery<'q>, filter: &'q OrderFilter) -> PgQuery<'q> {
    if let Some(ref order_id) = filter.order_id {
        query = query.bind(order_id.as_str());
    }
    if let Some(user_id) = filter.user_id {
        query = query.bind(i64::from(user_id.get()));
    }
    if let Some(ref statuses) = filter.statuses {
        query = query.bind(status_names(statuses));
    }
    if let Some(after) = filter.created_after {
        query = query.bind(after);
    }
    if let Some(before) = filter.created_before {
        query = query.bind(before);
    }
    query
}

/// `SET` clause shared by both conditional updates. Unset optional fields
/// keep their stored value.
fn update_sql() -> &'static str {
    "UPDATE orders SET status = $1, updated_at = $2, \
     paid_at = COALESCE($3, paid_at), \
     shipped_at = COALESCE($4, shipped_at), \
     delivered_at = COALESCE($5, delivered_at), \
     payment_method = COALESCE($6, payment_method) \
     WHERE 1=1"
}

fn bind_update<'q>(query: PgQuery<'q>, update: &'q StatusUpdate) -> PgQuery<'q> {
    query
        .bind(update.status.as_str())
        .bind(update.updated_at)
        .bind(update.paid_at)
        .bind(update.shipped_at)
        .bind(update.delivered_at)
        .bind(update.payment_method.as_deref())
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_atomic(
        &self,
        order: &Order,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>> {
        // Dropping the transaction without commit rolls it back
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        ))
        .bind(order.order_id.as_str())
        .bind(i64::from(order.user_id.get()))
        .bind(&order.currency)
        .bind(order.total_amount.cents())
        .bind(i64::from(order.item_count))
        .bind(&order.address.street_address)
        .bind(&order.address.city)
        .bind(&order.address.state)
        .bind(&order.address.country)
        .bind(order.address.zip_code)
        .bind(&order.email)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.paid_at)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateOrder(order.order_id.clone());
            }
            StoreError::Database(e)
        })?;

        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let order_item_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price_cents, cost_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING order_item_id
                "#,
            )
            .bind(order.order_id.as_str())
            .bind(i64::from(item.product_id.get()))
            .bind(&item.product_name)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .bind(item.cost.cents())
            .fetch_one(&mut *tx)
            .await?;

            created.push(OrderItem::from_new(
                order_item_id,
                order.order_id.clone(),
                item,
            ));
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn conditional_update(
        &self,
        order_id: &OrderId,
        where_status_in: &[OrderStatus],
        update: &StatusUpdate,
    ) -> Result<u64> {
        let sql = format!(
            "{} AND order_id = ${} AND status = ANY(${})",
            update_sql(),
            UPDATE_PARAMS + 1,
            UPDATE_PARAMS + 2
        );

        let result = bind_update(sqlx::query(&sql), update)
            .bind(order_id.as_str())
            .bind(status_names(where_status_in))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn update_matching(&self, filter: &OrderFilter, update: &StatusUpdate) -> Result<u64> {
        if !filter.is_status_guarded() {
            return Err(StoreError::UnguardedUpdate);
        }

        let mut sql = update_sql().to_string();
        let mut param_count = UPDATE_PARAMS;
        push_filter(&mut sql, filter, &mut param_count);

        let query = bind_update(sqlx::query(&sql), update);
        let result = bind_filter(query, filter).execute(&self.pool).await?;

        let changed = result.rows_affected();
        tracing::debug!(rows = changed, "bulk status update applied");
        Ok(changed)
    }

    async fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;
        push_filter(&mut sql, filter, &mut param_count);

        sql.push_str(" ORDER BY created_at DESC, order_id DESC");

        if filter.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if filter.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut query = bind_filter(sqlx::query(&sql), filter);
        if let Some(limit) = filter.limit {
            query = query.bind(limit as i64);
        }
        if let Some(offset) = filter.offset {
            query = query.bind(offset as i64);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn count_by_order_id(&self, order_id: &OrderId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_id = $1")
            .bind(order_id.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"))
                .bind(order_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY order_item_id ASC"
        ))
        .bind(order_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }
}
