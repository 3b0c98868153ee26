use log::{debug, warn};
use sqlx::SqliteConnection;

use crate::{
    db_types::{CartLine, OrderId, Product, ProductVariant, SkippedStockLine, StockAdjustment},
    errors::{SettlementError, ValidationError},
};

pub async fn upsert_product(product: Product, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let id = product.id.clone();
    sqlx::query(
        r#"
            INSERT INTO products (id, vendor_id, name, price, stock_quantity) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                vendor_id = excluded.vendor_id,
                name = excluded.name,
                price = excluded.price,
                stock_quantity = excluded.stock_quantity;
        "#,
    )
    .bind(product.id)
    .bind(product.vendor_id)
    .bind(product.name)
    .bind(product.price)
    .bind(product.stock_quantity)
    .execute(&mut *conn)
    .await?;
    fetch_product(&id, conn).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn upsert_variant(variant: ProductVariant, conn: &mut SqliteConnection) -> Result<ProductVariant, sqlx::Error> {
    let id = variant.id.clone();
    sqlx::query(
        r#"
            INSERT INTO product_variants (id, product_id, name, stock_quantity) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                product_id = excluded.product_id,
                name = excluded.name,
                stock_quantity = excluded.stock_quantity;
        "#,
    )
    .bind(variant.id)
    .bind(variant.product_id)
    .bind(variant.name)
    .bind(variant.stock_quantity)
    .execute(&mut *conn)
    .await?;
    fetch_variant(&id, conn).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn fetch_product(id: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_variant(id: &str, conn: &mut SqliteConnection) -> Result<Option<ProductVariant>, sqlx::Error> {
    let variant = sqlx::query_as("SELECT * FROM product_variants WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(variant)
}

/// The outcome of reconciling one cart line against the catalog.
pub enum StockOutcome {
    Adjusted(StockAdjustment),
    Skipped(SkippedStockLine),
}

/// Decrements stock for one cart line in a single statement.
///
/// The variant is decremented when the line names one, otherwise the product is. In the default mode the quantity is
/// floored at zero. With `reject_oversell`, the decrement only applies when enough stock remains, and
/// `ValidationError::InsufficientStock` is returned otherwise. A missing product or variant is logged and reported as
/// skipped.
pub async fn decrement_stock(
    order_id: &OrderId,
    line: &CartLine,
    reject_oversell: bool,
    conn: &mut SqliteConnection,
) -> Result<StockOutcome, SettlementError> {
    let (table, id) = match &line.variant_id {
        Some(variant_id) => ("product_variants", variant_id.as_str()),
        None => ("products", line.product_id.as_str()),
    };
    let sql = if reject_oversell {
        format!(
            "UPDATE {table} SET stock_quantity = stock_quantity - $1 WHERE id = $2 AND stock_quantity >= $3 RETURNING \
             stock_quantity"
        )
    } else {
        format!("UPDATE {table} SET stock_quantity = MAX(0, stock_quantity - $1) WHERE id = $2 RETURNING stock_quantity")
    };
    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(line.quantity).bind(id);
    if reject_oversell {
        query = query.bind(line.quantity);
    }
    // RETURNING statements are stepped to completion so the write is never left pending
    let remaining = query.fetch_all(&mut *conn).await?.into_iter().next();
    if let Some(remaining) = remaining {
        debug!("🗃️ Stock for {table}:{id} decremented by {} to {remaining}", line.quantity);
        return Ok(StockOutcome::Adjusted(StockAdjustment {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            requested: line.quantity,
            remaining,
        }));
    }
    let available: Option<i64> = sqlx::query_scalar(&format!("SELECT stock_quantity FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match available {
        Some(available) => Err(ValidationError::InsufficientStock {
            product_id: line.product_id.clone(),
            variant: line.variant_id.clone(),
            requested: line.quantity,
            available,
        }
        .into()),
        None => {
            warn!(
                "🗃️ Order {order_id} sold {} of {table}:{id}, which is not in the catalog. Stock was not updated.",
                line.quantity
            );
            Ok(StockOutcome::Skipped(SkippedStockLine {
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                quantity: line.quantity,
            }))
        },
    }
}
