use chrono::Utc;
use sqlx::SqliteConnection;
use storefront_common::BasisPoints;

use crate::db_types::{Affiliate, Vendor};

/// Inserts or renames a vendor. Run it inside a transaction so the row is committed before the connection is reused.
pub async fn upsert_vendor(id: &str, name: &str, conn: &mut SqliteConnection) -> Result<Vendor, sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO vendors (id, name, created_at) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name;
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    fetch_vendor(id, conn).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn upsert_affiliate(
    id: &str,
    name: &str,
    commission_rate: BasisPoints,
    conn: &mut SqliteConnection,
) -> Result<Affiliate, sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO affiliates (id, name, commission_rate, created_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name, commission_rate = excluded.commission_rate;
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(commission_rate)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    fetch_affiliate(id, conn).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn fetch_vendor(id: &str, conn: &mut SqliteConnection) -> Result<Option<Vendor>, sqlx::Error> {
    let vendor = sqlx::query_as("SELECT * FROM vendors WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(vendor)
}

pub async fn fetch_affiliate(id: &str, conn: &mut SqliteConnection) -> Result<Option<Affiliate>, sqlx::Error> {
    let affiliate = sqlx::query_as("SELECT * FROM affiliates WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(affiliate)
}
