use anyhow::Result;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

/// Opens the pool used by every store adapter.
///
/// Supabase fronts Postgres with a transaction pooler that rejects reused
/// prepared statements, so the statement cache is disabled.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let opts = database_url
        .parse::<PgConnectOptions>()?
        .statement_cache_capacity(0);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id BIGSERIAL PRIMARY KEY,
            review_text TEXT NOT NULL DEFAULT '',
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS reviews_created_at_idx ON reviews (created_at DESC);")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS uploaded_files (
            id BIGSERIAL PRIMARY KEY,
            filename TEXT NOT NULL,
            storage_path TEXT NOT NULL UNIQUE,
            file_url TEXT NOT NULL,
            business_name TEXT NOT NULL,
            file_size BIGINT NOT NULL,
            file_type VARCHAR(16) NOT NULL DEFAULT 'csv',
            uploaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    info!("🗄️ Database schema ready");
    Ok(())
}
