use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

pub type Db = sqlx::PgPool;

pub async fn connect() -> anyhow::Result<Db> {
    let url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL missing; point it at the fakestore Postgres database")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .with_context(|| "failed to connect to database; check DATABASE_URL")?;
    Ok(pool)
}

pub async fn run_migrations(db: &Db) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("failed to apply database migrations")?;
    Ok(())
}
