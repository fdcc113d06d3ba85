use async_trait::async_trait;
use sqlx::PgPool;

use super::DeviceStore;
use crate::models::device::DeviceStatus;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for PgStore {
    async fn update_status(&self, device_id: &str, status: DeviceStatus) -> anyhow::Result<()> {
        // An UPDATE matching zero rows is the documented no-op for unknown
        // devices — no upsert.
        sqlx::query("UPDATE devices SET status = $2 WHERE device_id = $1")
            .bind(device_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, device_id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM devices WHERE device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
