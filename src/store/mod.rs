pub mod postgres;

use async_trait::async_trait;

use crate::models::device::DeviceStatus;

/// The device-store seam.
///
/// Both operations are idempotent and tolerant of a missing key: updating or
/// deleting a record that does not exist is a silent no-op, never an error.
/// Single-record atomicity is all the gateway needs — every action touches
/// exactly one device.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn update_status(&self, device_id: &str, status: DeviceStatus) -> anyhow::Result<()>;
    async fn delete(&self, device_id: &str) -> anyhow::Result<()>;
}
