use thiserror::Error;

use crate::actor::pressure_barrier::BarrierError;
use crate::model::{NotificationKey, SourceKey};

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("Source not found: {0}")]
    UnknownSource(SourceKey),
    #[error("Notification not found: {0:?}")]
    UnknownNotification(NotificationKey),
    #[error("Pressure zone not found: {0}")]
    UnknownZone(String),
    #[error("Pressure barrier error: {0}")]
    Barrier(#[from] BarrierError),
}
