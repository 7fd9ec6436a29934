use crate::errors::TrackingError;
use crate::fleet_dataset::StreamFrame;
use crate::position_store::PositionStore;
use tracing::warn;

/// Translates inbound text frames into position store mutations. Frames
/// are applied strictly in arrival order; payload timestamps are not
/// consulted.
pub struct MessageDispatcher {
    store: PositionStore,
}

impl MessageDispatcher {
    pub fn new(store: PositionStore) -> Self {
        Self { store }
    }

    pub fn decode(text: &str) -> Result<StreamFrame, TrackingError> {
        Ok(serde_json::from_str::<StreamFrame>(text)?)
    }

    pub async fn apply(&self, frame: StreamFrame) {
        match frame {
            StreamFrame::Snapshot(positions) => {
                self.store.replace_all(positions).await;
            }
            StreamFrame::Update(position) => {
                self.store.upsert(position).await;
            }
            //proof of liveness only
            StreamFrame::HeartbeatAck => {}
            //server-bound kind, nothing to apply
            StreamFrame::Ping => {}
            StreamFrame::Unknown => {
                warn!("discarding frame of unrecognised kind");
            }
        }
    }

    /// Malformed frames die here with a warning and never reach the store.
    pub async fn apply_text(&self, text: &str) {
        match Self::decode(text) {
            Ok(frame) => self.apply(frame).await,
            Err(e) => warn!("discarding malformed frame: {}", e),
        }
    }
}
