use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::spots::{validate, Spot, SpotError, SpotsView};
use crate::ws::{Connection, ServerMessage, WsRegistry};

/// In-memory spot collections, one per user subject.
///
/// Every mutation is a read-modify-write under the write lock, and the new
/// state is queued on the user's sockets before the lock is released. Frames
/// therefore reach each socket in the same order the mutations were applied.
#[derive(Clone, Default)]
pub struct ItineraryService {
    collections: Arc<RwLock<HashMap<String, Vec<Spot>>>>,
    sockets: WsRegistry,
}

impl ItineraryService {
    pub fn new(sockets: WsRegistry) -> Self {
        Self {
            collections: Arc::default(),
            sockets,
        }
    }

    /// Current collection of `sub`; empty if the user never stored one.
    pub async fn get(&self, sub: &str) -> Vec<Spot> {
        self.collections
            .read()
            .await
            .get(sub)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the collection of `sub` after checking it.
    pub async fn replace(&self, sub: &str, spots: Vec<Spot>) -> Result<SpotsView, SpotError> {
        validate(&spots)?;
        let mut collections = self.collections.write().await;
        collections.insert(sub.to_string(), spots.clone());
        tracing::debug!(sub, count = spots.len(), "itinerary replaced");

        let view = SpotsView::of(spots);
        self.publish(sub, &view).await;
        Ok(view)
    }

    /// Apply `f` to the collection of `sub`, store the result and push it.
    pub async fn update<F>(&self, sub: &str, f: F) -> SpotsView
    where
        F: FnOnce(&[Spot]) -> Vec<Spot>,
    {
        let mut collections = self.collections.write().await;
        let current = collections.entry(sub.to_string()).or_default();
        let next = f(current);
        *current = next.clone();

        let view = SpotsView::of(next);
        self.publish(sub, &view).await;
        view
    }

    /// Queue the current state of `sub` on a freshly registered socket.
    ///
    /// Taken under the lock so no mutation can slip between reading the
    /// snapshot and queuing it.
    pub async fn send_snapshot(&self, sub: &str, connection: &Connection) {
        let collections = self.collections.read().await;
        let view = SpotsView::of(collections.get(sub).cloned().unwrap_or_default());
        if let Some(frame) = ServerMessage::Spots(&view).to_frame() {
            connection.send(frame);
        }
    }

    // Callers hold the collections lock.
    async fn publish(&self, sub: &str, view: &SpotsView) {
        if let Some(frame) = ServerMessage::Spots(view).to_frame() {
            let delivered = self.sockets.send_to(sub, frame).await;
            tracing::debug!(sub, delivered, "pushed spots update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spots::{projection, reorder, reset, toggle};
    use axum::extract::ws::Message;

    fn service() -> ItineraryService {
        ItineraryService::new(WsRegistry::new())
    }

    fn frame_view(message: Message) -> SpotsView {
        let Message::Text(text) = message else {
            panic!("expected text frame, got {message:?}");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        serde_json::from_value(value["data"].clone()).unwrap()
    }

    #[tokio::test]
    async fn unknown_user_reads_empty_collection() {
        assert!(service().get("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn replace_rejects_invalid_collection() {
        let service = service();
        let err = service
            .replace("u1", vec![Spot::selected("A", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, SpotError::IndexNotDense { .. }));
        assert!(service.get("u1").await.is_empty());
    }

    #[tokio::test]
    async fn update_is_visible_to_next_read() {
        let service = service();
        service
            .replace("u1", vec![Spot::selected("A", 0), Spot::selected("B", 1)])
            .await
            .unwrap();

        let updated = service.update("u1", |spots| reorder(spots, "B", "A")).await;
        let stored = service.get("u1").await;
        assert_eq!(updated.spots, stored);

        let order: Vec<_> = projection(&stored).iter().map(|s| s.name.clone()).collect();
        assert_eq!(order, ["B", "A"]);
    }

    #[tokio::test]
    async fn collections_are_per_user() {
        let service = service();
        service.replace("u1", vec![Spot::selected("A", 0)]).await.unwrap();
        service.replace("u2", vec![Spot::selected("A", 0)]).await.unwrap();

        service.update("u1", reset).await;

        assert!(!service.get("u1").await[0].is_selected);
        assert!(service.get("u2").await[0].is_selected);
    }

    #[tokio::test]
    async fn concurrent_toggles_keep_indices_dense() {
        let service = service();
        let spots: Vec<Spot> = (0..20).map(|i| Spot::new(format!("spot-{i}"))).collect();
        service.replace("u1", spots).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("spot-{i}");
                service.update("u1", |spots| toggle(spots, &name)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = service.get("u1").await;
        validate(&stored).unwrap();
        assert_eq!(projection(&stored).len(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn last_pushed_frame_matches_store_under_concurrent_updates() {
        let sockets = WsRegistry::new();
        let service = ItineraryService::new(sockets.clone());
        let spots: Vec<Spot> = (0..40).map(|i| Spot::new(format!("spot-{i}"))).collect();
        service.replace("u1", spots).await.unwrap();

        let mut connection = sockets.register("u1").await;
        service.send_snapshot("u1", &connection).await;

        let mut handles = Vec::new();
        for i in 0..40 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("spot-{i}");
                service.update("u1", |spots| toggle(spots, &name)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let frames = connection.drain();
        assert_eq!(frames.len(), 41, "snapshot plus one frame per update");
        let last = frame_view(frames.into_iter().last().unwrap());
        assert_eq!(last, SpotsView::of(service.get("u1").await));
    }

    #[tokio::test]
    async fn snapshot_reflects_updates_applied_before_it() {
        let sockets = WsRegistry::new();
        let service = ItineraryService::new(sockets.clone());
        service.replace("u1", vec![Spot::new("A")]).await.unwrap();

        let mut connection = sockets.register("u1").await;
        service.update("u1", |spots| toggle(spots, "A")).await;
        service.send_snapshot("u1", &connection).await;

        let frames = connection.drain();
        assert_eq!(frames.len(), 2);
        for frame in frames {
            assert_eq!(frame_view(frame).selected[0].name, "A");
        }
    }
}
