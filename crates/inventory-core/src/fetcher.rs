//! ============================================================================
//! Inventory Fetcher - One player's inventory and armory, fetched once
//! ============================================================================
//! Posts the player identity to `/spartan`, decodes the response and keeps
//! the pieces for the UI. A successful fetch fills a single-slot cache that
//! only `force` bypasses. Failures are logged and absorbed by `fetch`;
//! `try_fetch` returns them instead.
//! ============================================================================

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::config::InventoryConfig;
use crate::response::{decode_response, truncate, DecodedResponse, MAX_ERROR_BODY_CHARS};
use crate::transport::{HttpTransport, InventoryTransport};
use crate::types::{
    ArmoryCategory, ArmorySnapshot, CacheState, CurrentlyEquipped, FetchOptions, FetchOutcome,
    FetchStatus, HighlightSelection, InventoryError, InventoryRecord, ItemId, PlayerIdentity,
};

/// Mutable state, written only under the in-flight lock (or by setters)
#[derive(Debug, Clone)]
struct FetcherState {
    status: FetchStatus,
    cache: CacheState,
    spartan_inventory: Option<InventoryRecord>,
    armory_row: Option<ArmorySnapshot>,
    currently_equipped: CurrentlyEquipped,
    highlight_selection: Option<HighlightSelection>,
    last_error: Option<InventoryError>,
}

impl FetcherState {
    fn new(options: &FetchOptions) -> Self {
        Self {
            status: FetchStatus::Loading,
            cache: CacheState::Empty,
            spartan_inventory: None,
            armory_row: None,
            currently_equipped: CurrentlyEquipped::default(),
            highlight_selection: options.tracks_highlights().then(HighlightSelection::default),
            last_error: None,
        }
    }

    fn commit(&mut self, decoded: DecodedResponse) {
        self.spartan_inventory = Some(decoded.inventory);
        if let Some(armory) = decoded.armory {
            self.armory_row = Some(armory.snapshot);
            self.currently_equipped = armory.currently_equipped;
            if let (Some(current), Some(seeded)) =
                (self.highlight_selection.as_mut(), armory.highlights.as_ref())
            {
                current.merge(seeded);
            }
        }
        self.status = FetchStatus::Loaded;
        self.cache = CacheState::Filled;
        self.last_error = None;
    }

    fn fail(&mut self, error: InventoryError) {
        self.status = FetchStatus::Failed;
        self.last_error = Some(error);
    }
}

/// Fetches and holds one player's inventory
pub struct InventoryFetcher {
    identity: PlayerIdentity,
    options: FetchOptions,
    config: InventoryConfig,
    transport: Arc<dyn InventoryTransport>,
    in_flight: Mutex<()>,
    state: RwLock<FetcherState>,
}

impl InventoryFetcher {
    /// Create a fetcher talking HTTP to the configured backend
    pub fn new(
        identity: PlayerIdentity,
        options: FetchOptions,
        config: InventoryConfig,
    ) -> Result<Self, InventoryError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(identity, options, config, Arc::new(transport)))
    }

    /// Create a fetcher over any transport
    pub fn with_transport(
        identity: PlayerIdentity,
        options: FetchOptions,
        config: InventoryConfig,
        transport: Arc<dyn InventoryTransport>,
    ) -> Self {
        Self {
            state: RwLock::new(FetcherState::new(&options)),
            identity,
            options,
            config,
            transport,
            in_flight: Mutex::new(()),
        }
    }

    /// Fetch unless an earlier fetch succeeded and `force` is false.
    /// Errors are logged and recorded, never returned.
    pub async fn fetch(&self, force: bool) {
        if let Err(e) = self.try_fetch(force).await {
            error!("Error fetching Spartan inventory: {}", e);
        }
    }

    /// Same as `fetch` but hands the outcome back to the caller
    pub async fn try_fetch(&self, force: bool) -> Result<FetchOutcome, InventoryError> {
        // Waiters see the in-flight request's result before deciding
        let _flight = self.in_flight.lock().await;

        if !force && self.state.read().await.cache == CacheState::Filled {
            debug!("Inventory already fetched, skipping request");
            return Ok(FetchOutcome::Cached);
        }

        match self.request().await {
            Ok(decoded) => {
                let mut state = self.state.write().await;
                state.commit(decoded);
                info!(
                    "Fetched Spartan inventory (armory: {}, highlights: {})",
                    self.options.include_armory,
                    self.options.tracks_highlights()
                );
                Ok(FetchOutcome::Fetched)
            }
            Err(e) => {
                self.state.write().await.fail(e.clone());
                Err(e)
            }
        }
    }

    async fn request(&self) -> Result<DecodedResponse, InventoryError> {
        let url = self.request_url();
        debug!("Requesting Spartan inventory from {}", url);

        let response = self.transport.post_json(&url, self.identity.payload()).await?;
        if !response.is_success() {
            return Err(InventoryError::Status {
                status: response.status,
                body: truncate(&response.body, MAX_ERROR_BODY_CHARS).to_string(),
            });
        }

        decode_response(&response.body, &self.options)
    }

    /// URL the next request will go to
    pub fn request_url(&self) -> String {
        self.config.spartan_url(self.options.include_armory)
    }

    pub fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    pub fn options(&self) -> FetchOptions {
        self.options
    }

    pub async fn status(&self) -> FetchStatus {
        self.state.read().await.status
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.status == FetchStatus::Loading
    }

    /// True once any fetch has succeeded
    pub async fn is_fetched(&self) -> bool {
        self.state.read().await.cache == CacheState::Filled
    }

    /// Error from the most recent failed fetch, cleared on success
    pub async fn last_error(&self) -> Option<InventoryError> {
        self.state.read().await.last_error.clone()
    }

    pub async fn spartan_inventory(&self) -> Option<InventoryRecord> {
        self.state.read().await.spartan_inventory.clone()
    }

    pub async fn armory_row(&self) -> Option<ArmorySnapshot> {
        self.state.read().await.armory_row.clone()
    }

    pub async fn set_armory_row(&self, armory_row: Option<ArmorySnapshot>) {
        self.state.write().await.armory_row = armory_row;
    }

    pub async fn currently_equipped(&self) -> CurrentlyEquipped {
        self.state.read().await.currently_equipped.clone()
    }

    pub async fn set_currently_equipped(&self, equipped: CurrentlyEquipped) {
        self.state.write().await.currently_equipped = equipped;
    }

    /// `None` unless the fetcher was built to track highlights
    pub async fn highlight_selection(&self) -> Option<HighlightSelection> {
        self.state.read().await.highlight_selection.clone()
    }

    /// Select an item in one category. No-op when highlights are not tracked.
    pub async fn set_highlight(&self, category: ArmoryCategory, id: impl Into<ItemId>) {
        if let Some(selection) = self.state.write().await.highlight_selection.as_mut() {
            selection.set(category, id);
        }
    }

    pub async fn clear_highlight(&self, category: ArmoryCategory) {
        if let Some(selection) = self.state.write().await.highlight_selection.as_mut() {
            selection.clear(category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportResponse;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    const BASE: &str = "http://inventory.test";

    /// Records requests and replays queued responses; the last one repeats
    struct MockTransport {
        calls: StdMutex<Vec<(String, Value)>>,
        responses: StdMutex<VecDeque<Result<TransportResponse, InventoryError>>>,
        delay: Option<Duration>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<TransportResponse, InventoryError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: StdMutex::new(Vec::new()),
                responses: StdMutex::new(responses.into()),
                delay: None,
            })
        }

        fn slow(response: Result<TransportResponse, InventoryError>) -> Arc<Self> {
            Arc::new(Self {
                calls: StdMutex::new(Vec::new()),
                responses: StdMutex::new(vec![response].into()),
                delay: Some(Duration::from_millis(50)),
            })
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InventoryTransport for MockTransport {
        async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, InventoryError> {
            self.calls.lock().unwrap().push((url.to_string(), body.clone()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }
    }

    fn ok(body: Value) -> Result<TransportResponse, InventoryError> {
        Ok(TransportResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn inventory_body(tag: &str) -> Value {
        json!({"PlayerInventory": [{"Owner": tag}, {"Owner": "ignored"}]})
    }

    fn armory_body() -> Value {
        json!({
            "PlayerInventory": [{"Owner": "abc"}],
            "ArmoryRow": [{"id": "core-1"}, {"id": "core-2", "isHighlighted": true}],
            "ArmoryRowHelmets": [{"id": "helm-1", "isHighlighted": false}],
            "ArmoryRowVisors": [{"id": "visor-1", "isHighlighted": true}],
            "ArmoryRowGloves": [{"id": "glove-1", "isHighlighted": true}],
            "ArmoryRowCoatings": [],
            "CurrentlyEquipped": {
                "CurrentlyEquippedCore": "core-2",
                "CurrentlyEquippedHelmet": "helm-1",
                "CurrentlyEquippedVisor": "visor-1",
                "CurrentlyEquippedGlove": "glove-1",
                "CurrentlyEquippedCoating": null
            }
        })
    }

    fn fetcher(options: FetchOptions, transport: Arc<MockTransport>) -> InventoryFetcher {
        InventoryFetcher::with_transport(
            PlayerIdentity::new(json!({"id": "abc"})),
            options,
            InventoryConfig::from_env().with_base_url(BASE),
            transport,
        )
    }

    #[tokio::test]
    async fn test_initial_state() {
        let f = fetcher(FetchOptions::default(), MockTransport::new(vec![ok(inventory_body("abc"))]));
        assert!(f.is_loading().await);
        assert!(!f.is_fetched().await);
        assert_eq!(f.status().await, FetchStatus::Loading);
        assert!(f.spartan_inventory().await.is_none());
        assert!(f.highlight_selection().await.is_none());
    }

    #[tokio::test]
    async fn test_inventory_only_scenario() {
        let transport = MockTransport::new(vec![ok(inventory_body("abc"))]);
        let f = fetcher(FetchOptions::inventory_only(), transport.clone());

        f.fetch(false).await;

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, format!("{}/spartan", BASE));
        assert_eq!(calls[0].1, json!({"id": "abc"}));

        assert_eq!(f.spartan_inventory().await, Some(InventoryRecord(json!({"Owner": "abc"}))));
        assert!(f.armory_row().await.is_none());
        assert_eq!(f.currently_equipped().await, CurrentlyEquipped::default());
        assert!(!f.is_loading().await);
        assert!(f.is_fetched().await);
        assert_eq!(f.status().await, FetchStatus::Loaded);
    }

    #[tokio::test]
    async fn test_armory_response_ignored_without_option() {
        let transport = MockTransport::new(vec![ok(armory_body())]);
        let f = fetcher(FetchOptions::inventory_only(), transport.clone());

        f.fetch(false).await;

        assert!(!transport.calls()[0].0.contains("includeArmory"));
        assert!(f.armory_row().await.is_none());
        assert_eq!(f.currently_equipped().await, CurrentlyEquipped::default());
        assert!(f.highlight_selection().await.is_none());
    }

    #[tokio::test]
    async fn test_armory_with_highlights() {
        let transport = MockTransport::new(vec![ok(armory_body())]);
        let f = fetcher(FetchOptions::with_highlights(), transport.clone());

        f.fetch(false).await;

        assert_eq!(
            transport.calls()[0].0,
            format!("{}/spartan?includeArmory=true", BASE)
        );
        let armory = f.armory_row().await.unwrap();
        assert_eq!(armory.cores.len(), 2);

        let equipped = f.currently_equipped().await;
        assert_eq!(equipped.core, Some(ItemId::from("core-2")));
        assert_eq!(equipped.coating, None);

        let selection = f.highlight_selection().await.unwrap();
        assert_eq!(selection.get(ArmoryCategory::Core), Some(&ItemId::from("core-2")));
        assert_eq!(selection.get(ArmoryCategory::Helmet), None);
        assert_eq!(selection.get(ArmoryCategory::Visor), Some(&ItemId::from("visor-1")));
        assert_eq!(selection.get(ArmoryCategory::Glove), Some(&ItemId::from("glove-1")));
        assert_eq!(selection.get(ArmoryCategory::Coating), None);
    }

    #[tokio::test]
    async fn test_highlights_merge_into_caller_selection() {
        let transport = MockTransport::new(vec![ok(armory_body())]);
        let f = fetcher(FetchOptions::with_highlights(), transport);

        f.set_highlight(ArmoryCategory::Helmet, "helm-picked").await;
        f.set_highlight(ArmoryCategory::Core, "core-picked").await;
        f.fetch(false).await;

        let selection = f.highlight_selection().await.unwrap();
        // Helmet row has no highlighted entry, so the caller's pick survives
        assert_eq!(selection.get(ArmoryCategory::Helmet), Some(&ItemId::from("helm-picked")));
        assert_eq!(selection.get(ArmoryCategory::Core), Some(&ItemId::from("core-2")));
    }

    #[tokio::test]
    async fn test_armory_without_highlight_tracking() {
        let f = fetcher(FetchOptions::with_armory(), MockTransport::new(vec![ok(armory_body())]));
        f.set_highlight(ArmoryCategory::Core, "ignored").await;
        f.fetch(false).await;
        assert!(f.armory_row().await.is_some());
        assert!(f.highlight_selection().await.is_none());
    }

    #[tokio::test]
    async fn test_second_fetch_is_cached() {
        let transport = MockTransport::new(vec![ok(inventory_body("abc"))]);
        let f = fetcher(FetchOptions::default(), transport.clone());

        assert_eq!(f.try_fetch(false).await, Ok(FetchOutcome::Fetched));
        assert_eq!(f.try_fetch(false).await, Ok(FetchOutcome::Cached));
        f.fetch(false).await;

        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_force_refetches() {
        let transport = MockTransport::new(vec![
            ok(inventory_body("first")),
            ok(inventory_body("second")),
        ]);
        let f = fetcher(FetchOptions::default(), transport.clone());

        f.fetch(false).await;
        f.fetch(true).await;

        assert_eq!(transport.calls().len(), 2);
        assert_eq!(f.spartan_inventory().await, Some(InventoryRecord(json!({"Owner": "second"}))));
    }

    #[tokio::test]
    async fn test_network_failure_is_absorbed() {
        let transport = MockTransport::new(vec![Err(InventoryError::Transport(
            "connection refused".to_string(),
        ))]);
        let f = fetcher(FetchOptions::with_highlights(), transport.clone());

        f.fetch(false).await;

        assert!(!f.is_loading().await);
        assert!(!f.is_fetched().await);
        assert_eq!(f.status().await, FetchStatus::Failed);
        assert!(f.spartan_inventory().await.is_none());
        assert!(f.armory_row().await.is_none());
        assert_eq!(f.highlight_selection().await, Some(HighlightSelection::default()));
        assert!(matches!(f.last_error().await, Some(InventoryError::Transport(_))));

        // Not fetched, so a plain retry goes out again
        f.fetch(false).await;
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_data() {
        let transport = MockTransport::new(vec![
            ok(armory_body()),
            Ok(TransportResponse {
                status: 503,
                body: "maintenance".to_string(),
            }),
        ]);
        let f = fetcher(FetchOptions::with_highlights(), transport);

        f.fetch(false).await;
        f.set_highlight(ArmoryCategory::Helmet, "helm-picked").await;
        let before_inventory = f.spartan_inventory().await;
        let before_armory = f.armory_row().await;
        let before_equipped = f.currently_equipped().await;
        let before_selection = f.highlight_selection().await;

        let result = f.try_fetch(true).await;
        assert_eq!(
            result,
            Err(InventoryError::Status {
                status: 503,
                body: "maintenance".to_string()
            })
        );
        assert_eq!(f.spartan_inventory().await, before_inventory);
        assert_eq!(f.armory_row().await, before_armory);
        assert_eq!(f.currently_equipped().await, before_equipped);
        assert_eq!(f.highlight_selection().await, before_selection);
        assert_eq!(
            before_selection.unwrap().get(ArmoryCategory::Helmet),
            Some(&ItemId::from("helm-picked"))
        );
        assert!(f.is_fetched().await);
        assert_eq!(f.status().await, FetchStatus::Failed);
    }

    #[tokio::test]
    async fn test_status_error_body_is_truncated() {
        let page = format!("<html>{}</html>", "x".repeat(5000));
        let transport = MockTransport::new(vec![Ok(TransportResponse {
            status: 502,
            body: page.clone(),
        })]);
        let f = fetcher(FetchOptions::default(), transport);

        match f.try_fetch(false).await {
            Err(InventoryError::Status { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body.chars().count(), MAX_ERROR_BODY_CHARS);
                assert!(page.starts_with(&body));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_inventory_fails_cleanly() {
        let transport = MockTransport::new(vec![ok(json!({"PlayerInventory": []}))]);
        let f = fetcher(FetchOptions::default(), transport);

        assert_eq!(f.try_fetch(false).await, Err(InventoryError::EmptyInventory));
        assert!(f.spartan_inventory().await.is_none());
        assert!(!f.is_fetched().await);
        assert_eq!(f.last_error().await, Some(InventoryError::EmptyInventory));
    }

    #[tokio::test]
    async fn test_success_clears_last_error() {
        let transport = MockTransport::new(vec![
            Err(InventoryError::Transport("reset".to_string())),
            ok(inventory_body("abc")),
        ]);
        let f = fetcher(FetchOptions::default(), transport);

        f.fetch(false).await;
        assert!(f.last_error().await.is_some());
        f.fetch(false).await;
        assert!(f.last_error().await.is_none());
        assert!(f.is_fetched().await);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let transport = MockTransport::slow(ok(inventory_body("abc")));
        let f = Arc::new(fetcher(FetchOptions::default(), transport.clone()));

        let (a, b) = tokio::join!(f.try_fetch(false), f.try_fetch(false));

        assert_eq!(transport.calls().len(), 1);
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| *o == FetchOutcome::Cached);
        assert_eq!(outcomes, vec![FetchOutcome::Fetched, FetchOutcome::Cached]);
    }

    #[tokio::test]
    async fn test_setters() {
        let f = fetcher(FetchOptions::with_highlights(), MockTransport::new(vec![ok(armory_body())]));
        f.fetch(false).await;

        let equipped = CurrentlyEquipped {
            core: Some(ItemId::from("core-1")),
            ..Default::default()
        };
        f.set_currently_equipped(equipped.clone()).await;
        assert_eq!(f.currently_equipped().await, equipped);

        f.set_armory_row(None).await;
        assert!(f.armory_row().await.is_none());

        f.clear_highlight(ArmoryCategory::Visor).await;
        let selection = f.highlight_selection().await.unwrap();
        assert_eq!(selection.get(ArmoryCategory::Visor), None);
        assert_eq!(selection.get(ArmoryCategory::Glove), Some(&ItemId::from("glove-1")));
    }

    #[test]
    fn test_request_url() {
        let f = fetcher(FetchOptions::with_armory(), MockTransport::new(vec![ok(armory_body())]));
        assert_eq!(f.request_url(), format!("{}/spartan?includeArmory=true", BASE));
        assert_eq!(f.identity().payload(), &json!({"id": "abc"}));
    }
}
