//! Request handlers
//!
//! Mutations are structurally validated here before they reach the
//! registry; rejected requests are logged once and have no side effects.
//! Reads never fail.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::accelerator::{self, KeyEvent, Platform};
use crate::hotkey::{AcceleratorMap, EnabledMap, HotkeyId, HotkeySettings};
use crate::state::{BindingState, HotkeyRegistry, MutationReport};

use super::protocol::{Request, Response};

/// Entry point for every request arriving from a window
pub struct Handlers {
    registry: Arc<HotkeyRegistry>,
    platform: Platform,
}

impl Handlers {
    pub fn new(registry: Arc<HotkeyRegistry>, platform: Platform) -> Self {
        Self { registry, platform }
    }

    /// Dispatch a request.
    ///
    /// `Subscribe` needs the connection and is answered by the server.
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetIndividualSettings => Response::IndividualSettings {
                settings: self.get_individual_settings(),
            },
            Request::SetIndividualSetting { id, enabled } => {
                self.set_individual_setting(&id, &enabled).await
            }
            Request::GetAccelerators => Response::Accelerators {
                accelerators: self.get_accelerators(),
            },
            Request::SetAccelerator { id, accelerator } => {
                self.set_accelerator(&id, &accelerator).await
            }
            Request::GetFullSettings => Response::FullSettings {
                settings: self.get_full_settings(),
            },
            Request::ResetToDefaults { id } => self.reset_to_defaults(&id).await,
            Request::GetBindingStates => Response::BindingStates {
                states: self.get_binding_states().await,
            },
            Request::ValidateAccelerator { accelerator } => {
                self.validate_accelerator(&accelerator)
            }
            Request::DisplayAccelerator {
                accelerator,
                platform,
            } => Response::Display {
                text: self.display_accelerator(&accelerator, platform.as_deref()),
            },
            Request::AcceleratorFromKeyEvent { event } => self.accelerator_from_key_event(&event),
            Request::Ping => Response::Pong,
            Request::Subscribe { .. } => Response::Error {
                code: "unsupported".to_string(),
                message: "subscribe is handled by the connection".to_string(),
            },
        }
    }

    pub fn get_individual_settings(&self) -> EnabledMap {
        self.read().enabled_map()
    }

    pub fn get_accelerators(&self) -> AcceleratorMap {
        self.read().accelerator_map()
    }

    pub fn get_full_settings(&self) -> HotkeySettings {
        self.read()
    }

    pub async fn get_binding_states(&self) -> BTreeMap<HotkeyId, BindingState> {
        let mut states = BTreeMap::new();
        for id in HotkeyId::ALL {
            states.insert(id, self.registry.binding_state(id).await);
        }
        states
    }

    pub async fn set_individual_setting(&self, id: &str, enabled: &Value) -> Response {
        let Some(hotkey) = HotkeyId::parse(id) else {
            return reject("setIndividualSetting", id, "unknown hotkey id");
        };
        let Value::Bool(enabled) = *enabled else {
            return reject("setIndividualSetting", id, "enabled must be a boolean");
        };

        accepted(self.registry.set_enabled(hotkey, enabled).await)
    }

    pub async fn set_accelerator(&self, id: &str, accelerator: &Value) -> Response {
        let Some(hotkey) = HotkeyId::parse(id) else {
            return reject("setAccelerator", id, "unknown hotkey id");
        };
        let Value::String(accelerator) = accelerator else {
            return reject("setAccelerator", id, "accelerator must be a string");
        };
        if let Err(e) = accelerator::check(accelerator) {
            return reject("setAccelerator", id, &e.to_string());
        }

        match self.registry.set_accelerator(hotkey, accelerator).await {
            Ok(report) => accepted(report),
            Err(e) => reject("setAccelerator", id, &e.to_string()),
        }
    }

    pub async fn reset_to_defaults(&self, id: &str) -> Response {
        let Some(hotkey) = HotkeyId::parse(id) else {
            return reject("resetToDefaults", id, "unknown hotkey id");
        };
        accepted(self.registry.reset_to_defaults(hotkey).await)
    }

    pub fn validate_accelerator(&self, raw: &str) -> Response {
        let parsed = accelerator::parse(raw);
        let reason = accelerator::check(raw).err().map(|e| e.to_string());
        Response::Validation {
            valid: reason.is_none(),
            normalized: accelerator::normalize(raw),
            modifiers: parsed.modifiers,
            key: parsed.key,
            reason,
        }
    }

    pub fn display_accelerator(&self, raw: &str, platform: Option<&str>) -> String {
        let platform = platform.map(Platform::from_name).unwrap_or(self.platform);
        accelerator::to_display_string(raw, platform)
    }

    pub fn accelerator_from_key_event(&self, event: &KeyEvent) -> Response {
        let accelerator = accelerator::from_key_event(event);
        let valid = accelerator::validate(&accelerator);
        debug!(%accelerator, valid, "key event converted");
        Response::Accelerator { accelerator, valid }
    }

    fn read(&self) -> HotkeySettings {
        match self.registry.snapshot() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(%e, "settings unavailable; answering with defaults");
                HotkeySettings::default()
            }
        }
    }
}

fn accepted(report: MutationReport) -> Response {
    let windows: usize = report.deliveries.iter().map(|d| d.delivered).sum();
    debug!(
        id = %report.id,
        persisted = report.persisted,
        binding = %report.binding,
        windows,
        "mutation applied"
    );
    Response::Accepted {
        persisted: report.persisted,
        binding: report.binding,
        windows,
    }
}

fn reject(operation: &str, id: &str, reason: &str) -> Response {
    let shown: String = id.chars().take(64).collect();
    warn!(operation, id = %shown, reason, "request rejected");
    Response::Rejected {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use serde_json::json;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    use crate::events::Notification;
    use crate::hotkey::testing::RecordingBinder;
    use crate::store::MemoryStore;
    use crate::sync::{ChannelSink, DeliveryError, SyncHub, WindowSink};

    /// Counts WARN events seen on the current thread
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    struct Fixture {
        handlers: Handlers,
        store: Arc<MemoryStore>,
        binder: Arc<RecordingBinder>,
        hub: Arc<SyncHub>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let binder = Arc::new(RecordingBinder::default());
        let hub = Arc::new(SyncHub::new());
        let registry = HotkeyRegistry::load(store.clone(), binder.clone(), hub.clone()).await;
        binder.clear();
        Fixture {
            handlers: Handlers::new(Arc::new(registry), Platform::MacOs),
            store,
            binder,
            hub,
        }
    }

    #[test]
    fn test_invalid_id_single_warning_no_effects() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber =
            tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));

        tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(async {
                let f = fixture().await;
                let (_, mut rx) = f.hub.subscribe_channel("main");
                let before = warnings.load(Ordering::SeqCst);

                let response = f
                    .handlers
                    .set_individual_setting("invalidId", &json!(true))
                    .await;

                assert!(matches!(response, Response::Rejected { .. }));
                assert_eq!(warnings.load(Ordering::SeqCst) - before, 1);
                assert!(f.store.snapshot().is_empty());
                assert!(f.binder.calls().is_empty());
                assert!(rx.try_recv().is_err());
            });
        });
    }

    #[tokio::test]
    async fn test_non_boolean_rejected() {
        let f = fixture().await;
        for value in [json!("true"), json!(1), Value::Null, json!({"enabled": true})] {
            let response = f.handlers.set_individual_setting("bossKey", &value).await;
            assert!(matches!(response, Response::Rejected { .. }));
        }
        assert!(f.store.snapshot().is_empty());
        assert!(f.binder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_accelerators_rejected() {
        let f = fixture().await;
        for value in [json!(""), json!("T"), json!("Shift"), json!(42), json!("x".repeat(10_000))] {
            let response = f.handlers.set_accelerator("bossKey", &value).await;
            assert!(matches!(response, Response::Rejected { .. }), "{:?}", value);
        }
        let response = f.handlers.set_accelerator("nope", &json!("Alt+Shift+B")).await;
        assert!(matches!(response, Response::Rejected { .. }));
        assert!(f.store.snapshot().is_empty());
        assert_eq!(f.handlers.get_full_settings(), HotkeySettings::default());
    }

    #[tokio::test]
    async fn test_set_accelerator_scenario() {
        let f = fixture().await;
        let (_, mut rx) = f.hub.subscribe_channel("main");

        let response = f.handlers.handle(Request::SetAccelerator {
            id: "bossKey".to_string(),
            accelerator: json!("Alt+Shift+B"),
        })
        .await;
        assert_eq!(
            response,
            Response::Accepted {
                persisted: true,
                binding: BindingState::EnabledBound,
                windows: 1
            }
        );
        assert_eq!(f.store.snapshot()["acceleratorBossKey"], json!("Alt+Shift+B"));
        assert_eq!(f.binder.active(HotkeyId::BossKey).as_deref(), Some("Alt+Shift+B"));

        let notification = rx.try_recv().unwrap();
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["accelerators"]["bossKey"], "Alt+Shift+B");

        assert_eq!(f.handlers.get_accelerators()[&HotkeyId::BossKey], "Alt+Shift+B");
    }

    #[tokio::test]
    async fn test_full_settings_from_empty_store() {
        let f = fixture().await;
        let response = f.handlers.handle(Request::GetFullSettings).await;
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["settings"]["alwaysOnTop"]["accelerator"], "CommandOrControl+Alt+P");
        assert_eq!(json["settings"]["bossKey"]["accelerator"], "CommandOrControl+Alt+H");
        assert_eq!(json["settings"]["quickChat"]["accelerator"], "CommandOrControl+Shift+Space");
        assert_eq!(json["settings"]["printToPdf"]["accelerator"], "CommandOrControl+Shift+P");
        for id in HotkeyId::ALL {
            assert_eq!(json["settings"][id.as_str()]["enabled"], true);
        }
    }

    /// Window whose destroyed flag is driven by the test
    struct DoomedWindow {
        destroyed: Arc<AtomicBool>,
        invoked: Arc<AtomicUsize>,
    }

    impl WindowSink for DoomedWindow {
        fn label(&self) -> &str {
            "doomed"
        }

        fn is_destroyed(&self) -> bool {
            self.destroyed.load(Ordering::SeqCst)
        }

        fn deliver(&self, _notification: &Notification) -> Result<(), DeliveryError> {
            self.invoked.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Live window that closes another window while receiving
    struct ClosingWindow {
        inner: ChannelSink,
        closes: Arc<AtomicBool>,
    }

    impl WindowSink for ClosingWindow {
        fn label(&self) -> &str {
            self.inner.label()
        }

        fn is_destroyed(&self) -> bool {
            self.inner.is_destroyed()
        }

        fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
            self.closes.store(true, Ordering::SeqCst);
            self.inner.deliver(notification)
        }
    }

    #[tokio::test]
    async fn test_window_destroyed_mid_broadcast() {
        let f = fixture().await;
        let destroyed = Arc::new(AtomicBool::new(false));
        let invoked = Arc::new(AtomicUsize::new(0));
        let (tx, mut live) = tokio::sync::mpsc::unbounded_channel();

        // Subscribed first, so it is delivered to before the doomed window
        f.hub.subscribe(Box::new(ClosingWindow {
            inner: ChannelSink::new("live", tx),
            closes: Arc::clone(&destroyed),
        }));
        f.hub.subscribe(Box::new(DoomedWindow {
            destroyed: Arc::clone(&destroyed),
            invoked: Arc::clone(&invoked),
        }));

        let response = f
            .handlers
            .set_individual_setting("printToPdf", &json!(false))
            .await;

        assert!(matches!(response, Response::Accepted { windows: 1, .. }));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        match live.try_recv().unwrap() {
            Notification::IndividualSettingsChanged { settings } => {
                assert!(!settings[&HotkeyId::PrintToPdf]);
            }
            other => panic!("unexpected notification: {}", other),
        }
        assert_eq!(f.hub.window_count(), 1);
    }

    #[tokio::test]
    async fn test_helpers() {
        let f = fixture().await;
        assert_eq!(
            f.handlers.display_accelerator("CommandOrControl+Shift+T", None),
            "Cmd+Shift+T"
        );
        assert_eq!(
            f.handlers.display_accelerator("CommandOrControl+Shift+T", Some("win32")),
            "Ctrl+Shift+T"
        );

        match f.handlers.validate_accelerator("shift+ctrl+t") {
            Response::Validation {
                valid,
                normalized,
                key,
                ..
            } => {
                assert!(valid);
                assert_eq!(normalized, "CommandOrControl+Shift+T");
                assert_eq!(key.as_deref(), Some("t"));
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let event = KeyEvent {
            key: "b".to_string(),
            code: "KeyB".to_string(),
            alt_key: true,
            shift_key: true,
            ..Default::default()
        };
        assert_eq!(
            f.handlers.accelerator_from_key_event(&event),
            Response::Accelerator {
                accelerator: "Alt+Shift+B".to_string(),
                valid: true
            }
        );

        let states = f.handlers.get_binding_states().await;
        assert!(states.values().all(|s| *s == BindingState::EnabledBound));
    }

    #[tokio::test]
    async fn test_reset_rejects_unknown_id() {
        let f = fixture().await;
        let response = f.handlers.reset_to_defaults("everything").await;
        assert!(matches!(response, Response::Rejected { .. }));
        assert!(f.binder.calls().is_empty());
    }
}
