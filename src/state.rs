use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::db::SqliteStore;
use crate::services::audit::run_audit_log;
use crate::services::events::EventBus;
use crate::services::lifecycle::LifecycleEngine;
use crate::services::messaging::MessagingProvider;
use crate::services::notifications::run_notifier;

pub struct AppState {
    pub store: SqliteStore,
    pub config: AppConfig,
    pub engine: LifecycleEngine,
    pub messaging: Arc<dyn MessagingProvider>,
}

impl AppState {
    /// Wires the engine, event bus and directory onto one SQLite connection.
    pub fn new(conn: Connection, config: AppConfig, messaging: Arc<dyn MessagingProvider>) -> Self {
        let store = SqliteStore::new(Arc::new(Mutex::new(conn)));
        let shared = Arc::new(store.clone());
        let events = EventBus::new(shared.clone(), config.event_channel_capacity);
        let engine = LifecycleEngine::new(
            shared.clone(),
            shared,
            events,
            config.conflict_check_policy,
        );

        Self {
            store,
            config,
            engine,
            messaging,
        }
    }

    pub fn events(&self) -> &EventBus {
        self.engine.events()
    }

    /// Starts the audit and SMS subscribers; each runs until the bus closes.
    pub fn spawn_subscribers(&self) {
        tokio::spawn(run_audit_log(
            Arc::new(self.store.clone()),
            self.events().subscribe(),
        ));
        tokio::spawn(run_notifier(self.messaging.clone(), self.events().subscribe()));
    }
}
