//! The session context handed to every stage run.

use std::path::Path;
use std::sync::Arc;

use hirepipe_client::ApiClient;
use hirepipe_shared::{ApiSettings, Result, SessionName};
use hirepipe_storage::StageStore;
use tracing::info;

/// Everything a stage needs beyond its own inputs: the session's stage store
/// and the backend client.
///
/// Stages never reach for process-wide state; the context is passed in
/// explicitly and is cheap to share behind an [`Arc`].
pub struct SessionContext {
    store: StageStore,
    client: ApiClient,
}

impl SessionContext {
    pub fn new(store: StageStore, client: ApiClient) -> Self {
        Self { store, client }
    }

    /// Open the store at `db_path` for `session` and build a client from `settings`.
    pub async fn open(
        db_path: &Path,
        session: SessionName,
        settings: &ApiSettings,
    ) -> Result<Arc<Self>> {
        let store = StageStore::open(db_path, session).await?;
        let client = ApiClient::new(settings)?;
        info!(
            session = %store.session(),
            base_url = %client.base_url(),
            db = %db_path.display(),
            "session opened"
        );
        Ok(Arc::new(Self::new(store, client)))
    }

    pub fn store(&self) -> &StageStore {
        &self.store
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &SessionName {
        self.store.session()
    }
}
