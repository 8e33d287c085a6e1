use crate::worker::{SearchJob, SearchWorker};
use lo_catalog::ItemQuery;
use lo_control::OptimizerState;
use lo_core::{Catalog, OwnedItem};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Parameters and inventory the next search runs against.
pub struct Session {
    pub inventory: Arc<Vec<OwnedItem>>,
    pub controller: OptimizerState,
}

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    pub worker: SearchWorker,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>, inventory: Vec<OwnedItem>, debounce: Duration) -> Self {
        AppState {
            session: Arc::new(Mutex::new(Session {
                inventory: Arc::new(inventory),
                controller: OptimizerState::new(),
            })),
            worker: SearchWorker::new(catalog, debounce),
        }
    }

    /// Submits a search for the current session. Fails only on an
    /// unparseable item query.
    pub fn resubmit(&self) -> anyhow::Result<u64> {
        let job = {
            let session = self.session.lock();
            SearchJob {
                inventory: Arc::clone(&session.inventory),
                request: session.controller.request(),
                query: ItemQuery::parse(session.controller.query())?,
            }
        };
        Ok(self.worker.submit(job))
    }
}
