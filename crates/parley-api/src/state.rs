use std::sync::Arc;
use std::time::Duration;

use parley_core::{AccountEvents, Inbox, MutationPipeline, ThreadAssembler, ThreadCache};
use parley_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub pipeline: Arc<MutationPipeline>,
    pub threads: ThreadAssembler,
    pub inbox: Inbox,
    pub cache: ThreadCache,
    pub cache_ttl: Duration,
    pub accounts: AccountEvents,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, jwt_secret: String, cache_ttl: Duration) -> Self {
        Self {
            pipeline: Arc::new(MutationPipeline::new(db.clone())),
            threads: ThreadAssembler::new(db.clone()),
            inbox: Inbox::new(db),
            cache: ThreadCache::new(),
            cache_ttl,
            accounts: AccountEvents::new(),
            jwt_secret,
        }
    }
}
