use crate::config::FeedConfig;
use crate::feed::ChangeFeed;
use crate::store::HomeStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<ChangeFeed>,
    pub homes: Arc<HomeStore>,
}

impl AppState {
    pub fn new(feed: ChangeFeed, homes: HomeStore) -> Self {
        Self {
            feed: Arc::new(feed),
            homes: Arc::new(homes),
        }
    }

    /// Empty feed with the given sizing, seeded with the demo home.
    pub fn with_demo_home(config: FeedConfig) -> Self {
        Self::new(ChangeFeed::new(config), HomeStore::with_demo_home())
    }
}
