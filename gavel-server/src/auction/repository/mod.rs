use {
    super::entities,
    gavel_api_types::{
        auction::AuctionId,
        UserId,
    },
    std::collections::{
        HashMap,
        HashSet,
    },
    tokio::sync::{
        Mutex,
        RwLock,
    },
};

mod add_auction;
mod add_notification;
mod add_watcher;
mod advance_auction_status;
mod append_bid;
mod claim_ending_alert;
mod get_auction;
mod get_auctions;
mod get_or_create_auction_lock;
mod get_recent_bids;
mod is_watching;
mod list_due_auctions;
mod list_watchers;
mod mark_winning_bid;
mod models;
mod recount_watchers;
mod remove_watcher;

pub use models::*;

pub const AUCTION_PAGE_SIZE_CAP: i64 = 100;

#[derive(Debug)]
pub struct InMemoryStore {
    /// Cached watcher sets, loaded lazily per auction and kept write-through.
    pub watchers:      RwLock<HashMap<AuctionId, HashSet<UserId>>>,
    pub auction_locks: Mutex<HashMap<AuctionId, entities::AuctionLock>>,
}

impl InMemoryStore {
    fn new() -> Self {
        Self {
            watchers:      RwLock::new(HashMap::new()),
            auction_locks: Mutex::new(HashMap::new()),
        }
    }
}

#[derive(Debug)]
pub struct Repository {
    pub db:          Box<dyn Database>,
    in_memory_store: InMemoryStore,
}

impl Repository {
    pub fn new(db: impl Database) -> Self {
        Self {
            db:              Box::new(db),
            in_memory_store: InMemoryStore::new(),
        }
    }
}
