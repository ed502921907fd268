pub mod debounce;
pub use debounce::Debouncer;

pub mod detail;
pub use detail::{DetailService, DetailStore, DetailView};

pub mod fetch;
pub use fetch::{FetchCoordinator, FetchError, FetchOutcome};

pub mod pagination;
pub use pagination::{AccumulatedResults, PaginationService};

pub mod query_cache;
pub use query_cache::{CacheEntry, QueryCache, QueryStatus};

pub mod search;
pub use search::SearchService;

pub mod search_store;
pub use search_store::{SearchStore, SearchView};
