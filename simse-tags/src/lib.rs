pub mod category_index;
pub mod codec;
pub mod config;
pub mod cosine;
pub mod error;
pub mod index;
pub mod item_store;
pub mod protocol;
pub mod query_cache;
pub mod server;
pub mod sparse;
pub mod transport;
pub mod types;
pub mod weights;

pub use codec::{ExportedData, ItemVectors};
pub use config::IndexConfig;
pub use error::TagIndexError;
pub use index::TagIndex;
pub use query_cache::{Filter, QueryOptions};
pub use sparse::SparseVector;
pub use types::{CategoryWeight, IndexStats, IndexTag, Item, MemoryUsage, QueryResult, Tag};
