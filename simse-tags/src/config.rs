use clap::Parser;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Tunables for a [`crate::index::TagIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
	/// Page size used when a query does not specify one.
	pub default_page_size: usize,
	/// Chunk size used by `add_item_batch` when the caller does not pass one.
	pub batch_size: usize,
}

impl Default for IndexConfig {
	fn default() -> Self {
		Self {
			default_page_size: DEFAULT_PAGE_SIZE,
			batch_size: DEFAULT_BATCH_SIZE,
		}
	}
}

impl IndexConfig {
	/// Replace zero sizes with their defaults; both must be positive.
	pub fn normalized(self) -> Self {
		Self {
			default_page_size: if self.default_page_size == 0 {
				DEFAULT_PAGE_SIZE
			} else {
				self.default_page_size
			},
			batch_size: if self.batch_size == 0 {
				DEFAULT_BATCH_SIZE
			} else {
				self.batch_size
			},
		}
	}
}

#[derive(Parser, Debug)]
#[command(name = "simse-tags", about = "Weighted tag index with cosine-similarity queries")]
pub struct CliArgs {
	/// Default page size for queries that do not pass one
	#[arg(long, default_value_t = DEFAULT_PAGE_SIZE, env = "SIMSE_TAGS_PAGE_SIZE")]
	pub page_size: usize,

	/// Chunk size for batch item adds
	#[arg(long, default_value_t = DEFAULT_BATCH_SIZE, env = "SIMSE_TAGS_BATCH_SIZE")]
	pub batch_size: usize,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "SIMSE_TAGS_LOG_LEVEL")]
	pub log_level: String,
}

impl CliArgs {
	pub fn index_config(&self) -> IndexConfig {
		IndexConfig {
			default_page_size: self.page_size,
			batch_size: self.batch_size,
		}
		.normalized()
	}
}
