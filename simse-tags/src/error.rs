use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagIndexError {
	#[error("Invalid import: {0}")]
	InvalidImport(String),
	#[error("Invalid params: {0}")]
	InvalidParams(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl TagIndexError {
	pub fn code(&self) -> &str {
		match self {
			Self::InvalidImport(_) => "TAGS_INVALID_IMPORT",
			Self::InvalidParams(_) => "TAGS_INVALID_PARAMS",
			Self::Serialization(_) => "TAGS_SERIALIZATION",
			Self::Io(_) => "TAGS_IO",
		}
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"tagsCode": self.code(),
			"message": self.to_string(),
		})
	}
}

impl From<serde_json::Error> for TagIndexError {
	fn from(e: serde_json::Error) -> Self {
		Self::Serialization(e.to_string())
	}
}
