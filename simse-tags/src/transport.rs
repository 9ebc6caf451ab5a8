// ---------------------------------------------------------------------------
// NDJSON framing for JSON-RPC responses
// ---------------------------------------------------------------------------
//
// One JSON object per line. Exactly one of `result` / `error` is present.
// Write failures are logged and dropped; the request loop keeps going.
// ---------------------------------------------------------------------------

use std::io::{self, Write};

use serde::Serialize;

#[derive(Serialize)]
struct Envelope {
	jsonrpc: &'static str,
	id: u64,
	#[serde(flatten)]
	outcome: Outcome,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
	Result(serde_json::Value),
	Error(ErrorObject),
}

#[derive(Serialize)]
struct ErrorObject {
	code: i32,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	data: Option<serde_json::Value>,
}

pub struct NdjsonTransport<W: Write = io::Stdout> {
	out: W,
}

impl Default for NdjsonTransport {
	fn default() -> Self {
		Self::new()
	}
}

impl NdjsonTransport {
	/// Transport writing to the process's stdout.
	pub fn new() -> Self {
		Self::with_writer(io::stdout())
	}
}

impl<W: Write> NdjsonTransport<W> {
	pub fn with_writer(out: W) -> Self {
		Self { out }
	}

	pub fn into_inner(self) -> W {
		self.out
	}

	pub fn write_response(&mut self, id: u64, result: serde_json::Value) {
		self.send(id, Outcome::Result(result));
	}

	pub fn write_error(
		&mut self,
		id: u64,
		code: i32,
		message: impl Into<String>,
		data: Option<serde_json::Value>,
	) {
		let error = ErrorObject {
			code,
			message: message.into(),
			data,
		};
		self.send(id, Outcome::Error(error));
	}

	fn send(&mut self, id: u64, outcome: Outcome) {
		let envelope = Envelope {
			jsonrpc: "2.0",
			id,
			outcome,
		};
		if let Err(e) = self.write_line(&envelope) {
			tracing::error!(id, error = %e, "failed to write response");
		}
	}

	fn write_line(&mut self, envelope: &Envelope) -> io::Result<()> {
		let mut line = serde_json::to_vec(envelope)?;
		line.push(b'\n');
		self.out.write_all(&line)?;
		self.out.flush()
	}
}
