use clap::Parser;

use simse_tags::config::CliArgs;
use simse_tags::server::TagServer;
use simse_tags::transport::NdjsonTransport;

fn main() {
	let args = CliArgs::parse();

	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let transport = NdjsonTransport::new();
	let mut server = TagServer::new(transport, args.index_config());

	tracing::info!("simse-tags ready");

	if let Err(e) = server.run() {
		tracing::error!("Server error: {}", e);
		std::process::exit(1);
	}
}
