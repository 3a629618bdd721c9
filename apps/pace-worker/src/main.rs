use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = pace_worker::Args::parse();

	pace_worker::run(args).await
}
