use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = flora_api::Args::parse();
	flora_api::run(args).await
}
