//! Publish command - pushes a model's catalogs to the configured registry

use std::path::PathBuf;

use clap::Args;
use tracing::info;

/// Arguments for the publish command
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Semantic model JSON document
    #[arg(long)]
    pub model: PathBuf,
}

/// Publish the released and draft catalogs of one model
pub async fn run(args: PublishArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    let gateway = crate::create_gateway_with_config(&config).await?;
    let model = crate::read_model_file(&args.model).await?;
    info!(model_id = %model.id(), "Publishing semantic model");

    let catalogs = gateway.register_model(model).await?;
    if catalogs.is_empty() {
        println!("Nothing to publish: the model is not served by the embedded engine");
    }
    for catalog in &catalogs {
        println!("{}", catalog.name);
    }

    Ok(())
}
