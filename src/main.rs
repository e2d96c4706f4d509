//! Eleos Liquidation Bot
//!
//! Pages through every borrower known to the lending pool subgraph, simulates
//! `accountLiquidity` for each position and liquidates undercollateralized
//! accounts through the router, one transaction at a time.
//!
//! Exits with status 0 once the subgraph has no more borrowers, non-zero when
//! a page query fails for good.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liquidator_api::SubgraphClient;
use liquidator_chain::{ChainClient, EvmChainClient, ProviderManager, TransactionSenderBuilder};
use liquidator_core::{BotConfig, ControllerConfig, Deployment, Liquidator, PaginationController};

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,liquidator_core=debug,liquidator_chain=debug")
            }),
        )
        .init();

    // BOT_PROFILE selects testing, production or a TOML file
    let bot_config = BotConfig::from_env()?;
    bot_config.log_config();

    let deployment = Deployment::from_env()?;
    info!(
        router = %deployment.router,
        factory = ?deployment.factory,
        subgraph = %deployment.subgraph_url,
        "Deployment loaded"
    );

    let mut controller = initialize_components(&deployment, &bot_config).await?;

    info!("Starting liquidation run...");
    let summary = controller.run().await?;

    info!(
        pages = summary.pages,
        positions_evaluated = summary.positions_evaluated,
        evaluation_failures = summary.evaluation_failures,
        liquidations = summary.liquidations,
        skipped = summary.skipped,
        execution_failures = summary.execution_failures,
        "Run finished"
    );

    Ok(())
}

async fn initialize_components(
    deployment: &Deployment,
    bot_config: &BotConfig,
) -> Result<PaginationController<SubgraphClient, EvmChainClient>> {
    info!("Initializing components...");

    let provider = ProviderManager::new(&deployment.rpc_url).await?;
    let chain_id = provider.chain_id().await?;
    info!(chain_id = chain_id, "Provider initialized");

    let sender = TransactionSenderBuilder::new(deployment.rpc_url.as_str())
        .chain_id(chain_id)
        .poll_interval(bot_config.execution.receipt_poll_interval())
        .receipt_timeout(bot_config.execution.receipt_timeout())
        .build(&deployment.private_key)
        .await?;

    let chain = Arc::new(EvmChainClient::new(provider, sender));
    let signer = chain.signer_address();
    let receiver = deployment.admin.unwrap_or(signer);
    info!(signer = %signer, receiver = %receiver, "Signer ready");

    let liquidator = Liquidator::new(chain.clone(), deployment.router, receiver)
        .with_config(&bot_config.execution);

    let source = SubgraphClient::new(deployment.subgraph_url.as_str())
        .with_page_size(bot_config.paging.page_size);

    Ok(PaginationController::new(
        source,
        chain,
        liquidator,
        ControllerConfig::from(bot_config),
    ))
}

fn print_banner() {
    println!(
        r#"
    ╔═╗┬  ┌─┐┌─┐┌─┐
    ║╣ │  ├┤ │ │└─┐
    ╚═╝┴─┘└─┘└─┘└─┘
    Liquidation Bot v0.1.0
    "#
    );
}
