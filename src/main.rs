use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cart::{
    client::HttpClient,
    config::AppConfig,
    dto::auth::LoginRequest,
    identity::IdentityResolver,
    models::{LineId, ProductId},
    storage::FileStorage,
    store::{CartState, CartStore, OrderHistoryStore, SessionStore},
};

#[derive(Debug, Parser)]
#[command(name = "storefront-cart", about = "Storefront cart session CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch and show the current cart
    Cart,
    /// Add a product to the cart
    Add { product_id: i64, quantity: u32 },
    /// Change the quantity of a cart line; zero removes it
    Update { line_id: i64, quantity: i64 },
    /// Remove a cart line
    Remove { line_id: i64 },
    /// Empty the cart
    Clear,
    /// Sign in, merging any guest cart
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD")]
        password: String,
    },
    /// Sign out and discard the local cart
    Logout,
    /// Place an order for the whole cart
    Checkout {
        #[arg(long)]
        payment_method: String,
    },
    /// List past orders
    Orders,
    /// Show the guest identifier, creating it when missing
    GuestId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_cart=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let storage = Arc::new(FileStorage::open(&config.storage_path)?);
    let identity = IdentityResolver::new(storage);
    let client = Arc::new(HttpClient::from_config(&config)?);

    let session = SessionStore::hydrate(client.clone(), identity.clone());
    let cart = CartStore::new(client.clone(), identity.clone());

    match cli.command.unwrap_or(Command::Cart) {
        Command::Cart => {
            cart.fetch().await?;
        }
        Command::Add {
            product_id,
            quantity,
        } => {
            cart.fetch().await?;
            cart.add_item(ProductId(product_id), quantity).await?;
        }
        Command::Update { line_id, quantity } => {
            cart.fetch().await?;
            cart.update_item(LineId(line_id), quantity).await?;
        }
        Command::Remove { line_id } => {
            cart.fetch().await?;
            cart.remove_item(LineId(line_id)).await?;
        }
        Command::Clear => {
            cart.clear().await?;
        }
        Command::Login { email, password } => {
            let principal = session
                .login(LoginRequest { email, password }, &cart)
                .await?;
            tracing::info!(email = %principal.email, role = ?principal.role, "signed in");
        }
        Command::Logout => {
            session.sign_out(&cart).await;
            return Ok(());
        }
        Command::Checkout { payment_method } => {
            anyhow::ensure!(session.is_authenticated(), "sign in before checking out");
            cart.fetch().await?;
            anyhow::ensure!(!cart.snapshot().is_empty(), "the cart is empty");
            let receipt = cart.checkout(&payment_method).await?;
            tracing::info!(receipt = %receipt, "order confirmed");
            return Ok(());
        }
        Command::Orders => {
            let history = OrderHistoryStore::new(client, identity);
            for order in history.fetch().await? {
                tracing::info!(order = %order, "order");
            }
            return Ok(());
        }
        Command::GuestId => {
            tracing::info!(guest_id = %identity.guest().get_or_create(), "guest identifier");
            return Ok(());
        }
    }

    report(&cart.snapshot());
    Ok(())
}

fn report(state: &CartState) {
    for line in &state.lines {
        tracing::info!(
            line_id = ?line.id,
            product_id = %line.product_id,
            name = line.display_name(),
            quantity = line.quantity,
            total = %line.line_total(),
            "cart line"
        );
    }
    tracing::info!(
        items = state.item_count(),
        subtotal = %state.subtotal(),
        status = ?state.status,
        "cart summary"
    );
}
