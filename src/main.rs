//! Product Catalog CLI
//!
//! Runs catalog use cases against the REST API, or against a local JSON
//! seed file with `--offline`.
//!
//! ```text
//!   product-catalog [OPTIONS] <COMMAND>
//!
//!   Args ─► CatalogConfig (defaults < YAML < env < flags)
//!            │
//!            ├─ --offline ─► InMemoryProductPort ──┐
//!            └─ ApiClient ─► HttpProductAdapter ───┤
//!                                                  ▼
//!                              [CachingProductPort] ─► Container ─► use case
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use product_catalog::{
    ApiClient, AuthConfig, CacheConfig, CacheHints, CachingProductPort, CatalogConfig,
    Container, HttpProductAdapter, InMemoryProductPort, NewProduct, ProductCollection,
    ProductData, ProductPatch, ProductPort, ProductPortRef, ProductRoutes, UseCase,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Product Catalog - query and maintain the e-commerce product catalog
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, short = 'c', env = "CATALOG_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog API base URL (overrides config and environment)
    #[arg(long)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Maximum retries for failed reads
    #[arg(long)]
    max_retries: Option<u32>,

    /// Bearer token
    #[arg(long)]
    token: Option<String>,

    /// API key, sent in the configured API key header
    #[arg(long)]
    api_key: Option<String>,

    /// Bypass the read cache
    #[arg(long)]
    no_cache: bool,

    /// Serve products from a JSON seed file instead of the API
    #[arg(long, value_name = "SEED_FILE")]
    offline: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Print request performance stats to stderr when done
    #[arg(long)]
    stats: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all products
    List,
    /// Show one product
    Get { id: String },
    /// Free-text search
    Search { query: String },
    /// Products in a category
    Category { category_id: String },
    /// All products, ascending by rank
    Ranked,
    /// All products, best score first
    Scored,
    /// Products at a given rank
    Rank { rank: i64 },
    /// Create a product
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        rank: i64,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        category: String,
        #[arg(long)]
        image_url: String,
        #[arg(long, default_value_t = 0)]
        stock: i64,
    },
    /// Set the stock level of a product
    UpdateStock { id: String, stock: i64 },
    /// Set the price of a product
    UpdatePrice { id: String, price: f64 },
    /// Delete a product
    Delete { id: String },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let config = load_config(&args)?;

    info!("Starting Product Catalog CLI");
    info!("  Version: {}", product_catalog::VERSION);
    info!("  API URL: {}", config.api_url);
    info!("  Offline: {}", args.offline.is_some());
    info!("  Cache: {}", config.cache.enabled && !args.no_cache);

    let cache = (config.cache.enabled && !args.no_cache).then(|| config.cache.clone());

    let (port, client) = match &args.offline {
        Some(seed) => {
            let products = load_seed(seed)?;
            info!("Loaded {} products from {}", products.len(), seed.display());
            (wrap_port(InMemoryProductPort::with_products(products), cache), None)
        }
        None => {
            let client = Arc::new(
                ApiClient::new(config.client_config()).context("failed to build API client")?,
            );
            let adapter = HttpProductAdapter::new(client.clone())
                .with_routes(ProductRoutes::new(config.products_route.clone()))
                .with_retry_reads(config.retry_reads);
            (wrap_port(adapter, cache), Some(client))
        }
    };

    let container = Container::new(port);
    let outcome = run(&container, args.command, args.json).await;

    if args.stats {
        if let Some(client) = &client {
            let stats = client.performance_monitor().stats();
            eprintln!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    outcome
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn", "rustls=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Logs go to stderr so stdout stays clean for command output
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// Config file and environment, then command-line overrides
fn load_config(args: &Args) -> anyhow::Result<CatalogConfig> {
    let mut config = CatalogConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;

    if let Some(url) = &args.api_url {
        config.api_url = url.clone();
    }
    if let Some(timeout) = args.timeout_secs {
        config.timeout_secs = timeout;
    }
    if let Some(max_retries) = args.max_retries {
        config.retry.max_retries = max_retries;
    }
    if let Some(token) = &args.token {
        config.auth = Some(AuthConfig::bearer(token.clone()));
    }
    if let Some(key) = &args.api_key {
        config.auth = Some(AuthConfig::api_key(key.clone()));
    }

    config.validate()?;
    Ok(config)
}

fn load_seed(path: &Path) -> anyhow::Result<Vec<ProductData>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid product seed file {}", path.display()))
}

fn wrap_port<P>(inner: P, cache: Option<CacheConfig>) -> ProductPortRef
where
    P: ProductPort + 'static,
{
    match cache {
        Some(cache) => Arc::new(CachingProductPort::new(inner, CacheHints::new(cache))),
        None => Arc::new(inner),
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn run(container: &Container, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::List => {
            let products = container.get_all_products().execute(()).await?;
            print_collection(&products, json)
        }
        Command::Get { id } => {
            let product = container.get_product_by_id().execute(id).await?;
            print_product(&product.into_data(), json)
        }
        Command::Search { query } => {
            let products = container.search_products().execute(query).await?;
            print_collection(&products, json)
        }
        Command::Category { category_id } => {
            let products = container
                .get_products_by_category()
                .execute(category_id)
                .await?;
            print_collection(&products, json)
        }
        Command::Ranked => {
            let products = container.get_ranked_products().execute(()).await?;
            print_collection(&products, json)
        }
        Command::Scored => {
            let products = container.get_scored_products().execute(()).await?;
            print_collection(&products, json)
        }
        Command::Rank { rank } => {
            let products = container.get_products_by_rank().execute(rank).await?;
            print_collection(&products, json)
        }
        Command::Create {
            name,
            rank,
            description,
            price,
            category,
            image_url,
            stock,
        } => {
            let product = container
                .create_product()
                .execute(NewProduct {
                    name,
                    rank,
                    description,
                    price,
                    category_id: category,
                    image_url,
                    stock,
                })
                .await?;
            print_product(&product.into_data(), json)
        }
        Command::UpdateStock { id, stock } => {
            let product = container
                .update_product_stock()
                .execute((id, stock))
                .await?;
            print_product(&product.into_data(), json)
        }
        Command::UpdatePrice { id, price } => {
            let product = container
                .update_product()
                .execute((id, ProductPatch::price(price)))
                .await?;
            print_product(&product.into_data(), json)
        }
        Command::Delete { id } => {
            container.delete_product().execute(id.clone()).await?;
            if json {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("Deleted {}", id);
            }
            Ok(())
        }
    }
}

// =============================================================================
// Output
// =============================================================================

fn print_collection(products: &ProductCollection, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(products)?);
        return Ok(());
    }

    print_header();
    for product in products {
        print_row(&product.to_data());
    }
    println!("{} product(s)", products.len());
    Ok(())
}

fn print_product(product: &ProductData, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(product)?);
    } else {
        print_header();
        print_row(product);
    }
    Ok(())
}

fn print_header() {
    println!(
        "{:<14} {:<32} {:>5} {:>10} {:>6}  {}",
        "ID", "NAME", "RANK", "PRICE", "STOCK", "CATEGORY"
    );
}

fn print_row(product: &ProductData) {
    println!(
        "{:<14} {:<32} {:>5} {:>10.2} {:>6}  {}",
        product.id,
        truncate(&product.name, 32),
        product.rank,
        product.price,
        product.stock,
        product.category_id
    );
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
