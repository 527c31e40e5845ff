//! Nhamaew Pet Store command-line client.
//!
//! Browses the catalogue, shows the cart and order history, and manages the
//! signed-in LINE session against the pet store backend.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nhamaew_core::messaging::share;
use nhamaew_core::models::{subtotal, total_savings, LineProfile, Product, ProductSearch, ProductSort, ReviewSummary};
use nhamaew_core::navigation::{CategoryNavigator, LoadState, SearchScope, Selection};
use nhamaew_core::storefront::keys;
use nhamaew_core::utils::{age_display, format_baht, format_date, format_rating, truncate};
use nhamaew_core::{CheckoutError, Config, Storefront};

const USAGE: &str = "\
Usage: nhamaew <command> [args]

Commands:
  categories <animal>                     Browse the category tree (cat, dog, ...)
  search [keyword] [--category ID] [--sort BSP|LP|ASC|DESC] [--pages N]
  product <id>                            Product details and review summary
  share <id>                              Print the LINE share message for a product
  cart                                    Items in your cart
  checkout                                Send your cart to the shop as an order
  orders                                  Order history
  login <lineUserId> [displayName]        Start a session
  logout                                  End the session";

/// Log file name prefix in the cache directory
const LOG_FILE: &str = "nhamaew.log";

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
/// When `log_dir` is given, logs are also written to a daily rolling file.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load()?;
    let log_dir = config.cache_dir().ok().filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let _log_guard = init_tracing(log_dir.as_deref());
    info!(api = %config.api_base_url, "Nhamaew starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    let store = Storefront::from_config(&config)?;

    match command.as_str() {
        "categories" => browse_categories(&store, rest).await,
        "search" => search(&store, rest).await,
        "product" => show_product(&store, rest).await,
        "share" => share_product(&store, rest, &config).await,
        "cart" => show_cart(&store).await,
        "checkout" => checkout(&store).await,
        "orders" => show_orders(&store).await,
        "login" => login(&store, rest, &mut config).await,
        "logout" => logout(&store).await,
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn require_arg<'a>(args: &'a [String], name: &str) -> Result<&'a str> {
    args.first()
        .map(String::as_str)
        .with_context(|| format!("Missing <{}>\n\n{}", name, USAGE))
}

fn print_product_line(index: usize, product: &Product) {
    let price = product.price.as_deref().unwrap_or("0");
    let mut line = format!("{:>3}. {}  ฿{}", index, truncate(product.display_name(), 48), price);
    if product.is_discounted() {
        if let Some(original) = &product.original_price {
            line.push_str(&format!(" (was ฿{})", original));
        }
    }
    if let Some(sold) = product.sold.as_deref().filter(|s| !s.is_empty()) {
        line.push_str(&format!("  sold {}", sold));
    }
    println!("{}", line);
}

async fn print_last_updated(store: &Storefront, operation: &str) {
    if let Some(at) = store.last_updated(operation).await {
        println!("(updated {})", age_display(at, Utc::now()));
    }
}

// ===== Catalogue =====

/// Interactive drill-down over stdin.
async fn browse_categories(store: &Storefront, args: &[String]) -> Result<()> {
    let animal = require_arg(args, "animal")?;
    let mut nav = CategoryNavigator::new();

    let session = nav.begin_loading();
    let loaded = store.categories(animal).await.map(Option::unwrap_or_default);
    nav.finish_loading(session, loaded);

    match nav.load_state() {
        Some(LoadState::Failed(message)) => bail!("Failed to load categories: {}", message),
        Some(LoadState::Empty) => {
            println!("No categories for {}", animal);
            return Ok(());
        }
        _ => {}
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!();
        if nav.can_go_back() {
            println!("< {}", nav.previous_level_name(Some(animal)));
        }
        println!("== {} ==", nav.current_level_name(Some(animal)));
        for (i, category) in nav.selectable().iter().enumerate() {
            let marker = if category.is_leaf() { "" } else { " >" };
            println!("{:>3}. {}{}", i + 1, category.display_name(), marker);
        }
        print!("[number] select, [a] view all, [b] back, [q] quit: ");
        io::stdout().flush()?;

        let Some(input) = lines.next().transpose()? else {
            break;
        };
        let scope = match input.trim() {
            "q" => break,
            "b" => {
                if !nav.go_back() {
                    println!("Already at the top level");
                }
                continue;
            }
            "a" => match nav.view_all() {
                Some(scope) => scope,
                None => {
                    println!("Nothing to show");
                    continue;
                }
            },
            choice => match choice.parse::<usize>() {
                Ok(n) if n >= 1 => match nav.select_index(n - 1) {
                    Selection::Search(scope) => scope,
                    Selection::Drilled { .. } => continue,
                    Selection::Ignored => {
                        println!("No such category");
                        continue;
                    }
                },
                _ => {
                    println!("Unrecognised input: {}", choice);
                    continue;
                }
            },
        };

        nav.close();
        return search_scope(store, scope).await;
    }
    nav.close();
    Ok(())
}

async fn search_scope(store: &Storefront, scope: SearchScope) -> Result<()> {
    let page = store.search_products(&ProductSearch::in_category(scope.category_id)).await?;
    println!("\n{} products in category {}", page.total_elements, scope.category_id);
    for (i, product) in page.content.iter().enumerate() {
        print_product_line(i + 1, product);
    }
    Ok(())
}

/// Parse `search` arguments into the search and the number of pages to
/// fetch. Words outside flags form the keyword.
fn parse_search_args(args: &[String]) -> Result<(ProductSearch, u32)> {
    let mut search = ProductSearch::default();
    let mut pages = 1u32;
    let mut words = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--category" => {
                let id = iter.next().context("--category needs an id")?;
                search.product_category_id = Some(id.parse().with_context(|| format!("Bad category id: {}", id))?);
            }
            "--sort" => {
                let code = iter.next().context("--sort needs a code")?;
                let sort = ProductSort::from_code(code).with_context(|| format!("Unknown sort: {}", code))?;
                search = search.sorted_by(sort);
            }
            "--pages" => {
                let n = iter.next().context("--pages needs a number")?;
                pages = n.parse().with_context(|| format!("Bad page count: {}", n))?;
            }
            flag if flag.starts_with("--") => bail!("Unknown search option: {}\n\n{}", flag, USAGE),
            word => words.push(word.trim()),
        }
    }
    search.keyword = words.into_iter().filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ");
    Ok((search, pages.max(1)))
}

async fn search(store: &Storefront, args: &[String]) -> Result<()> {
    let (search, pages) = parse_search_args(args)?;

    let feed = store.product_feed(search.clone());
    feed.fetch_up_to(pages).await?;

    let total = feed.total_elements().unwrap_or(0);
    println!("{} results, sorted by {}", total, search.sort_direction.label());
    for (i, product) in feed.items().iter().enumerate() {
        print_product_line(i + 1, product);
    }
    if feed.has_next_page() {
        println!("... more available (--pages {})", feed.pages_fetched() + 1);
    }
    Ok(())
}

async fn show_product(store: &Storefront, args: &[String]) -> Result<()> {
    let product_id = require_arg(args, "id")?;
    let detail = store.product_detail(product_id).await?;

    println!("{}", detail.product_name);
    println!("Price: ฿{}", detail.price.as_deref().unwrap_or("0"));
    if let Some(original) = detail.original_price.as_deref().filter(|p| !p.is_empty()) {
        println!("Original price: ฿{}", original);
    }
    if detail.is_favorite {
        println!("In your favourites");
    }
    for variant in detail.available_variants() {
        let price = variant.price.unwrap_or(variant.discount_price);
        println!("  - {} {}", variant.product_item_name, format_baht(price));
    }
    if let Some(details) = detail.product_details.as_deref() {
        println!("\n{}", truncate(details, 400));
    }

    let reviews = store.product_reviews(product_id, 0, 10).await?;
    let summary = ReviewSummary::from_reviews(&reviews.content);
    println!(
        "\nRating {} from {} reviews",
        format_rating(summary.average_rating),
        reviews.total_elements
    );
    for stars in (1..=5).rev() {
        println!("  {}★ {}", stars, summary.count_for(stars));
    }
    Ok(())
}

async fn share_product(store: &Storefront, args: &[String], config: &Config) -> Result<()> {
    let product_id = require_arg(args, "id")?;
    let detail = store.product_detail(product_id).await?;
    let message = share::product_message(&detail, &config.share_base_url());
    println!("{}", serde_json::to_string_pretty(&message)?);
    Ok(())
}

// ===== Cart & orders =====

async fn show_cart(store: &Storefront) -> Result<()> {
    let Some(items) = store.cart_items().await? else {
        println!("Not signed in. Run `nhamaew login <lineUserId>` first.");
        return Ok(());
    };
    if items.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }

    for item in &items {
        println!("{} x{}  {}", item.product_name, item.quantity, format_baht(item.line_total()));
        if let Some(option) = item.option_line() {
            println!("    {}", option);
        }
    }
    println!("Subtotal: {}", format_baht(subtotal(&items)));
    print_last_updated(store, keys::CART_ITEMS).await;
    let savings = total_savings(&items);
    if savings > 0.0 {
        println!("You save {}", format_baht(savings));
    }

    match store.shipping_address().await? {
        Some(address) if !address.is_empty() => {
            println!("\nShip to:");
            for line in address.lines() {
                println!("  {}", line);
            }
        }
        _ => println!("\nNo shipping address saved"),
    }
    Ok(())
}

async fn checkout(store: &Storefront) -> Result<()> {
    match store.checkout().await {
        Ok(response) => {
            match response.order_id {
                Some(id) => println!("Order {} sent to the shop", id),
                None => println!("Order sent to the shop"),
            }
            Ok(())
        }
        Err(CheckoutError::Cache(e)) => Err(anyhow::Error::new(e).context("Failed to create order")),
        Err(e) => {
            println!("{}", e);
            Ok(())
        }
    }
}

async fn show_orders(store: &Storefront) -> Result<()> {
    let Some(orders) = store.order_history().await? else {
        println!("Not signed in. Run `nhamaew login <lineUserId>` first.");
        return Ok(());
    };
    if orders.is_empty() {
        println!("No orders yet");
    }
    print_last_updated(store, keys::ORDER_HISTORY).await;
    for order in &orders {
        println!(
            "{}  {}  {}  {} items  {}",
            order.order_code,
            format_date(&order.transaction_date),
            order.status,
            order.item_count(),
            format_baht(order.total())
        );
        for item in &order.order_item_list {
            let label = item.variant_label();
            if label.is_empty() {
                println!("    {} x{}", item.product_name, item.quantity);
            } else {
                println!("    {} ({}) x{}", item.product_name, label, item.quantity);
            }
        }
    }
    Ok(())
}

// ===== Session =====

async fn login(store: &Storefront, args: &[String], config: &mut Config) -> Result<()> {
    let line_user_id = require_arg(args, "lineUserId")?;
    let display_name = args.get(1).cloned().unwrap_or_else(|| line_user_id.to_string());
    let profile = LineProfile {
        user_id: line_user_id.to_string(),
        display_name,
        ..LineProfile::default()
    };

    let session = store.sign_in(&profile, None).await?;
    config.last_line_user_id = Some(session.line_user_id.clone());
    config.save()?;

    println!("Signed in as {}", session.display_name);
    if !session.profile_updated {
        println!("(profile could not be registered with the shop; it will be retried next sign-in)");
    }
    Ok(())
}

async fn logout(store: &Storefront) -> Result<()> {
    store.sign_out().await?;
    println!("Signed out");
    Ok(())
}
