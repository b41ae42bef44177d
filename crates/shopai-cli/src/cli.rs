//! CLI definition and command dispatch for shopai.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to the engine.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--config`, `--device`)
//! 2. Environment variables (`SHOPAI_CONFIG`, `SHOPAI_DEVICE`, `SHOPAI_COLOR`)
//! 3. Config file (`~/.shopai/config.yaml` or path from `--config`/`SHOPAI_CONFIG`)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::ui::{color, format, table, ColorMode, MessageType, Progress, ProgressMode, Style};

use shopai_core::{
    CartRecommendation, Catalog, Category, ComposedBy, DevicePreference, GlobalConfig, Intent,
    RecommendOptions, Recommendation, ShopEngine, ShopError, ShopResult, StatusReport,
};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Shopping assistant – product recommendations from free-text queries
#[derive(Parser, Debug)]
#[command(name = "shopai")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "SHOPAI_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress spinners
    #[arg(short, long, global = true, env = "SHOPAI_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.shopai/config.yaml)
    #[arg(long, global = true, env = "SHOPAI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device preference for model inference (auto/gpu/cpu)
    #[arg(long, global = true, env = "SHOPAI_DEVICE")]
    pub device: Option<String>,

    /// Color output mode
    #[arg(long, global = true, env = "SHOPAI_COLOR", value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recommend products for a free-text shopping query
    #[command(after_help = r#"EXAMPLES:
    # Ask for a recommendation
    shopai ask "推荐一些耳机"

    # Template reply only, even when a generator is configured
    shopai ask "想买本小说" --no-generate

    # Show pipeline counts and stage timings
    shopai ask "跑步装备" --explain

    # Full result as JSON
    shopai ask "办公椅" --json | jq '.products[].product.product_id'
"#)]
    Ask {
        /// The shopping query
        query: String,

        /// Skip the generator and use the template reply
        #[arg(long)]
        no_generate: bool,

        /// Show pipeline counts and stage timings
        #[arg(long)]
        explain: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Recommend products that go with a shopping cart
    #[command(after_help = r#"EXAMPLES:
    # Suggestions for a cart (cart items are never suggested back)
    shopai cart SPORTS001 ELEC002

    # Empty cart: popular products
    shopai cart
"#)]
    Cart {
        /// Product ids in the cart
        ids: Vec<String>,

        /// Skip the generator and use the template reply
        #[arg(long)]
        no_generate: bool,

        /// Show pipeline counts and stage timings
        #[arg(long)]
        explain: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List catalog products
    #[command(after_help = r#"EXAMPLES:
    # Whole catalog
    shopai products

    # One category (catalog name or english alias)
    shopai products --category 书籍
    shopai products --category books
"#)]
    Products {
        /// Restrict to one category
        #[arg(long)]
        category: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Embed the catalog and write the vector index
    #[command(after_help = r#"EXAMPLES:
    # (Re)build after changing the catalog or the embedding model
    shopai build-index
"#)]
    BuildIndex {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show catalog, index and model readiness
    #[command(after_help = r#"EXAMPLES:
    shopai status
    shopai status --json | jq '.index'
"#)]
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate or display configuration
    #[command(after_help = r#"EXAMPLES:
    # Validate configuration
    shopai config check

    # Show resolved configuration
    shopai config show --json
"#)]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings
    Check {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved configuration
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    fn json(&self) -> bool {
        match self {
            Command::Ask { json, .. }
            | Command::Cart { json, .. }
            | Command::Products { json, .. }
            | Command::BuildIndex { json }
            | Command::Status { json } => *json,
            Command::Config { action } => match action {
                ConfigAction::Check { json } | ConfigAction::Show { json } => *json,
            },
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse arguments, run one command, and map the outcome to an exit code.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always, debug with --verbose. Logs go to stderr so --json
    // output stays parseable.
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "shopai_core={lvl},shopai_model={lvl},shopai_db={lvl},shopai_cli={lvl}",
        lvl = log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let style = Style::new(cli.color);
    let progress_mode = ProgressMode::detect(cli.quiet, cli.command.json());

    let device = match cli.device.as_deref().map(str::parse::<DevicePreference>) {
        None => None,
        Some(Ok(device)) => Some(device),
        Some(Err(message)) => {
            eprintln!(
                "{}",
                style.error_with_context(&message, None, Some("Valid options: auto, gpu, cpu"))
            );
            return ExitCode::FAILURE;
        }
    };

    // `config` reports on broken files instead of refusing to start.
    if let Command::Config { action } = cli.command {
        return finish(&style, handle_config(&style, cli.config.as_deref(), device, action));
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => match device {
            Some(device) => config.with_device(device),
            None => config,
        },
        Err(e) => {
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to load configuration",
                    Some(&e.to_string()),
                    Some(&config_hint(cli.config.as_deref())),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    // Status must work even when the catalog does not load.
    if let Command::Status { json } = cli.command {
        return finish(&style, handle_status(&style, &config, json));
    }

    let engine = match ShopEngine::from_config(config) {
        Ok(engine) => engine,
        Err(e) => {
            let hint = e
                .hint()
                .map(str::to_string)
                .unwrap_or_else(|| config_hint(cli.config.as_deref()));
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize shopai engine",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(
        "Loaded {} products from {}",
        engine.catalog().len(),
        engine.config().data.catalog_path().display()
    );

    let result = match cli.command {
        Command::Ask {
            query,
            no_generate,
            explain,
            json,
        } => handle_ask(
            &style,
            &engine,
            &query,
            options(no_generate),
            explain || cli.verbose,
            json,
            progress_mode,
        ),
        Command::Cart {
            ids,
            no_generate,
            explain,
            json,
        } => handle_cart(
            &style,
            &engine,
            &ids,
            options(no_generate),
            explain || cli.verbose,
            json,
            progress_mode,
        ),
        Command::Products { category, json } => {
            handle_products(&style, &engine, category.as_deref(), json)
        }
        Command::BuildIndex { json } => handle_build_index(&style, &engine, json, progress_mode),
        Command::Status { .. } | Command::Config { .. } => Ok(()),
    };

    finish(&style, result)
}

fn finish(style: &Style, result: ShopResult<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.error_with_context(&e.to_string(), None, e.hint()));
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> ShopResult<GlobalConfig> {
    match path {
        Some(path) => GlobalConfig::from_path(path),
        None => GlobalConfig::load_default(),
    }
}

fn config_hint(path: Option<&Path>) -> String {
    match path {
        Some(path) => format!("Check your config at {}", path.display()),
        None => "Check your config at ~/.shopai/config.yaml".to_string(),
    }
}

fn options(no_generate: bool) -> RecommendOptions {
    if no_generate {
        RecommendOptions::default().without_generation()
    } else {
        RecommendOptions::default()
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_ask(
    style: &Style,
    engine: &ShopEngine,
    query: &str,
    options: RecommendOptions,
    explain: bool,
    json: bool,
    mode: ProgressMode,
) -> ShopResult<()> {
    let progress = Progress::spinner("Loading models...", mode);
    let recommendation = engine.recommender().and_then(|recommender| {
        progress.set_message("Finding products...");
        recommender.recommend_with(query, &options)
    });
    progress.finish_clear();
    let recommendation = recommendation?;

    if json {
        print_json(&recommendation);
    } else {
        print_recommendation(style, engine.catalog(), &recommendation, explain);
    }
    Ok(())
}

fn handle_cart(
    style: &Style,
    engine: &ShopEngine,
    ids: &[String],
    options: RecommendOptions,
    explain: bool,
    json: bool,
    mode: ProgressMode,
) -> ShopResult<()> {
    let progress = Progress::spinner("Looking at your cart...", mode);
    let outcome = engine.cart(ids, options);
    progress.finish_clear();
    let outcome = outcome?;

    if json {
        print_json(&outcome);
        return Ok(());
    }

    match &outcome {
        CartRecommendation::Popular { products } => {
            println!(
                "{}",
                style.message(MessageType::Info, "Cart is empty, showing popular products")
            );
            println!();
            println!("{}", table::render_products_table(products, color::terminal_width()));
        }
        CartRecommendation::Recommended {
            query,
            recommendation,
        } => {
            println!("  {}", style.key_value("Cart query", query));
            print_recommendation(style, engine.catalog(), recommendation, explain);
        }
    }
    Ok(())
}

fn handle_products(
    style: &Style,
    engine: &ShopEngine,
    category: Option<&str>,
    json: bool,
) -> ShopResult<()> {
    let category = category.map(str::parse::<Category>).transpose()?;
    let products = engine.products(category);

    if json {
        print_json(&products);
        return Ok(());
    }

    if products.is_empty() {
        println!("{}", style.message(MessageType::Info, "No products found."));
        return Ok(());
    }

    println!("{}", style.section("PRODUCTS"));
    println!();
    println!("{}", table::render_products_table(&products, color::terminal_width()));
    println!();
    println!(
        "{}",
        style.message(MessageType::Info, &format!("{} product(s)", products.len()))
    );
    Ok(())
}

fn handle_build_index(
    style: &Style,
    engine: &ShopEngine,
    json: bool,
    mode: ProgressMode,
) -> ShopResult<()> {
    let progress = Progress::spinner(
        &format!("Embedding {} products...", engine.catalog().len()),
        mode,
    );
    let report = engine.build_index();
    let elapsed = progress.elapsed();
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            progress.finish_clear();
            return Err(e);
        }
    };

    if json {
        progress.finish_clear();
        print_json(&report);
        return Ok(());
    }

    progress.finish_with_message(&style.message(
        MessageType::Ok,
        &format!("Indexed {} products", report.count),
    ));
    println!("{}", style.message_detail("Model", &report.model_id));
    println!("{}", style.message_detail("Dimension", &report.dimension.to_string()));
    println!("{}", style.message_detail("Path", &report.path.display().to_string()));
    println!("{}", style.message_detail("Took", &format::format_duration(elapsed)));
    Ok(())
}

fn handle_status(style: &Style, config: &GlobalConfig, json: bool) -> ShopResult<()> {
    let report = StatusReport::collect(config);

    if json {
        print_json(&report);
        return Ok(());
    }

    println!("{}", style.section("STATUS"));
    println!();
    println!("{}", table::render_status_table(&report));
    println!();

    let problems = report.problems();
    if !problems.is_empty() {
        println!(
            "{}",
            style.message(MessageType::Warn, &format!("{} problem(s):", problems.len()))
        );
        for problem in &problems {
            println!("{}", style.bullet(problem));
        }
        println!();
    }

    if report.is_ready() {
        println!("{}", style.message(MessageType::Ok, "Ready to recommend"));
    } else {
        println!("{}", style.message(MessageType::Err, "Not ready to recommend"));
        println!(
            "{}",
            style.message(MessageType::Hint, "Fix the problems above, then run `shopai status` again")
        );
    }
    Ok(())
}

fn handle_config(
    style: &Style,
    path: Option<&Path>,
    device: Option<DevicePreference>,
    action: ConfigAction,
) -> ShopResult<()> {
    match action {
        ConfigAction::Check { json } => handle_config_check(style, path, json),
        ConfigAction::Show { json } => handle_config_show(style, path, device, json),
    }
}

/// Validate the configuration file and report errors/warnings.
fn handle_config_check(style: &Style, path: Option<&Path>, json: bool) -> ShopResult<()> {
    let path: Option<PathBuf> = path.map(Path::to_path_buf).or_else(GlobalConfig::default_path);
    let exists = path.as_ref().is_some_and(|p| p.exists());

    let (warnings, errors) = match load_config(path.as_deref()) {
        Ok(config) => match config.validate() {
            Ok(warnings) => (warnings, Vec::new()),
            Err(e) => (Vec::new(), vec![e.to_string()]),
        },
        Err(e) => (Vec::new(), vec![e.to_string()]),
    };

    if json {
        print_json(&serde_json::json!({
            "path": path,
            "exists": exists,
            "valid": errors.is_empty(),
            "warnings": warnings,
            "errors": errors,
        }));
    } else {
        let shown = path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<no home directory>".to_string());
        let state = if exists { "" } else { " (not found, using defaults)" };
        println!(
            "{}",
            style.message(MessageType::Info, &format!("Checked {}{}", shown, state))
        );
        println!();

        if !warnings.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Warn, &format!("{} warning(s):", warnings.len()))
            );
            for warning in &warnings {
                println!("{}", style.bullet(warning));
            }
            println!();
        }

        if !errors.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Err, &format!("{} error(s):", errors.len()))
            );
            for error in &errors {
                println!("{}", style.bullet(error));
            }
            println!();
        }

        if errors.is_empty() && warnings.is_empty() {
            println!("{}", style.message(MessageType::Ok, "Configuration is valid"));
        } else if errors.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Ok, "Configuration is valid with warnings")
            );
        }
    }

    if !errors.is_empty() {
        return Err(ShopError::invalid_configuration(
            format!("{} configuration error(s) found", errors.len()),
            "Fix the reported keys and run `shopai config check` again",
        ));
    }
    Ok(())
}

/// Show resolved configuration, including defaults and the device override.
fn handle_config_show(
    style: &Style,
    path: Option<&Path>,
    device: Option<DevicePreference>,
    json: bool,
) -> ShopResult<()> {
    let mut config = load_config(path)?;
    if let Some(device) = device {
        config = config.with_device(device);
    }

    if !json {
        println!("{}", style.message(MessageType::Info, "Resolved configuration:"));
        println!();
    }
    print_json(&config);
    Ok(())
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_recommendation(
    style: &Style,
    catalog: &Catalog,
    recommendation: &Recommendation,
    explain: bool,
) {
    println!("{}", style.section("QUERY"));
    println!();
    println!("  {}", style.key_value("Query", &recommendation.query));
    println!("  {}", style.key_value("Intent", &recommendation.intent.to_string()));
    if let Some(category) = recommendation.category {
        println!("  {}", style.key_value("Category", category.as_str()));
    }
    println!();

    println!("{}", style.section("REPLY"));
    println!();
    for line in recommendation.response.lines() {
        println!("  {}", line);
    }
    println!();

    if recommendation.intent == Intent::Greeting {
        return;
    }

    let debug = &recommendation.debug;
    if debug.embedding_degraded {
        println!(
            "{}",
            style.message(
                MessageType::Warn,
                "Embedding search unavailable, ranked keyword matches only"
            )
        );
    }
    if debug.relevance_degraded {
        println!(
            "{}",
            style.message(MessageType::Warn, "Reranker unavailable, relevance scores are zero")
        );
    }
    if debug.generator_degraded {
        println!(
            "{}",
            style.message(MessageType::Warn, "Generator failed, used the template reply")
        );
    }

    if !recommendation.products.is_empty() {
        println!("{}", style.section("PRODUCTS"));
        println!();
        println!("{}", table::render_ranked_table(&recommendation.products));
        if recommendation.composed_by == ComposedBy::Generator {
            let mentioned: Vec<String> = recommendation
                .recommended_products(catalog)
                .iter()
                .map(|p| p.name.clone())
                .collect();
            if !mentioned.is_empty() {
                println!();
                println!("  {}", style.key_value("Mentioned in reply", &mentioned.join(", ")));
            }
        }
        println!();
    } else if !recommendation.last_matched.is_empty() {
        println!(
            "{}",
            style.message(MessageType::Info, "Nothing passed the relevance checks. Closest matches:")
        );
        println!();
        println!(
            "{}",
            table::render_products_table(&recommendation.last_matched, color::terminal_width())
        );
        println!();
    }

    if explain {
        print_details(style, recommendation);
    }
}

fn print_details(style: &Style, recommendation: &Recommendation) {
    let debug = &recommendation.debug;
    let timings = &debug.timings;

    println!("{}", style.section("DETAILS"));
    println!();
    println!("  {}", style.key_value("Request", &recommendation.request_id.to_string()));
    println!("  {}", style.key_value("Expansions", &recommendation.expansions.join(" | ")));
    let pass = debug
        .keyword_pass
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {}",
        style.key_value(
            "Keyword matches",
            &format!("{} ({})", debug.keyword_matches, pass)
        )
    );
    let retrieved = if debug.retrieval_skipped {
        "skipped".to_string()
    } else {
        debug.retrieved.to_string()
    };
    println!("  {}", style.key_value("Retrieved", &retrieved));
    println!(
        "  {}",
        style.key_value(
            "Funnel",
            &format!(
                "merged {} → filtered {} → rescored {} → reranked {}",
                debug.merged, debug.filtered, debug.rescored, debug.reranked
            )
        )
    );
    println!("  {}", style.key_value("Reply", &recommendation.composed_by.to_string()));
    println!(
        "  {}",
        style.key_value(
            "Timing",
            &format!(
                "keyword {}ms, retrieval {}ms, filter {}ms, rerank {}ms, compose {}ms, total {}ms",
                timings.keyword_ms,
                timings.retrieval_ms,
                timings.filter_ms,
                timings.rerank_ms,
                timings.compose_ms,
                timings.total_ms
            )
        )
    );
    println!();
}
