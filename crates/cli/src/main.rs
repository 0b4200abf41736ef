use anyhow::{Context, Result};
use catalog::{Course, InMemoryCatalog};
use clap::{Parser, Subcommand};
use colored::Colorize;
use pipeline::PromptBuilder;
use server::{
    QuotaTracker, ReconcileOrder, RecommendationEngine, RecommendationRequest,
    RecommendationResult, ServerConfig,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// course-recs - AI course recommendations from the command line
#[derive(Parser)]
#[command(name = "course-recs")]
#[command(about = "Recommend catalog courses for a learning goal", long_about = None)]
struct Cli {
    /// Path to the JSON seed catalog
    #[arg(short, long, default_value = "data/catalog.json", global = true)]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the model for recommendations (uses OPENAI_* settings from the environment)
    Recommend {
        /// Career goal or learning interest
        #[arg(long)]
        prompt: String,

        /// Number of courses the model is asked to pick (at least 1)
        #[arg(long)]
        count: Option<NonZeroUsize>,

        /// Order of matched courses: catalog or mention
        #[arg(long)]
        order: Option<ReconcileOrder>,
    },

    /// Search for courses by title
    Search {
        /// Title to search for (case-insensitive substring match)
        #[arg(long)]
        title: String,
    },

    /// Print the system instruction that would be sent, without calling the model
    Prompt {
        /// Career goal or learning interest
        #[arg(long)]
        prompt: String,

        /// Number of courses the model is asked to pick (at least 1)
        #[arg(long)]
        count: Option<NonZeroUsize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let start = Instant::now();
    let catalog = InMemoryCatalog::load_from_file(&cli.catalog)
        .with_context(|| format!("Failed to load catalog from {}", cli.catalog.display()))?;
    println!(
        "{} Loaded {} courses in {:?}",
        "✓".green(),
        catalog.len(),
        start.elapsed()
    );

    match cli.command {
        Commands::Recommend {
            prompt,
            count,
            order,
        } => handle_recommend(catalog, prompt, count, order).await?,
        Commands::Search { title } => handle_search(&catalog, &title),
        Commands::Prompt { prompt, count } => handle_prompt(&catalog, &prompt, count),
    }

    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(
    catalog: InMemoryCatalog,
    prompt: String,
    count: Option<NonZeroUsize>,
    order: Option<ReconcileOrder>,
) -> Result<()> {
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    let model = config.model_client()?;

    let count = count.map_or(config.recommendation_count, NonZeroUsize::get);
    let order = order.unwrap_or(config.reconcile_order);
    debug!("Requesting {count} courses, {order} order");

    let engine = RecommendationEngine::new(
        Arc::new(catalog),
        Arc::new(model),
        Arc::new(QuotaTracker::new(config.max_requests)),
    )
    .with_prompt_builder(PromptBuilder::new().with_recommendation_count(count))
    .with_reconciler(order.reconciler())
    .with_settings(config.model);

    let start = Instant::now();
    let result = engine.recommend(&RecommendationRequest::new(prompt)).await?;

    print_result(&result);
    println!("{}", format!("Answered in {:?}", start.elapsed()).dimmed());
    Ok(())
}

/// Handle the 'search' command
fn handle_search(catalog: &InMemoryCatalog, title: &str) {
    let matches = catalog.search_by_title(title);

    println!("{}", format!("Search results for '{title}':").bold().blue());
    if matches.is_empty() {
        println!("  (no courses found)");
    }
    for course in matches.iter().take(20) {
        print_course(course);
    }
}

/// Handle the 'prompt' command
fn handle_prompt(catalog: &InMemoryCatalog, prompt: &str, count: Option<NonZeroUsize>) {
    let builder = match count {
        Some(count) => PromptBuilder::new().with_recommendation_count(count.get()),
        None => PromptBuilder::new(),
    };
    let pair = builder.build(catalog.courses(), prompt);

    println!("{}", "System instruction:".bold().blue());
    println!("{}\n", pair.system_instruction);
    println!("{}", "Student prompt:".bold().blue());
    println!("{}", pair.user_prompt);
}

fn print_result(result: &RecommendationResult) {
    println!("{}", "Advisor response:".bold().blue());
    println!("{}\n", result.narrative);

    println!("{}", "Matched courses:".bold().blue());
    if result.matched_courses.is_empty() {
        println!("  (none of the mentioned titles are in the catalog)");
    }
    for (rank, course) in result.matched_courses.iter().enumerate() {
        print!("{}. ", (rank + 1).to_string().green());
        print_course(course);
    }

    println!(
        "\n{} {}/{} requests used, {} remaining",
        "•".cyan(),
        result.quota.used,
        result.quota.limit,
        result.quota.remaining
    );
}

fn print_course(course: &Course) {
    println!(
        "{} [{}] {} - {}",
        course.title.bold(),
        course.level,
        course.category_or_default(),
        course.instructor.full_name
    );
}
