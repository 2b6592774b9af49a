use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dotenv::dotenv;

use nutrilens::config::AppConfig;
use nutrilens::nutrition::{FoodCompositionIndex, NutritionResolver};
use nutrilens::pipeline::PipelineOrchestrator;
use nutrilens::providers::gemini::GeminiClient;
use nutrilens::service::AnalysisService;
use nutrilens::storage::{MealRecordStore, MealStatus, SqliteMealStore};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Meal nutrition estimation from a single photo",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a meal photo and store the result
    Analyze {
        image: PathBuf,

        /// MIME type of the image; inferred from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
    },
    /// Resolve one ingredient name against the reference datasets
    Lookup {
        name: String,

        /// Quantity in grams
        #[arg(default_value_t = 100)]
        grams: u32,
    },
}

fn mime_from_extension(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

fn build_resolver(config: &AppConfig) -> Result<Arc<NutritionResolver>> {
    let mut index = FoodCompositionIndex::new();
    index
        .load_from_paths(&config.ifct_csv_path, &config.anuvaad_csv_path)
        .context("failed to load reference datasets")?;
    Ok(Arc::new(NutritionResolver::new(Arc::new(index))))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    match args.command {
        Command::Lookup { name, grams } => {
            let resolver = build_resolver(&config)?;
            let nutrition = resolver.resolve(&name, grams);
            println!("{} ({}g):", name.bold(), grams);
            println!("{}", serde_json::to_string_pretty(&nutrition)?);
        }
        Command::Analyze { image, mime } => {
            let mime_type = mime.unwrap_or_else(|| mime_from_extension(&image).to_string());
            let file_name = image
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("meal-image")
                .to_string();
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("failed to read image {}", image.display()))?;

            let api_key = config
                .gemini_api_key
                .clone()
                .context("GEMINI_API_KEY environment variable not set")?;
            let client = GeminiClient::new(api_key, config.gemini_model.clone());

            let resolver = build_resolver(&config)?;
            let orchestrator = Arc::new(
                PipelineOrchestrator::new(Box::new(client), resolver)
                    .with_dish_concurrency(config.max_concurrent_dishes)
                    .with_stage_timeout(Duration::from_secs(config.stage_timeout_secs)),
            );

            let store: Arc<dyn MealRecordStore> =
                Arc::new(SqliteMealStore::new(&config.meal_db_path).await?);
            let service = AnalysisService::new(store, orchestrator);

            println!("{}", "Analyzing meal image...".cyan());
            let record = service.analyze_and_store(bytes, &mime_type, &file_name).await?;

            match record.status {
                MealStatus::Analyzed => {
                    println!("{} (record {})", "Analysis complete".green().bold(), record.id);
                    if let Some(foods) = &record.detected_foods {
                        println!("{}", serde_json::to_string_pretty(foods)?);
                    }
                    if let Some(summary) = &record.nutrition_summary {
                        println!("{}", "Meal totals:".bold());
                        println!("{}", serde_json::to_string_pretty(summary)?);
                    }
                }
                MealStatus::Failed => {
                    let message = record
                        .error_message
                        .unwrap_or_else(|| "unknown error".to_string());
                    eprintln!("{} {}", "Analysis failed:".red().bold(), message);
                    return Err(anyhow!(message));
                }
                other => {
                    eprintln!("Unexpected terminal status: {}", other.as_str());
                }
            }
        }
    }

    Ok(())
}
