use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use slot_finder::config::SlotFinderConfig;
use slot_finder::demo::generate_seed;
use slot_finder::display::{print_report, write_report_to_file};
use slot_finder::store::{InMemoryStore, ScheduleStore};
use slot_finder::{find_placements, web, PlacementRequest};

const DEMO_SEED: u64 = 2024;

/// Load a store from a JSON seed file, or generate the demo roster
fn load_store(seed_path: Option<&String>) -> anyhow::Result<InMemoryStore> {
    match seed_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read seed file {}", path))?;
            InMemoryStore::from_json_str(&json).with_context(|| format!("Invalid seed file {}", path))
        }
        None => {
            info!("No seed file given, using generated demo roster");
            Ok(InMemoryStore::from_seed(generate_seed(DEMO_SEED))?)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut config = SlotFinderConfig::load()?;
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("web") => {
            if let Some(port) = args.get(2).and_then(|p| p.parse::<u16>().ok()) {
                config.server.port = port;
            }
            let store = load_store(args.get(3))?;
            println!("Access the API at http://localhost:{}/health", config.server.port);
            web::start_server(Arc::new(store), config).await?;
        }
        Some("find") => {
            let student_id: u32 = args
                .get(2)
                .context("usage: slot-finder find <student_id> [seed.json]")?
                .parse()
                .context("student_id must be a number")?;
            let store = load_store(args.get(3))?;
            let term_id = store
                .active_term()
                .await?
                .context("the roster has no active term")?;

            let request = PlacementRequest::new(student_id, term_id)
                .with_max_results(config.search.max_results)
                .with_displacements(config.search.include_displacements);
            let report = find_placements(&store, &request, &config).await?;

            let name = store
                .get_student(student_id)
                .await?
                .map(|s| s.full_name())
                .unwrap_or_else(|| format!("student {}", student_id));
            print_report(&name, &report);

            let filename = format!("placements_{}.txt", student_id);
            write_report_to_file(&name, &report, &filename)?;
            println!("\nPlacements saved to {}", filename);
        }
        Some("demo") => {
            let seed = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(DEMO_SEED);
            let filename = args.get(3).cloned().unwrap_or_else(|| "demo_seed.json".to_string());
            let roster = generate_seed(seed);
            std::fs::write(&filename, serde_json::to_string_pretty(&roster)?)
                .with_context(|| format!("Failed to write {}", filename))?;
            println!(
                "Wrote {} students and {} groups to {}",
                roster.students.len(),
                roster.groups.len(),
                filename
            );
        }
        _ => {
            println!("usage:");
            println!("  slot-finder web [port] [seed.json]");
            println!("  slot-finder find <student_id> [seed.json]");
            println!("  slot-finder demo [seed] [out.json]");
        }
    }

    Ok(())
}
