//! Model Run Lifecycle Example
//!
//! Creates a run, drives it through the state machine, attaches a result
//! file and lists the experiment's runs.
//!
//! Run with: cargo run --example model_run_lifecycle
//! Set `RUST_LOG=modelrun_db=debug` for store-level events.

use anyhow::Context;
use modelrun_db::attribute::{ArgumentDefinitions, Attribute};
use modelrun_db::logging::init_logging;
use modelrun_db::modelrun::{AttachmentKind, RunState, ScheduleEvent};
use modelrun_db::{Config, Database, StoreBackend};

fn main() -> anyhow::Result<()> {
    init_logging("modelrun_db=info");
    println!("=== modelrun-db Lifecycle ===\n");

    let workspace = tempfile::tempdir()?;
    let config = Config {
        base_directory: workspace.path().join("runs"),
        backend: StoreBackend::Directory {
            path: workspace.path().join("db"),
        },
    };
    let db = Database::open(&config).context("opening database")?;
    let runs = db.model_runs();

    // -------------------------------------------------------------------------
    // 1. Create a run with validated arguments
    // -------------------------------------------------------------------------
    println!("1. Creating model run...");

    let definitions = ArgumentDefinitions::with_defaults();
    let run = runs.create(
        "V1 Gabor simulation",
        "exp-retinotopy-001",
        "model-v1-001",
        &definitions,
        &[
            Attribute::new("normalized_pixels_per_degree", 15.2),
            Attribute::new("gabor_orientations", 12),
        ],
        None,
    )?;
    let run_id = run.identifier().to_string();

    println!("   Run ID: {run_id}");
    println!("   State: {}", run.state());
    for argument in run.arguments().values() {
        println!("   Argument {} = {}", argument.name, argument.value);
    }

    // Rejected requests leave nothing behind
    let rejected = runs.create(
        "bad",
        "exp-retinotopy-001",
        "model-v1-001",
        &definitions,
        &[Attribute::new("gabor_orientations", 0.45)],
        None,
    );
    println!("   Rejected: {}", rejected.err().map(|e| e.to_string()).unwrap_or_default());

    // -------------------------------------------------------------------------
    // 2. Execute
    // -------------------------------------------------------------------------
    println!("\n2. Running...");

    runs.start(&run_id)?;
    let illegal = runs.update_state(&run_id, RunState::Idle);
    println!("   Back to IDLE: {}", illegal.err().map(|e| e.to_string()).unwrap_or_default());

    let run = runs
        .succeed(&run_id, "prediction-7f3a")?
        .context("run vanished")?;
    println!("   State: {}", run.state());
    println!("   Started: {:?}", run.scheduled(ScheduleEvent::Started));
    println!("   Finished: {:?}", run.scheduled(ScheduleEvent::Finished));

    // -------------------------------------------------------------------------
    // 3. Attach results
    // -------------------------------------------------------------------------
    println!("\n3. Attaching results...");

    let result = workspace.path().join("response.csv");
    std::fs::write(&result, "x,y,response\n0,0,0.82\n")?;
    runs.attach(&run_id, "responses", &result, AttachmentKind::DataFile)?;

    let path = runs
        .get_attachment(&run_id, "responses")?
        .context("attachment missing")?;
    println!("   Stored at: {}", path.display());

    let escape = runs.attach(&run_id, "../../etc", &result, AttachmentKind::DataFile);
    println!("   Escape attempt: {}", escape.err().map(|e| e.to_string()).unwrap_or_default());

    // -------------------------------------------------------------------------
    // 4. List and serialize
    // -------------------------------------------------------------------------
    println!("\n4. Listing experiment runs...");

    let listing = runs.list_for_experiment("exp-retinotopy-001", None, 0)?;
    println!("   Total: {}", listing.total_count);
    for run in &listing.items {
        println!("   - {} [{}]", run.name().unwrap_or("?"), run.state());
    }

    let run = runs.get(&run_id)?.context("run vanished")?;
    println!(
        "\n   Wire format:\n{}",
        serde_json::to_string_pretty(&runs.to_wire_format(&run)?)?
    );

    db.close();
    println!("\n=== Done ===");
    Ok(())
}
