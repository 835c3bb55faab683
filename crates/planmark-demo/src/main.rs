//! Replays a scripted placement session against the in-memory substrate and
//! prints the resulting marker records as JSON.
//!
//! Usage: `planmark-demo [--config engine.json] [SYMBOL_DIR]`

use planmark_core::{
    EngineConfig, FileArtworkSource, KeyInput, MarkerCallbacks, MarkerData, MarkerEngine, MarkerId,
    MemorySubstrate, Placement, ShortcutRegistry,
};
use std::path::PathBuf;
use std::process::ExitCode;

struct Options {
    config: Option<PathBuf>,
    symbols: PathBuf,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut config = None;
        let mut symbols = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().ok_or("--config needs a path")?;
                    config = Some(PathBuf::from(path));
                }
                other if other.starts_with("--") => return Err(format!("Unknown option {}", other)),
                other => symbols = Some(PathBuf::from(other)),
            }
        }
        Ok(Self {
            config,
            symbols: symbols
                .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/symbols"))),
        })
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Usage: planmark-demo [--config engine.json] [SYMBOL_DIR]");
            return ExitCode::FAILURE;
        }
    };

    let config = match &options.config {
        Some(path) => match EngineConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load configuration: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    log::info!("Loading symbols from {}", options.symbols.display());
    for shortcut in ShortcutRegistry::all() {
        log::debug!("{:>10}  {}", shortcut.format(), shortcut.description);
    }

    let mut engine = MarkerEngine::new(FileArtworkSource::new(&options.symbols), config);
    engine.set_callbacks(logging_callbacks());
    if !engine.initialize(MemorySubstrate::new()) {
        return ExitCode::FAILURE;
    }

    pollster::block_on(run_session(&mut engine));

    match engine.markers_to_json() {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to serialize markers: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn logging_callbacks() -> MarkerCallbacks {
    MarkerCallbacks {
        on_select: Some(Box::new(|id| log::info!("selected {:?}", id))),
        on_delete: Some(Box::new(|id| log::info!("deleted {}", id))),
        on_rotate: Some(Box::new(|id, degrees| log::info!("rotated {} to {}°", id, degrees))),
        on_move: Some(Box::new(|id, p| log::info!("moved {} to ({:.1}, {:.1})", id, p.x, p.y))),
        on_move_start: Some(Box::new(|id| log::info!("move started for {}", id))),
        on_move_end: Some(Box::new(|id, confirmed| {
            log::info!("move of {} {}", id, if confirmed { "confirmed" } else { "cancelled" })
        })),
    }
}

async fn run_session(engine: &mut MarkerEngine<MemorySubstrate>) {
    let chair = MarkerData::new("CH-01", "Chair")
        .with_artwork_key("chair")
        .with_group("seating")
        .with_label("Chair");
    let placements = vec![
        Placement::new(1000.0, 1000.0, chair.clone()),
        Placement::new(1600.0, 1000.0, chair).with_rotation(90.0),
        Placement::new(
            1300.0,
            2000.0,
            MarkerData::new("TB-01", "Round table")
                .with_artwork_key("table-round")
                .with_group("tables")
                .with_label("Table"),
        ),
        // No artwork on disk: drawn as the fallback circle.
        Placement::new(3000.0, 500.0, MarkerData::new("LP-07", "Floor lamp").with_label("Lamp")),
    ];
    let ids: Vec<MarkerId> = engine
        .add_markers(placements)
        .await
        .into_iter()
        .flatten()
        .collect();
    log::info!("Placed {} markers", ids.len());

    let Some(&first) = ids.first() else {
        return;
    };
    engine.select_marker(Some(first));
    engine.handle_key(KeyInput::new("r")).await;
    engine.handle_key(KeyInput::new("m")).await;
    engine.update_move_preview(1200.0, 1100.0).await;
    engine.confirm_move(1250.0, 1150.0).await;

    engine.hide_symbol_group("tables");
    if let Some(host) = engine.substrate() {
        log::info!("{} primitives displayed with tables hidden", host.primitive_count());
    }
    engine.apply_hidden_groups(Vec::<String>::new());
    engine.handle_camera_settled();
}
