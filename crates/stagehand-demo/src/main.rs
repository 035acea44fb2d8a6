use std::fs;
use std::path::Path;

use anyhow::Context as _;

use stagehand_engine::assets::AssetManager;
use stagehand_engine::config::EngineConfig;
use stagehand_engine::input::{ActionCaps, ActionMapper, Key, ModifierRequirement};
use stagehand_engine::logging::{init_logging, LoggingConfig};
use stagehand_engine::stage::{run_stage, Stage, StageConfig};

mod assets;
mod progress;
mod scenes;

const CONFIG_PATH: &str = "stagehand.cfg";
const BINDINGS_PATH: &str = "bindings.txt";
const LOG_PATH: &str = "stagehand.log";
const BLOB_PATH: &str = "demo.blob";

fn main() -> anyhow::Result<()> {
    // The config picks the console level, so it is read before the logger exists.
    let config_text = fs::read_to_string(CONFIG_PATH).ok();
    let (config, problems) = config_text
        .as_deref()
        .map(EngineConfig::parse_collecting)
        .unwrap_or_default();

    init_logging(
        LoggingConfig::default()
            .with_console_level(config.log_level)
            .with_file(LOG_PATH, log::LevelFilter::Debug),
    );
    for problem in problems {
        log::warn!("{problem}");
    }
    if config_text.is_none() {
        log::info!("no {CONFIG_PATH}; writing defaults");
        if let Err(e) = config.save(CONFIG_PATH) {
            log::warn!("{e}");
        }
    }

    let mut assets = AssetManager::new();
    assets.set_missing_policy(config.missing_asset_policy);
    assets::register(&mut assets).context("failed to register demo assets")?;
    if Path::new(BLOB_PATH).exists() {
        assets.mount_blob(BLOB_PATH).context("failed to mount demo blob")?;
    }

    let mut stage = Stage::new(StageConfig::default(), assets);
    configure_actions(stage.actions_mut()).context("failed to declare demo actions")?;
    stage
        .switch_to(Box::new(scenes::SplashScene::default()))
        .context("failed to start the splash scene")?;

    run_stage(&config, "stagehand demo", stage)
}

fn configure_actions(actions: &mut ActionMapper) -> anyhow::Result<()> {
    for name in [scenes::CONFIRM, scenes::BACK, scenes::QUIT] {
        actions.declare_action(name, ActionCaps::BUTTON)?;
    }

    if Path::new(BINDINGS_PATH).exists() {
        match actions.load_bindings(BINDINGS_PATH) {
            Ok(_) => return Ok(()),
            Err(e) => log::warn!("{e}; using default bindings"),
        }
    }

    let defaults = [
        (Key::Enter, scenes::CONFIRM),
        (Key::Space, scenes::CONFIRM),
        (Key::Backspace, scenes::BACK),
        (Key::Escape, scenes::QUIT),
    ];
    for (key, action) in defaults {
        if let Err(e) = actions.add_key_action(key, ModifierRequirement::NONE, action) {
            log::warn!("default binding for {action}: {e}");
        }
    }
    if let Err(e) = actions.save_bindings(BINDINGS_PATH) {
        log::warn!("{e}");
    }
    Ok(())
}
