use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::{Path, PathBuf};

use scene_engine::foundation::logging;
use scene_engine::prelude::*;

const BINARY_EXTENSION: &str = "bin";

#[derive(Debug, PartialEq, Eq)]
enum SceneFormat {
    Document,
    Binary,
}

fn format_of(path: &Path) -> Result<SceneFormat> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some(BINARY_EXTENSION) => Ok(SceneFormat::Binary),
        Some("ron" | "json") => Ok(SceneFormat::Document),
        _ => bail!("Unsupported scene file: {}", path.display()),
    }
}

fn log_entity(scene: &Scene, entity: &Entity, depth: usize) {
    let types: Vec<&str> = entity.components().iter().map(Component::type_name).collect();
    log::info!("{:indent$}{entity} [{}]", "", types.join(", "), indent = depth * 2);
    for child in entity.children() {
        if let Some(child) = scene.entity(*child) {
            log_entity(scene, child, depth + 1);
        }
    }
}

fn main() -> Result<()> {
    let matches = Command::new("scene_tool")
        .about("Loads a scene file, prints its entity tree and optionally converts it")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Scene file to load (.ron, .json or .bin)")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the loaded scene to this file (.ron, .json or .bin)"),
        )
        .arg(
            Arg::new("temporary")
                .long("temporary")
                .help("Include temporary entities when saving")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("local")
                .long("local")
                .help("Include local entities when saving")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level")
                .default_value("info"),
        )
        .get_matches();

    let level = matches.get_one::<String>("log-level").map_or("info", String::as_str);
    logging::init_with_level(logging::parse_level(level).context("Invalid log level")?);

    let input = matches
        .get_one::<String>("input")
        .map(PathBuf::from)
        .context("Missing input file")?;
    let mut scene = Scene::new("scene_tool", SceneConfig::default());

    let created = match format_of(&input)? {
        SceneFormat::Binary => scene.load_scene_binary(&input, true, true, AttributeChange::Disconnected),
        SceneFormat::Document => scene.load_scene_document(&input, true, true, AttributeChange::Disconnected),
    }
    .with_context(|| format!("Failed to load {}", input.display()))?;

    log::info!("Loaded {} entities from {}", created.len(), input.display());
    for entity in scene.root_level_entities() {
        log_entity(&scene, entity, 0);
    }

    if let Some(output) = matches.get_one::<String>("output").map(PathBuf::from) {
        let save_temporary = matches.get_flag("temporary");
        let save_local = matches.get_flag("local");
        match format_of(&output)? {
            SceneFormat::Binary => scene.save_scene_binary(&output, save_temporary, save_local),
            SceneFormat::Document => scene.save_scene_document(&output, save_temporary, save_local),
        }
        .with_context(|| format!("Failed to save {}", output.display()))?;
        log::info!("Saved scene to {}", output.display());
    }

    Ok(())
}
