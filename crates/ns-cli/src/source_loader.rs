use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ns_core::NarrativeError;
use walkdir::WalkDir;

use crate::{map_cli_source_path, map_cli_source_read, map_cli_source_scan, LoadedScenario};

const SCENARIO_REF_PREFIX: &str = "scripts:";
const SCRIPT_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

pub(crate) fn load_source_by_scripts_path(
    scripts: &str,
    entry_scene: &str,
) -> Result<LoadedScenario, NarrativeError> {
    let scripts_root = resolve_scripts_path(scripts)?;
    let sources = if scripts_root.is_dir() {
        read_sources_from_dir(&scripts_root)?
    } else {
        read_single_source(&scripts_root)?
    };
    let scenario_id = make_scenario_id(&scripts_root);
    let title = format!(
        "Scripts {}",
        scripts_root
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unknown")
    );

    Ok(LoadedScenario {
        id: scenario_id,
        title,
        sources,
        entry_scene: entry_scene.to_string(),
    })
}

pub(crate) fn load_source_by_ref(
    scenario_ref: &str,
    entry_scene: &str,
) -> Result<LoadedScenario, NarrativeError> {
    let Some(raw) = scenario_ref.strip_prefix(SCENARIO_REF_PREFIX) else {
        return Err(NarrativeError::new(
            "CLI_SOURCE_REF_INVALID",
            format!("Unsupported scenario ref: {}", scenario_ref),
        ));
    };
    load_source_by_scripts_path(raw, entry_scene)
}

pub(crate) fn resolve_scripts_path(scripts: &str) -> Result<PathBuf, NarrativeError> {
    let path = PathBuf::from(scripts);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(NarrativeError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("scripts path does not exist: {}", absolute.display()),
        ));
    }

    if absolute.is_file() && !is_script_file(&absolute) {
        return Err(NarrativeError::new(
            "CLI_SOURCE_UNSUPPORTED",
            format!(
                "scripts file is not .yaml/.yml/.json: {}",
                absolute.display()
            ),
        ));
    }

    Ok(absolute)
}

pub(crate) fn read_sources_from_dir(
    scripts_dir: &Path,
) -> Result<BTreeMap<String, String>, NarrativeError> {
    let mut sources = BTreeMap::new();

    for entry in WalkDir::new(scripts_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() || !is_script_file(entry.path()) {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(scripts_dir)
            .map_err(map_cli_source_scan)?
            .to_string_lossy()
            .replace('\\', "/");

        let content = fs::read_to_string(path).map_err(map_cli_source_read)?;
        sources.insert(relative, content);
    }

    if sources.is_empty() {
        return Err(NarrativeError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .yaml/.yml/.json files under {}", scripts_dir.display()),
        ));
    }

    Ok(sources)
}

fn read_single_source(path: &Path) -> Result<BTreeMap<String, String>, NarrativeError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let content = fs::read_to_string(path).map_err(map_cli_source_read)?;
    Ok(BTreeMap::from([(name, content)]))
}

fn is_script_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            SCRIPT_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        })
}

pub(crate) fn make_scenario_id(scripts_path: &Path) -> String {
    format!("{}{}", SCENARIO_REF_PREFIX, scripts_path.display())
}
