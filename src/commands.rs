//! CLI commands for snapname: watch, rename, resolve, config.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{self, Settings};
use crate::dedupe;
use crate::error;
use crate::host::{FsVault, NoteEditor, StderrNotifier, Vault as _};
use crate::naming::NameGenerator;
use crate::openai::OpenAiVision;
use crate::orchestrator::Renamer;
use crate::types::RenameOutcome;
use crate::watch;

/// Wire the configured vision service into a name generator.
///
/// # Errors
///
/// Returns `Error::MissingApiKey` if no key is configured,
/// or `Error::Http` if the HTTP client cannot be built.
fn build_generator(settings: &Settings, env_key: Option<String>) -> Result<NameGenerator, error::Error> {
    let api_key = settings.resolve_api_key(env_key)?;
    let model = OpenAiVision::new(settings, api_key)?;
    return Ok(NameGenerator::new(Box::new(model), settings.instruction.clone()));
}

/// Set one key in `.snapname.toml`.
///
/// # Errors
///
/// Returns errors from validating or writing the config file.
pub fn config_set(root: &Path, key: &str, value: &str) -> Result<(), error::Error> {
    config::set_value(root, key, value)?;
    eprintln!("Set {key} in {}", config::CONFIG_FILE);
    return Ok(());
}

/// Print the effective settings with the API key redacted.
///
/// # Errors
///
/// Returns errors from loading or rendering the settings.
pub fn config_show(root: &Path) -> Result<(), error::Error> {
    let settings = Settings::load(root)?;
    print!("{}", settings.redacted()?);
    return Ok(());
}

/// Rename one image right away, without the freshness and prefix checks.
/// Exits 1 if the rename was abandoned.
///
/// # Errors
///
/// Returns errors from config loading, client setup, or the rename itself.
pub fn rename(
    root: &Path,
    file: &Path,
    note: Option<PathBuf>,
    env_key: Option<String>,
) -> Result<ExitCode, error::Error> {
    let settings = Settings::load(root)?;
    let generator = build_generator(&settings, env_key)?;
    let mut editor = NoteEditor::open(root, &settings, note)?;

    let mut renamer = Renamer {
        editor: &mut editor,
        generator: &generator,
        notifier: &StderrNotifier,
        vault: &FsVault,
    };
    return match renamer.rename(file)? {
        RenameOutcome::Aborted(_) => Ok(ExitCode::FAILURE),
        RenameOutcome::Renamed { to, .. } => {
            println!("{to}");
            Ok(ExitCode::SUCCESS)
        },
    };
}

/// Print the name `name` would get in `dir` without renaming anything.
///
/// # Errors
///
/// Returns `Error::Io` if the directory cannot be listed.
pub fn resolve(name: &str, dir: &Path) -> Result<(), error::Error> {
    let siblings = FsVault.list_directory(dir)?;
    let resolved = dedupe::resolve(name, siblings.iter().map(String::as_str));
    println!("{}", resolved.name);
    return Ok(());
}

/// Watch the vault until interrupted.
///
/// # Errors
///
/// Returns errors from config loading, client setup, or watcher setup.
pub fn watch(root: &Path, env_key: Option<String>) -> Result<(), error::Error> {
    let root = root.canonicalize()?;
    let settings = Settings::load(&root)?;
    let generator = build_generator(&settings, env_key)?;
    return watch::run(&root, &settings, &generator);
}
