//! Vault watcher: classifies every new file and renames the pasted images.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use notify::{RecursiveMode, Watcher as _};

use crate::classify;
use crate::config::Settings;
use crate::error;
use crate::host::{FsVault, NoteEditor, StderrNotifier};
use crate::naming::NameGenerator;
use crate::orchestrator::Renamer;
use crate::types::FileEvent;

/// Quiet period after a creation event before the file is read, so the
/// editor has finished writing it.
const SETTLE_MS: u64 = 100;

/// The created paths worth renaming, judged as of `observed_at`, the moment
/// the watcher reported them. Paths that vanished already are dropped.
fn accepted(paths: Vec<PathBuf>, observed_at: SystemTime, settings: &Settings) -> Vec<PathBuf> {
    return paths
        .into_iter()
        .filter_map(file_event)
        .filter(|event| return classify::should_rename(event, observed_at, settings))
        .map(|event| return event.path)
        .collect();
}

/// Create a filesystem watcher that classifies each creation event as it
/// arrives and sends the accepted paths on the given channel.
///
/// # Errors
///
/// Returns `Error::Watcher` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<PathBuf>,
    settings: Settings,
) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        match res {
            Ok(event) if matches!(event.kind, notify::EventKind::Create(_)) => {
                for path in accepted(event.paths, SystemTime::now(), &settings) {
                    let _ = tx.send(path);
                }
            },
            Ok(_) => {},
            Err(e) => tracing::warn!(error = %e, "watch error"),
        }
    })
    .map_err(|e| {
        return error::Error::Watcher {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Build the classifier's view of a created path. `None` if it vanished already.
fn file_event(path: PathBuf) -> Option<FileEvent> {
    let meta = std::fs::metadata(&path).ok()?;
    let created = meta.created().or_else(|_| return meta.modified()).ok()?;
    return Some(FileEvent {
        created,
        is_file: meta.is_file(),
        path,
    });
}

/// Rename one accepted image. Errors are already shown to the user by the
/// orchestrator; they are logged here and the watcher keeps going.
fn handle(root: &Path, settings: &Settings, generator: &NameGenerator, path: &Path) {
    let mut editor = match NoteEditor::open(root, settings, None) {
        Ok(editor) => editor,
        Err(e) => {
            tracing::error!(error = %e, "could not open the active note");
            return;
        },
    };
    let mut renamer = Renamer {
        editor: &mut editor,
        generator,
        notifier: &StderrNotifier,
        vault: &FsVault,
    };
    if let Err(e) = renamer.rename(path) {
        tracing::error!(path = %path.display(), error = %e, "rename failed");
        eprintln!("error: {e}");
    }
    return;
}

/// Entry point for the watch command.
///
/// # Errors
///
/// Returns errors from watcher setup.
pub fn run(root: &Path, settings: &Settings, generator: &NameGenerator) -> Result<(), error::Error> {
    let (_watcher, rx) = start(root, settings)?;
    eprintln!("watch: monitoring {}, press Ctrl+C to stop", root.display());
    serve(&rx, root, settings, generator);
    return Ok(());
}

/// Handle accepted images one at a time, so two renames never overlap,
/// until the watcher feeding `rx` is dropped.
fn serve(rx: &crossbeam_channel::Receiver<PathBuf>, root: &Path, settings: &Settings, generator: &NameGenerator) {
    let settle = Duration::from_millis(SETTLE_MS);
    while let Ok(first) = rx.recv() {
        let mut queue = vec![first];
        while let Ok(more) = rx.recv_timeout(settle) {
            if !queue.contains(&more) {
                queue.push(more);
            }
        }
        for path in &queue {
            if !path.exists() {
                tracing::debug!(path = %path.display(), "gone before it could be renamed");
                continue;
            }
            handle(root, settings, generator, path);
        }
    }
    return;
}

/// Watch `root` recursively. Accepted paths arrive on the returned channel
/// for as long as the returned watcher is alive.
///
/// # Errors
///
/// Returns `Error::Watcher` if the watcher cannot be created or started.
fn start(
    root: &Path,
    settings: &Settings,
) -> Result<(notify::RecommendedWatcher, crossbeam_channel::Receiver<PathBuf>), error::Error> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx, settings.clone())?;
    watcher.watch(root, RecursiveMode::Recursive).map_err(|e| {
        return error::Error::Watcher {
            reason: format!("cannot watch {}: {e}", root.display()),
        };
    })?;
    return Ok((watcher, rx));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::Error;
    use crate::naming::{NameRequest, VisionModel};

    /// Takes 1.5 s per image, like a busy vision service.
    #[derive(Default)]
    struct Slow {
        /// Images named so far.
        calls: Cell<usize>,
    }

    impl VisionModel for Slow {
        fn complete(&self, _request: &NameRequest<'_>) -> Result<Option<String>, Error> {
            std::thread::sleep(Duration::from_millis(1500));
            let n = self.calls.get();
            self.calls.set(n.saturating_add(1));
            return Ok(Some(format!("thing-{n}.png")));
        }
    }

    #[test]
    fn accepts_fresh_pasted_images_only() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("Pasted image 20240101.png");
        let note = dir.path().join("Pasted image notes.md");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(&note, "text").unwrap();
        std::fs::create_dir(dir.path().join("Pasted image folder")).unwrap();

        let paths = vec![
            image.clone(),
            note,
            dir.path().join("Pasted image folder"),
            dir.path().join("gone.png"),
        ];
        assert_eq!(accepted(paths, SystemTime::now(), &Settings::default()), vec![image]);
    }

    #[test]
    fn age_is_measured_when_the_event_arrives() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("Pasted image 1.png");
        std::fs::write(&image, b"png").unwrap();
        let arrived = file_event(image.clone()).unwrap().created;
        let settings = Settings::default();

        assert_eq!(accepted(vec![image.clone()], arrived, &settings), vec![image.clone()]);
        let after_a_slow_rename = arrived.checked_add(Duration::from_millis(1500)).unwrap();
        assert!(accepted(vec![image], after_a_slow_rename, &settings).is_empty());
    }

    #[test]
    fn paste_during_a_slow_rename_is_still_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::write(root.join("Note.md"), "![[Pasted image 1.png]]\n![[Pasted image 2.png]]\n").unwrap();
        let settings = Settings::default();
        let (watcher, rx) = start(&root, &settings).unwrap();

        let paste_root = root.clone();
        let paster = std::thread::spawn(move || {
            std::fs::write(paste_root.join("Pasted image 1.png"), b"one").unwrap();
            std::thread::sleep(Duration::from_millis(400));
            std::fs::write(paste_root.join("Pasted image 2.png"), b"two").unwrap();
            std::thread::sleep(Duration::from_millis(500));
            drop(watcher);
        });

        let generator = NameGenerator::new(Box::new(Slow::default()), "name it".to_string());
        serve(&rx, &root, &settings, &generator);
        paster.join().unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&root)
            .unwrap()
            .map(|entry| return entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Note.md", "thing-0.png", "thing-1.png"]);
        assert_eq!(
            std::fs::read_to_string(root.join("Note.md")).unwrap(),
            "![[thing-0.png]]\n![[thing-1.png]]\n"
        );
    }
}
