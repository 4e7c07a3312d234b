//! One rename: name the image, pick a free name, move the file, fix the link.
//!
//! Every outcome produces exactly one notice. Precondition and naming
//! failures abort before anything on disk changes; a failed read or rename
//! is reported and also returned as an error.

use std::path::Path;

use crate::dedupe;
use crate::error::Error;
use crate::host::{DocumentEditor, Notifier, Vault};
use crate::link;
use crate::naming::NameGenerator;
use crate::types::{AbortReason, RenameOutcome, ResolvedName};

/// Borrowed collaborators for a rename.
pub struct Renamer<'a> {
    /// The note the image was pasted into.
    pub editor: &'a mut dyn DocumentEditor,
    /// Names images.
    pub generator: &'a NameGenerator,
    /// Where notices go.
    pub notifier: &'a dyn Notifier,
    /// Files.
    pub vault: &'a dyn Vault,
}

impl Renamer<'_> {
    /// Notify, log, and build an aborted outcome.
    fn abort(&self, reason: AbortReason, message: &str) -> RenameOutcome {
        tracing::warn!(?reason, "{message}");
        self.notifier.notify(message);
        return RenameOutcome::Aborted(reason);
    }

    /// Notify about a hard failure and hand the error back.
    fn fail(&self, what: &str, error: Error) -> Error {
        tracing::error!(error = %error, "{what}");
        self.notifier.notify(&format!("{what}: {error}"));
        return error;
    }

    /// Rename `file` after what it shows.
    ///
    /// # Errors
    ///
    /// Returns the filesystem error if the image can't be read, the folder
    /// can't be listed, the rename fails, or the note can't be written.
    pub fn rename(&mut self, file: &Path) -> Result<RenameOutcome, Error> {
        let old_name = file
            .file_name()
            .map(|n| return n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(document) = self.editor.active_document() else {
            return Ok(self.abort(
                AbortReason::NoActiveDocument,
                &format!("No active note, not renaming {old_name}"),
            ));
        };
        let dir = match file.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => {
                return Ok(self.abort(
                    AbortReason::NoParentDirectory,
                    &format!("No parent folder for {old_name}, not renaming"),
                ));
            },
        };

        let bytes = self
            .vault
            .read_binary(file)
            .map_err(|e| return self.fail(&format!("Could not read {old_name}"), e))?;
        let mime = mime_guess::from_path(file).first_or_octet_stream();
        let Some(candidate) = self
            .generator
            .generate(&bytes, mime.essence_str(), &document.title)
            .and_then(|raw| return normalize_candidate(&raw, file))
        else {
            return Ok(self.abort(
                AbortReason::NameUnavailable,
                &format!("Could not generate a name for {old_name}"),
            ));
        };

        let old_link = link::bare_reference(&self.editor.link_text(file, &document.path));
        let resolved = self.move_to_free_name(file, dir, &candidate, &old_name)?;
        let new_path = dir.join(&resolved.name);
        let new_link = link::bare_reference(&self.editor.link_text(&new_path, &document.path));

        let Some(cursor) = self.editor.cursor(&old_name) else {
            let message = format!("Renamed {old_name} to {}, but no open note to update the link in", resolved.name);
            tracing::warn!("{message}");
            self.notifier.notify(&message);
            return Ok(RenameOutcome::Renamed {
                from: old_name,
                link_patched: false,
                to: resolved.name,
            });
        };

        tracing::debug!(line = cursor.line, ch = cursor.ch, "patching link at cursor");
        let mut link_patched = false;
        if let Some(line) = self.editor.line(cursor.line)
            && line.contains(&old_link)
        {
            let patched = line.replacen(&old_link, &new_link, 1);
            self.editor
                .apply_edit(cursor.line, &patched)
                .map_err(|e| return self.fail(&format!("Renamed {old_name} but could not update the note"), e))?;
            link_patched = true;
        } else {
            tracing::debug!(link = %old_link, line = cursor.line, "old link not on the cursor line");
        }

        tracing::info!(from = %old_name, to = %resolved.name, link_patched, "renamed");
        if link_patched {
            self.notifier.notify(&format!("Renamed {old_name} to {}", resolved.name));
        } else {
            self.notifier.notify(&format!(
                "Renamed {old_name} to {}, but its link was not on the cursor line and was not updated",
                resolved.name
            ));
        }
        return Ok(RenameOutcome::Renamed {
            from: old_name,
            link_patched,
            to: resolved.name,
        });
    }

    /// Resolve a free name and rename into it. If the target turns out to be
    /// taken by the time of the rename, list and resolve once more and retry
    /// once; a second conflict is a hard failure.
    ///
    /// # Errors
    ///
    /// Returns the listing or rename error after notifying.
    fn move_to_free_name(
        &self,
        file: &Path,
        dir: &Path,
        candidate: &str,
        old_name: &str,
    ) -> Result<ResolvedName, Error> {
        let mut retried = false;
        loop {
            let siblings = self
                .vault
                .list_directory(dir)
                .map_err(|e| return self.fail(&format!("Could not list the folder of {old_name}"), e))?;
            let resolved = dedupe::resolve(candidate, siblings.iter().map(String::as_str));
            tracing::debug!(stem = %resolved.stem, extension = %resolved.extension, "resolved {candidate}");

            match self.vault.rename_file(file, &dir.join(&resolved.name)) {
                Ok(()) => return Ok(resolved),
                Err(Error::RenameConflict { path }) if !retried => {
                    tracing::warn!(taken = %path.display(), "name taken since listing, resolving again");
                    retried = true;
                },
                Err(e) => return Err(self.fail(&format!("Failed to rename {old_name}"), e)),
            }
        }
    }
}

/// Make a model answer usable as a file name next to `original`: keep only the
/// final path component, and borrow the original extension if there is none.
/// `None` if nothing usable is left.
fn normalize_candidate(raw: &str, original: &Path) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let (stem, extension) = dedupe::split_name(last);
    let stem = stem.trim();
    if stem.is_empty() || stem == "." {
        return None;
    }

    if extension.is_empty() {
        let original_ext = original.extension()?.to_string_lossy();
        return Some(format!("{stem}.{original_ext}"));
    }
    return Some(format!("{stem}.{extension}"));
}
