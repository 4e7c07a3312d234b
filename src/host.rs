//! The collaborators a rename talks to: files, the note being edited, and the
//! user. Traits are the seams; the `Fs*`/`Note*`/`Stderr*` types back them
//! with the real filesystem.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::Regex;
use walkdir::WalkDir;

use crate::config::{LinkStyle, Settings};
use crate::error::Error;
use crate::link;
use crate::types::{ActiveDocument, Cursor};

/// The note side of a rename.
pub trait DocumentEditor {
    /// The note the image was pasted into, if any.
    fn active_document(&self) -> Option<ActiveDocument>;
    /// Replace line `line` of the active document with `text` in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn apply_edit(&mut self, line: usize, text: &str) -> Result<(), Error>;
    /// Current cursor, or `None` when there is no editable view. `pasted` is
    /// the bare name of the image being renamed; editors without a live caret
    /// use it to find where that paste landed.
    fn cursor(&self, pasted: &str) -> Option<Cursor>;
    /// Text of line `n` of the active document.
    fn line(&self, n: usize) -> Option<String>;
    /// Link text the editor would insert for `file` inside the note at `from`.
    fn link_text(&self, file: &Path, from: &Path) -> String;
}

/// Fire-and-forget messages to the user.
pub trait Notifier {
    /// Show one message.
    fn notify(&self, message: &str);
}

/// The file side of a rename.
pub trait Vault {
    /// Names of every non-directory entry directly inside `dir`, symlinks included.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be read.
    fn list_directory(&self, dir: &Path) -> Result<Vec<String>, Error>;
    /// Whole file contents.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read.
    fn read_binary(&self, path: &Path) -> Result<Vec<u8>, Error>;
    /// Move `from` to `to`. Never overwrites.
    ///
    /// # Errors
    ///
    /// Returns `Error::RenameConflict` if `to` exists, `Error::Io` otherwise.
    fn rename_file(&self, from: &Path, to: &Path) -> Result<(), Error>;
}

/// `Vault` over the local filesystem.
pub struct FsVault;

impl Vault for FsVault {
    fn list_directory(&self, dir: &Path) -> Result<Vec<String>, Error> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        return Ok(names);
    }

    fn read_binary(&self, path: &Path) -> Result<Vec<u8>, Error> {
        return Ok(std::fs::read(path)?);
    }

    fn rename_file(&self, from: &Path, to: &Path) -> Result<(), Error> {
        // `std::fs::rename` replaces an existing target on Unix, so check first.
        // The window between the check and the rename is not closed.
        if std::fs::symlink_metadata(to).is_ok() {
            return Err(Error::RenameConflict { path: to.to_path_buf() });
        }
        std::fs::rename(from, to)?;
        return Ok(());
    }
}

/// `DocumentEditor` over a markdown note on disk.
///
/// There is no live cursor, so the cursor is taken to sit just after the
/// last embed of the image being renamed: that is where its paste left it.
/// Failing that, it sits after the last pasted-image embed of any name.
pub struct NoteEditor {
    /// The note being edited, if one was found.
    note: Option<PathBuf>,
    /// Recognizes embeds on a line.
    pattern: Regex,
    /// Literal prefix of pasted image names.
    prefix: String,
    /// Vault root; links are rendered relative to it or to the note's folder.
    root: PathBuf,
    /// Link syntax to render.
    style: LinkStyle,
}

impl NoteEditor {
    /// Editor for `note`, or for the most recently modified document in the
    /// vault when `note` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the embed pattern fails to compile.
    pub fn open(root: &Path, settings: &Settings, note: Option<PathBuf>) -> Result<Self, Error> {
        let note = note.or_else(|| return most_recent_document(root, &settings.document_extensions));
        let pattern = link::embed_pattern()?;
        return Ok(Self {
            note,
            pattern,
            prefix: settings.pasted_prefix.clone(),
            root: root.to_path_buf(),
            style: settings.link_style,
        });
    }

    /// End of the last embed on the last line whose embeds satisfy `wanted`.
    fn last_embed_where(&self, lines: &[String], wanted: impl Fn(&str) -> bool) -> Option<Cursor> {
        for (index, text) in lines.iter().enumerate().rev() {
            let last = link::embedded_files(&self.pattern, text)
                .into_iter()
                .rfind(|(name, _)| return wanted(name));
            if let Some((_, ch)) = last {
                return Some(Cursor { ch, line: index });
            }
        }
        return None;
    }

    /// Lines of the note without their terminators, or `None` if there is no
    /// note or it can't be read.
    fn read_lines(&self) -> Option<Vec<String>> {
        let note = self.note.as_ref()?;
        let content = std::fs::read_to_string(note).ok()?;
        return Some(content.lines().map(String::from).collect());
    }
}

impl DocumentEditor for NoteEditor {
    fn active_document(&self) -> Option<ActiveDocument> {
        let path = self.note.clone()?;
        let title = path.file_stem()?.to_string_lossy().into_owned();
        return Some(ActiveDocument { path, title });
    }

    fn apply_edit(&mut self, line: usize, text: &str) -> Result<(), Error> {
        let Some(note) = self.note.as_ref() else {
            return Ok(());
        };
        let content = std::fs::read_to_string(note)?;
        let Some(output) = replace_line(&content, line, text) else {
            return Ok(());
        };
        std::fs::write(note, output)?;
        return Ok(());
    }

    fn cursor(&self, pasted: &str) -> Option<Cursor> {
        let lines = self.read_lines()?;
        return self
            .last_embed_where(&lines, |name| return name == pasted)
            .or_else(|| return self.last_embed_where(&lines, |name| return name.starts_with(self.prefix.as_str())));
    }

    fn line(&self, n: usize) -> Option<String> {
        return self.read_lines()?.into_iter().nth(n);
    }

    fn link_text(&self, file: &Path, from: &Path) -> String {
        let note_dir = from.parent().unwrap_or(Path::new(""));
        let relative = file
            .strip_prefix(note_dir)
            .or_else(|_| return file.strip_prefix(&self.root))
            .unwrap_or(file);
        return link::link_text(self.style, relative);
    }
}

/// Prints each notice to stderr.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(notice = message);
        eprintln!("snapname: {message}");
    }
}

/// The most recently modified document under `root`, skipping hidden folders
/// such as `.obsidian` and `.trash`.
fn most_recent_document(root: &Path, extensions: &[String]) -> Option<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
    {
        let is_document = entry
            .path()
            .extension()
            .and_then(|ext| return ext.to_str())
            .is_some_and(|ext| return extensions.iter().any(|d| return d.eq_ignore_ascii_case(ext)));
        if !is_document {
            continue;
        }
        let Some(modified) = entry.metadata().ok().and_then(|m| return m.modified().ok()) else {
            continue;
        };
        if newest.as_ref().is_none_or(|(t, _)| return modified > *t) {
            newest = Some((modified, entry.into_path()));
        }
    }

    return newest.map(|(_, path)| return path);
}

/// `content` with line `n` replaced by `text`. Every line terminator,
/// `\r\n` or `\n`, is kept as it was. `None` if there is no line `n`.
fn replace_line(content: &str, n: usize, text: &str) -> Option<String> {
    let mut output = String::with_capacity(content.len().saturating_add(text.len()));
    let mut found = false;
    for (index, segment) in content.split_inclusive('\n').enumerate() {
        if index != n {
            output.push_str(segment);
            continue;
        }
        let terminator = if segment.ends_with("\r\n") {
            "\r\n"
        } else if segment.ends_with('\n') {
            "\n"
        } else {
            ""
        };
        output.push_str(text);
        output.push_str(terminator);
        found = true;
    }
    return found.then_some(output);
}
