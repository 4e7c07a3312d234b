/// Core domain types shared by the classifier, deduplicator and orchestrator.
use std::path::PathBuf;
use std::time::SystemTime;

/// A file-system creation notification, as seen by the classifier.
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// When the file was created (modification time where birth time is unavailable).
    pub created: SystemTime,
    /// False for directories and other non-file entries.
    pub is_file: bool,
    /// Path of the new entry.
    pub path: PathBuf,
}

/// Output of deduplication. `name == stem + "." + extension` by construction,
/// and `name` did not collide with any sibling when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// File extension without the dot.
    pub extension: String,
    /// Final file name.
    pub name: String,
    /// File name without the extension.
    pub stem: String,
}

/// The note an image was pasted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDocument {
    /// Path to the note.
    pub path: PathBuf,
    /// Note title (file stem), used as naming context.
    pub title: String,
}

/// Zero-based cursor position inside the active document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Column, in bytes.
    pub ch: usize,
    /// Line index.
    pub line: usize,
}

/// Why a rename stopped before completing. Each reason was reported once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The vision service failed or returned nothing usable.
    NameUnavailable,
    /// No note is active, so there is no link to patch and no title for context.
    NoActiveDocument,
    /// The image has no parent directory to rename within.
    NoParentDirectory,
}

/// What a single rename attempt ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// Nothing on disk changed.
    Aborted(AbortReason),
    /// The file was renamed. `link_patched` is false when no editable view was
    /// available and the link in the note was left as it was.
    Renamed {
        /// Old file name.
        from: String,
        /// Whether the reference on the cursor line was rewritten.
        link_patched: bool,
        /// New file name.
        to: String,
    },
}
