//! Decides whether a creation event is a freshly pasted image worth renaming.

use std::time::{Duration, SystemTime};

use crate::config::Settings;
use crate::types::FileEvent;

/// Why an event was turned away. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    /// A text document, never renamed.
    Document,
    /// Folder or other non-file entry.
    NotAFile,
    /// Base name lacks the pasted-image prefix.
    NotPasted,
    /// Created too long ago; typically a startup rescan.
    Stale,
}

/// Apply the rules in order: concrete file, recent enough, not a document,
/// base name starts with the pasted-image prefix.
pub fn should_rename(event: &FileEvent, now: SystemTime, settings: &Settings) -> bool {
    return match first_rejection(event, now, settings) {
        None => true,
        Some(reason) => {
            tracing::debug!(path = %event.path.display(), ?reason, "ignoring creation event");
            false
        },
    };
}

/// The first rule an event fails, if any.
fn first_rejection(event: &FileEvent, now: SystemTime, settings: &Settings) -> Option<Rejection> {
    if !event.is_file {
        return Some(Rejection::NotAFile);
    }

    // A creation time in the future (clock skew) counts as brand new.
    let age = now.duration_since(event.created).unwrap_or(Duration::ZERO);
    if age > Duration::from_millis(settings.max_event_age_ms) {
        return Some(Rejection::Stale);
    }

    let is_document = event
        .path
        .extension()
        .and_then(|ext| return ext.to_str())
        .is_some_and(|ext| {
            return settings.document_extensions.iter().any(|doc| return doc.eq_ignore_ascii_case(ext));
        });
    if is_document {
        return Some(Rejection::Document);
    }

    let pasted = event
        .path
        .file_name()
        .and_then(|name| return name.to_str())
        .is_some_and(|name| return name.starts_with(settings.pasted_prefix.as_str()));
    if !pasted {
        return Some(Rejection::NotPasted);
    }

    return None;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn event(path: &str, age_ms: u64, now: SystemTime) -> FileEvent {
        return FileEvent {
            created: now.checked_sub(Duration::from_millis(age_ms)).unwrap(),
            is_file: true,
            path: PathBuf::from(path),
        };
    }

    #[test]
    fn accepts_fresh_pasted_image() {
        let now = SystemTime::now();
        let ev = event("notes/Pasted image 20240101.png", 200, now);
        assert!(should_rename(&ev, now, &Settings::default()));
    }

    #[test]
    fn rejects_folders() {
        let now = SystemTime::now();
        let mut ev = event("notes/Pasted image folder", 0, now);
        ev.is_file = false;
        assert_eq!(first_rejection(&ev, now, &Settings::default()), Some(Rejection::NotAFile));
    }

    #[test]
    fn rejects_old_events_regardless_of_name() {
        let now = SystemTime::now();
        let ev = event("Pasted image 20240101.png", 1001, now);
        assert_eq!(first_rejection(&ev, now, &Settings::default()), Some(Rejection::Stale));

        let edge = event("Pasted image 20240101.png", 1000, now);
        assert!(should_rename(&edge, now, &Settings::default()));
    }

    #[test]
    fn future_timestamps_count_as_fresh() {
        let now = SystemTime::now();
        let ev = FileEvent {
            created: now.checked_add(Duration::from_secs(5)).unwrap(),
            is_file: true,
            path: PathBuf::from("Pasted image 1.png"),
        };
        assert!(should_rename(&ev, now, &Settings::default()));
    }

    #[test]
    fn rejects_markdown_even_with_prefix() {
        let now = SystemTime::now();
        let ev = event("Pasted image notes.md", 10, now);
        assert_eq!(first_rejection(&ev, now, &Settings::default()), Some(Rejection::Document));

        let upper = event("Pasted image notes.MD", 10, now);
        assert_eq!(first_rejection(&upper, now, &Settings::default()), Some(Rejection::Document));
    }

    #[test]
    fn prefix_must_lead_the_base_name() {
        let now = SystemTime::now();
        let settings = Settings::default();

        let mid = event("my Pasted image 1.png", 10, now);
        assert_eq!(first_rejection(&mid, now, &settings), Some(Rejection::NotPasted));

        let lower = event("pasted image 1.png", 10, now);
        assert_eq!(first_rejection(&lower, now, &settings), Some(Rejection::NotPasted));

        // Only the base name counts, not the directory.
        let dir = event("Pasted image dir/photo.png", 10, now);
        assert_eq!(first_rejection(&dir, now, &settings), Some(Rejection::NotPasted));
    }
}
