/// Crate-level error types for snapname.
use std::path::PathBuf;

/// Every error names the file, setting, or service that failed so the
/// message printed by `main` is enough to act on.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `.snapname.toml` could not be parsed as an editable document.
    #[error("config edit failed: {}: {reason}", path.display())]
    ConfigEdit {
        /// Path to the config file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// HTTP transport to the vision service failed.
    #[error("http: {0}")]
    Http(
        /// The wrapped transport error.
        #[from]
        reqwest::Error,
    ),

    /// The vision service answered, but not with a usable name.
    #[error("inference failed: {reason}")]
    Inference {
        /// What was wrong with the answer.
        reason: String,
    },

    /// A setting has a value of the wrong shape.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidSetting {
        /// Setting name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON encoding or decoding failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// No API key in the config file or in `OPENAI_API_KEY`.
    #[error("no API key: set `api_key` in .snapname.toml or export OPENAI_API_KEY")]
    MissingApiKey,

    /// A link pattern failed to compile.
    #[error("pattern: {0}")]
    Pattern(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// The rename destination already exists.
    #[error("rename target already exists: {}", path.display())]
    RenameConflict {
        /// Destination path that was taken.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// TOML serialization failed.
    #[error("toml serialize: {0}")]
    TomlSer(
        /// The wrapped TOML serialization error.
        #[from]
        toml::ser::Error,
    ),

    /// `config set` was given a key snapname does not know.
    #[error("unknown setting: `{key}`")]
    UnknownSetting {
        /// The rejected key.
        key: String,
    },

    /// The filesystem watcher could not be created or attached.
    #[error("watcher: {reason}")]
    Watcher {
        /// Description of the watcher failure.
        reason: String,
    },
}
