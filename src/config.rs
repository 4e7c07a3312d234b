use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// File name of the per-vault settings file.
pub const CONFIG_FILE: &str = ".snapname.toml";

/// Instruction sent with every image. The model must answer with the name only.
pub const DEFAULT_INSTRUCTION: &str = "You name image files. Look at the image and reply with a short, \
descriptive file name for it: lowercase words joined by hyphens, ending with the image's file \
extension (for example `cat-sitting-on-keyboard.png`). The title of the note the image was pasted \
into is given as context; use it only when it helps describe the image. Reply with the file name \
and nothing else.";

/// Keys accepted by `config set`, in the order `config show` prints them.
const KNOWN_KEYS: [&str; 8] = [
    "api_key",
    "base_url",
    "document_extensions",
    "instruction",
    "link_style",
    "max_event_age_ms",
    "model",
    "pasted_prefix",
];

/// How links to images are written inside notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    /// `![](path/to/image.png)`
    Markdown,
    /// `![[path/to/image.png]]`
    Wikilink,
}

/// Effective settings: `.snapname.toml` merged over the built-in defaults.
/// A missing file means "all defaults"; a present but malformed file is an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API key for the vision service. `OPENAI_API_KEY` is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API, without the trailing endpoint.
    pub base_url: String,
    /// Extensions (without the dot) of text documents that must never be renamed.
    pub document_extensions: Vec<String>,
    /// Naming instruction sent to the model.
    pub instruction: String,
    /// Link syntax used when rewriting the reference in the note.
    pub link_style: LinkStyle,
    /// Creation events older than this are ignored.
    pub max_event_age_ms: u64,
    /// Vision-capable model name.
    pub model: String,
    /// Literal prefix the editor gives freshly pasted images.
    pub pasted_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        return Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            document_extensions: vec!["md".to_string()],
            instruction: DEFAULT_INSTRUCTION.to_string(),
            link_style: LinkStyle::Wikilink,
            max_event_age_ms: 1000,
            model: "gpt-4o".to_string(),
            pasted_prefix: "Pasted image ".to_string(),
        };
    }
}

impl Settings {
    /// Load `.snapname.toml` from the vault root, falling back to defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse settings from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is not valid settings TOML.
    pub fn parse(content: &str) -> Result<Self, Error> {
        return Ok(toml::from_str(content)?);
    }

    /// Render the settings as TOML with the API key redacted.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails.
    pub fn redacted(&self) -> Result<String, Error> {
        let mut shown = self.clone();
        if shown.api_key.is_some() {
            shown.api_key = Some("<redacted>".to_string());
        }
        return Ok(toml::to_string_pretty(&shown)?);
    }

    /// Pick the API key: the config file wins, then the environment value
    /// handed in by `main`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingApiKey` if neither source has a non-empty key.
    pub fn resolve_api_key(&self, from_env: Option<String>) -> Result<String, Error> {
        let usable = |key: &String| return !key.trim().is_empty();
        return self
            .api_key
            .clone()
            .filter(usable)
            .or_else(|| return from_env.filter(usable))
            .ok_or(Error::MissingApiKey);
    }
}

/// Parse a `.snapname.toml` into a format-preserving document.
/// Returns an empty document if the file doesn't exist.
///
/// # Errors
///
/// Returns `Error::Io` on read failure or `Error::ConfigEdit` on parse failure.
fn read_config_doc(root: &Path) -> Result<(PathBuf, toml_edit::DocumentMut), Error> {
    let config_path = root.join(CONFIG_FILE);
    let content = match std::fs::read_to_string(&config_path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };

    let doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        return Error::ConfigEdit {
            path: config_path.clone(),
            reason: e.to_string(),
        };
    })?;

    return Ok((config_path, doc));
}

/// Set one key in `.snapname.toml`, keeping the rest of the file untouched.
/// The edited document is re-validated as a whole before it is written.
///
/// # Errors
///
/// Returns `Error::UnknownSetting` for keys snapname doesn't know,
/// `Error::InvalidSetting` if the value has the wrong shape,
/// or I/O and parse errors from reading and writing the file.
pub fn set_value(root: &Path, key: &str, raw: &str) -> Result<(), Error> {
    if !KNOWN_KEYS.contains(&key) {
        return Err(Error::UnknownSetting { key: key.to_string() });
    }

    let (config_path, mut doc) = read_config_doc(root)?;
    doc[key] = typed_value(key, raw)?;

    let rendered = doc.to_string();
    Settings::parse(&rendered).map_err(|e| {
        return Error::InvalidSetting {
            key: key.to_string(),
            reason: e.to_string(),
        };
    })?;

    std::fs::write(&config_path, rendered)?;
    return Ok(());
}

/// Convert a command-line string into the TOML item a key expects.
///
/// # Errors
///
/// Returns `Error::InvalidSetting` if the string doesn't fit the key's type.
fn typed_value(key: &str, raw: &str) -> Result<toml_edit::Item, Error> {
    let invalid = |reason: &str| {
        return Error::InvalidSetting {
            key: key.to_string(),
            reason: reason.to_string(),
        };
    };

    return match key {
        "document_extensions" => {
            let mut array = toml_edit::Array::new();
            for ext in raw.split(',').map(|e| return e.trim().trim_start_matches('.')) {
                if !ext.is_empty() {
                    array.push(ext);
                }
            }
            Ok(toml_edit::value(array))
        },
        "link_style" => match raw {
            "markdown" | "wikilink" => Ok(toml_edit::value(raw)),
            _ => Err(invalid("expected `markdown` or `wikilink`")),
        },
        "max_event_age_ms" => {
            let millis: i64 = raw.parse().map_err(|_err| return invalid("expected a whole number of milliseconds"))?;
            if millis < 0 {
                return Err(invalid("must not be negative"));
            }
            Ok(toml_edit::value(millis))
        },
        _ => Ok(toml_edit::value(raw)),
    };
}
