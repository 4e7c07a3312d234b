//! Rendering and normalizing image embeds inside notes.

use std::path::{Component, Path};

use regex::Regex;

use crate::config::LinkStyle;

/// Matches `![[target]]`, `![[target|alias]]` and `![alt](target)`.
/// Capture 1 is a wikilink target, capture 2 a markdown target.
const EMBED_PATTERN: &str = r"!\[\[([^\]|]+)(?:\|[^\]]*)?\]\]|!\[[^\]]*\]\(([^)]+)\)";

/// Build the embed pattern used to find image links on a line.
///
/// # Errors
///
/// Returns the regex error if the pattern fails to compile.
pub fn embed_pattern() -> Result<Regex, regex::Error> {
    return Regex::new(EMBED_PATTERN);
}

/// Drop any directory part from the target inside an embed, so
/// `![[assets/a.png]]` becomes `![[a.png]]`. Anything that isn't an embed
/// is returned unchanged.
pub fn bare_reference(link: &str) -> String {
    if let Some(inner) = link.strip_prefix("![[").and_then(|rest| return rest.strip_suffix("]]")) {
        let (target, alias) = match inner.split_once('|') {
            Some((t, a)) => (t, Some(a)),
            None => (inner, None),
        };
        let file = last_segment(target);
        return match alias {
            Some(a) => format!("![[{file}|{a}]]"),
            None => format!("![[{file}]]"),
        };
    }

    if let Some((alt, rest)) = link.split_once("](")
        && let Some(target) = rest.strip_suffix(')')
    {
        return format!("{alt}]({})", last_segment(target));
    }

    return link.to_string();
}

/// Percent-encode the characters markdown link targets can't carry raw.
fn encode_target(path: &str) -> String {
    return path.replace('%', "%25").replace(' ', "%20").replace('(', "%28").replace(')', "%29");
}

/// File names embedded on `line`, decoded, in order of appearance,
/// paired with the byte offset just past each embed.
pub fn embedded_files(pattern: &Regex, line: &str) -> Vec<(String, usize)> {
    let mut found = Vec::new();
    for cap in pattern.captures_iter(line) {
        let Some(whole) = cap.get(0) else { continue };
        let target = if let Some(wiki) = cap.get(1) {
            wiki.as_str().to_string()
        } else if let Some(md) = cap.get(2) {
            decode_target(md.as_str())
        } else {
            continue;
        };
        found.push((last_segment(&target).to_string(), whole.end()));
    }
    return found;
}

/// Undo `encode_target`.
fn decode_target(target: &str) -> String {
    return target.replace("%20", " ").replace("%28", "(").replace("%29", ")").replace("%25", "%");
}

/// Everything after the final `/`.
fn last_segment(target: &str) -> &str {
    return target.rsplit('/').next().unwrap_or(target);
}

/// Render an embed for `relative`, a path already relative to wherever the
/// note resolves links from. Separators are always `/`.
pub fn link_text(style: LinkStyle, relative: &Path) -> String {
    let joined = relative
        .components()
        .filter_map(|c| {
            return match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            };
        })
        .collect::<Vec<_>>()
        .join("/");

    return match style {
        LinkStyle::Markdown => format!("![]({})", encode_target(&joined)),
        LinkStyle::Wikilink => format!("![[{joined}]]"),
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn renders_both_styles() {
        let path = Path::new("assets/Pasted image 1.png");
        assert_eq!(link_text(LinkStyle::Wikilink, path), "![[assets/Pasted image 1.png]]");
        assert_eq!(link_text(LinkStyle::Markdown, path), "![](assets/Pasted%20image%201.png)");
    }

    #[test]
    fn bare_reference_drops_directories() {
        assert_eq!(bare_reference("![[assets/img/cat.png]]"), "![[cat.png]]");
        assert_eq!(bare_reference("![[cat.png|300]]"), "![[cat.png|300]]");
        assert_eq!(bare_reference("![](assets/cat%20face.png)"), "![](cat%20face.png)");
        assert_eq!(bare_reference("plain text"), "plain text");
    }

    #[test]
    fn finds_embedded_files_in_order() {
        let pattern = embed_pattern().unwrap();
        let line = "see ![[Pasted image 1.png]] and ![](sub/Pasted%20image%202.png) ok";
        let found = embedded_files(&pattern, line);
        let names: Vec<&str> = found.iter().map(|(n, _)| return n.as_str()).collect();
        assert_eq!(names, vec!["Pasted image 1.png", "Pasted image 2.png"]);
        assert_eq!(found.first().unwrap().1, "see ![[Pasted image 1.png]]".len());
    }

    #[test]
    fn encoding_round_trips_awkward_names() {
        let pattern = embed_pattern().unwrap();
        let link = link_text(LinkStyle::Markdown, Path::new("diagram (v2) 100%.png"));
        let found = embedded_files(&pattern, &link);
        assert_eq!(found.first().unwrap().0, "diagram (v2) 100%.png");
    }
}
