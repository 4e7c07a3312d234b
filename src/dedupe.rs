//! Collision-free naming: `name.ext`, then `1_name.ext`, `2_name.ext`, ...

use crate::types::ResolvedName;

/// Pick a name for `candidate` that no sibling already uses.
///
/// If nothing in `siblings` is called exactly `candidate`, the candidate is
/// returned unchanged. Otherwise the result is `<N>_<stem>.<ext>` with `N` one
/// above the highest number already used by a `<digits>_<stem>.<ext>` sibling
/// (or `1` if there is none). Numbered siblings of any other stem are ignored.
/// One pass over the siblings, no early exit.
pub fn resolve<'a, I>(candidate: &str, siblings: I) -> ResolvedName
where
    I: IntoIterator<Item = &'a str>,
{
    let (stem, extension) = split_name(candidate);
    let numbered_suffix = format!("_{}", join_name(stem, extension));

    let mut exact_collision = false;
    let mut highest: Option<u64> = None;
    for sibling in siblings {
        if sibling == candidate {
            exact_collision = true;
        } else if let Some(n) = numbered_prefix(sibling, &numbered_suffix) {
            highest = Some(highest.map_or(n, |h| return h.max(n)));
        }
    }

    let name = if exact_collision {
        let next = highest.map_or(1, |h| return h.saturating_add(1));
        format!("{next}{numbered_suffix}")
    } else {
        candidate.to_string()
    };

    let (final_stem, final_ext) = split_name(&name);
    return ResolvedName {
        extension: final_ext.to_string(),
        stem: final_stem.to_string(),
        name: join_name(final_stem, final_ext),
    };
}

/// Rejoin a stem and extension; no dot when the extension is empty.
fn join_name(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        return stem.to_string();
    }
    return format!("{stem}.{extension}");
}

/// If `sibling` is `<ascii digits><suffix>`, the leading number.
/// Matching is literal, so characters in the stem carry no pattern meaning.
/// Numbers too large for `u64` are skipped.
fn numbered_prefix(sibling: &str, suffix: &str) -> Option<u64> {
    let digits = sibling.strip_suffix(suffix)?;
    if digits.is_empty() || !digits.bytes().all(|b| return b.is_ascii_digit()) {
        return None;
    }
    return digits.parse().ok();
}

/// Split at the final `.` into (stem, extension). No dot means no extension.
pub fn split_name(name: &str) -> (&str, &str) {
    return name.rsplit_once('.').unwrap_or((name, ""));
}
