//! Quality preset lookup.

/// Preset name used when none is given.
pub const DEFAULT_QUALITY: &str = "best";

/// Named presets and the format selector each expands to.
pub const QUALITY_PRESETS: &[(&str, &str)] = &[
    ("best", "bv*+ba/b"),
    ("4k", "bv[height<=2160]+ba/b[height<=2160]"),
    ("2k", "bv[height<=1440]+ba/b[height<=1440]"),
    ("1080p", "bv[height<=1080]+ba/b[height<=1080]"),
    ("720p", "bv[height<=720]+ba/b[height<=720]"),
    ("480p", "bv[height<=480]+ba/b[height<=480]"),
    ("360p", "bv[height<=360]+ba/b[height<=360]"),
];

/// Expands a quality name into a downloader format selector.
///
/// Blank input means [`DEFAULT_QUALITY`]. Names that are not presets are
/// assumed to already be raw selectors (`"137+140"`, `"bestaudio"`) and are
/// returned trimmed.
///
/// ```
/// use dlqueue_core::download::resolve_quality;
///
/// assert_eq!(resolve_quality("720p"), "bv[height<=720]+ba/b[height<=720]");
/// assert_eq!(resolve_quality("137+140"), "137+140");
/// ```
#[must_use]
pub fn resolve_quality(quality: &str) -> String {
    let trimmed = quality.trim();
    let name = if trimmed.is_empty() {
        DEFAULT_QUALITY
    } else {
        trimmed
    };

    QUALITY_PRESETS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
        .map_or_else(|| name.to_string(), |(_, selector)| (*selector).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_quality_best() {
        assert_eq!(resolve_quality("best"), "bv*+ba/b");
    }

    #[test]
    fn test_resolve_quality_blank_defaults_to_best() {
        assert_eq!(resolve_quality(""), "bv*+ba/b");
        assert_eq!(resolve_quality("   "), "bv*+ba/b");
    }

    #[test]
    fn test_resolve_quality_height_presets() {
        assert_eq!(
            resolve_quality("4k"),
            "bv[height<=2160]+ba/b[height<=2160]"
        );
        assert_eq!(
            resolve_quality("1080P"),
            "bv[height<=1080]+ba/b[height<=1080]"
        );
        assert_eq!(
            resolve_quality("360p"),
            "bv[height<=360]+ba/b[height<=360]"
        );
    }

    #[test]
    fn test_resolve_quality_passes_raw_selector_through() {
        assert_eq!(resolve_quality(" 251 "), "251");
        assert_eq!(resolve_quality("bestaudio"), "bestaudio");
    }
}
