//! Application configuration loading for CLI defaults.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// `key = value` file configuration for downloader defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Directory downloads are written to.
    pub download_dir: Option<PathBuf>,
    /// Downloader executable.
    pub ytdlp_path: Option<String>,
    /// ffmpeg executable handed to the downloader.
    pub ffmpeg_path: Option<String>,
    /// Merge/remux container for video downloads.
    pub video_format: Option<String>,
    /// Extraction format for audio downloads.
    pub audio_format: Option<String>,
    /// Browser to read cookies from.
    pub cookies_browser: Option<String>,
    /// Netscape cookie file.
    pub cookies_file: Option<String>,
    /// Quality preset or raw format selector.
    pub default_quality: Option<String>,
    pub embed_subtitles: Option<bool>,
    pub embed_metadata: Option<bool>,
    pub embed_chapters: Option<bool>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        validate_extension("video_format", self.video_format.as_deref())?;
        validate_extension("audio_format", self.audio_format.as_deref())?;
        if let Some(browser) = &self.cookies_browser
            && browser.trim().is_empty()
        {
            bail!("Invalid config value for `cookies_browser`: expected a browser name");
        }
        Ok(())
    }
}

fn validate_extension(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!(
            "Invalid config value for `{field}`: '{value}'. Expected a file extension such as mp4"
        );
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/dlqueue/config.toml`
/// 2. `$HOME/.config/dlqueue/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("dlqueue")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("dlqueue")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let home = env_var_non_empty_os("HOME").map(PathBuf::from);
    parse_config_str(&raw, home.as_deref())
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str, home: Option<&Path>) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let string = || {
            parse_string_literal(value)
                .with_context(|| format!("Invalid `{key}` value on line {line_no}"))
        };
        let boolean = || {
            parse_boolean(value).with_context(|| format!("Invalid `{key}` value on line {line_no}"))
        };

        match key {
            "download_dir" => cfg.download_dir = Some(expand_home(&string()?, home)),
            "ytdlp_path" => cfg.ytdlp_path = Some(expand_home_str(&string()?, home)),
            "ffmpeg_path" => cfg.ffmpeg_path = Some(expand_home_str(&string()?, home)),
            "video_format" => cfg.video_format = Some(string()?),
            "audio_format" => cfg.audio_format = Some(string()?),
            "cookies_browser" => cfg.cookies_browser = Some(string()?),
            "cookies_file" => cfg.cookies_file = Some(expand_home_str(&string()?, home)),
            "default_quality" => cfg.default_quality = Some(string()?),
            "embed_subtitles" => cfg.embed_subtitles = Some(boolean()?),
            "embed_metadata" => cfg.embed_metadata = Some(boolean()?),
            "embed_chapters" => cfg.embed_chapters = Some(boolean()?),
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Expands a leading `~/` against `home`.
pub(crate) fn expand_home(value: &str, home: Option<&Path>) -> PathBuf {
    match (value.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if value == "~" => home.map_or_else(|| PathBuf::from(value), Path::to_path_buf),
        _ => PathBuf::from(value),
    }
}

fn expand_home_str(value: &str, home: Option<&Path>) -> String {
    expand_home(value, home).to_string_lossy().into_owned()
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
