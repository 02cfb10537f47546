//! User settings: `settings.toml` and the `prelude.rhai` macro, both in the
//! platform config directory.
//!
//! Problems never abort startup; they come back as warnings.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use gridmacro_core::document::{DEFAULT_COLS, DEFAULT_ROWS, MAX_EXTENT};
use serde::Deserialize;

const SETTINGS_FILE: &str = "settings.toml";
const PRELUDE_FILE: &str = "prelude.rhai";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Initial row count
    pub rows: usize,
    /// Initial column count
    pub cols: usize,
    /// Macro applied at startup; defaults to `prelude.rhai` beside the settings
    pub prelude: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            prelude: None,
        }
    }
}

impl Settings {
    /// The prelude to run, if one exists.
    pub fn prelude_path(&self) -> Option<PathBuf> {
        let path = match &self.prelude {
            Some(path) => path.clone(),
            None => config_dir()?.join(PRELUDE_FILE),
        };
        path.exists().then_some(path)
    }

    fn clamp_extent(&mut self, warnings: &mut Vec<String>) {
        let valid = 1..=MAX_EXTENT;
        if !valid.contains(&self.rows) || !valid.contains(&self.cols) {
            warnings.push(format!(
                "Ignoring grid size {}x{}: must be between 1x1 and {}x{}",
                self.rows, self.cols, MAX_EXTENT, MAX_EXTENT
            ));
            self.rows = DEFAULT_ROWS;
            self.cols = DEFAULT_COLS;
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "gridmacro")?;
    Some(proj.config_dir().to_path_buf())
}

/// Parse settings text; on error the defaults are returned with a warning.
pub fn parse_settings(content: &str, origin: &Path) -> (Settings, Vec<String>) {
    let mut warnings = Vec::new();
    let mut settings = match toml::from_str::<Settings>(content) {
        Ok(parsed) => parsed,
        Err(err) => {
            warnings.push(format!("Failed to parse {}: {}", origin.display(), err));
            Settings::default()
        }
    };
    settings.clamp_extent(&mut warnings);
    (settings, warnings)
}

/// Load settings from `explicit`, or from the config directory.
///
/// A missing default file is not worth a warning; a missing explicit one is.
pub fn load_settings(explicit: Option<&Path>) -> (Settings, Vec<String>) {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| config_dir().map(|dir| dir.join(SETTINGS_FILE)));
    let Some(path) = path else {
        return (Settings::default(), Vec::new());
    };

    if !path.exists() {
        let warnings = if explicit.is_some() {
            vec![format!("Settings file not found: {}", path.display())]
        } else {
            Vec::new()
        };
        return (Settings::default(), warnings);
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_settings(&content, &path),
        Err(err) => (
            Settings::default(),
            vec![format!("Failed to read {}: {}", path.display(), err)],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> (Settings, Vec<String>) {
        parse_settings(content, Path::new("settings.toml"))
    }

    #[test]
    fn test_empty_is_default() {
        let (settings, warnings) = parse("");
        assert_eq!(settings, Settings::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_fields() {
        let (settings, warnings) = parse("rows = 20\ncols = 5\nprelude = \"/tmp/p.rhai\"\n");
        assert!(warnings.is_empty());
        assert_eq!((settings.rows, settings.cols), (20, 5));
        assert_eq!(settings.prelude, Some(PathBuf::from("/tmp/p.rhai")));
    }

    #[test]
    fn test_unknown_key_warns() {
        let (settings, warnings) = parse("colour = \"red\"\n");
        assert_eq!(settings, Settings::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Failed to parse settings.toml"));
    }

    #[test]
    fn test_out_of_range_extent_warns() {
        let (settings, warnings) = parse("rows = 0\n");
        assert_eq!((settings.rows, settings.cols), (DEFAULT_ROWS, DEFAULT_COLS));
        assert_eq!(warnings.len(), 1);

        let (_, warnings) = parse(&format!("cols = {}\n", MAX_EXTENT + 1));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_missing_explicit_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let (settings, warnings) = load_settings(Some(&path));
        assert_eq!(settings, Settings::default());
        assert!(warnings[0].starts_with("Settings file not found"));
    }

    #[test]
    fn test_explicit_prelude_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let prelude = dir.path().join("p.rhai");
        let settings = Settings {
            prelude: Some(prelude.clone()),
            ..Settings::default()
        };
        assert_eq!(settings.prelude_path(), None);
        std::fs::write(&prelude, "fn one() { 1 }").unwrap();
        assert_eq!(settings.prelude_path(), Some(prelude));
    }
}
