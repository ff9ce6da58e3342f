//! Load `.trackcollate.toml` from the source directory (CLI only). Lib callers pass [`CollateOpts`] directly.

use serde::Deserialize;
use std::path::Path;

use crate::CollateOpts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Deserialize)]
pub(crate) struct TrackCollateToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    workers: Option<usize>,
    max_store_size_mb: Option<u64>,
    verbose: Option<bool>,
    restart_collect: Option<bool>,
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable.
pub(crate) fn load_trackcollate_toml(dir: &Path) -> Option<TrackCollateToml> {
    let path = dir.join(PackagePaths::get().toml_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $field:ident => $opts_field:ident) => {
        if let Some(v) = $section.$field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &TrackCollateToml, opts: &mut CollateOpts) {
    let s = &file.settings;
    if let Some(n) = s.workers {
        opts.num_workers = Some(n);
    }
    apply_file_opt!(s, opts, max_store_size_mb => max_store_size_mb);
    apply_file_opt!(s, opts, verbose => verbose);
    apply_file_opt!(s, opts, restart_collect => restart_collect);
}
