//! `${root}` placeholder resolution (§4.1, §6). Applied to every string
//! field of BuildConfig that contains the literal, including the values of
//! `osWimMap`.

use super::model::BuildConfig;
use std::path::{Path, PathBuf};

const PLACEHOLDER: &str = "${root}";

/// Substitutes `${root}`, normalizes separators to the host convention, and
/// -- for strings that now look like an absolute path (drive-letter or UNC
/// on Windows, or a leading `/` elsewhere) -- canonicalizes when the target
/// exists, otherwise keeps the computed absolute form (outputs are allowed
/// to name not-yet-created paths).
pub fn resolve_field(value: &str, root: &Path) -> String {
    if !value.contains(PLACEHOLDER) {
        return value.to_string();
    }

    let substituted = value.replace(PLACEHOLDER, &root.to_string_lossy());
    let normalized = normalize_separators(&substituted);

    if looks_absolute(&normalized) {
        let candidate = PathBuf::from(&normalized);
        if let Ok(canonical) = candidate.canonicalize() {
            return canonical.to_string_lossy().into_owned();
        }
        return normalized;
    }

    normalized
}

fn normalize_separators(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '\\' {
        path.replace('/', "\\")
    } else {
        path.replace('\\', "/")
    }
}

fn looks_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    let drive_letter = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    let unc = path.starts_with("\\\\") || path.starts_with("//");
    let unix_absolute = path.starts_with('/');
    drive_letter || unc || unix_absolute
}

/// Applies [`resolve_field`] to every path-bearing field of `config`, in
/// place.
pub fn resolve_build_config(config: &mut BuildConfig, root: &Path) {
    config.mount_point = resolve_field(&config.mount_point, root);
    config.export_path = resolve_field(&config.export_path, root);
    config.temp_path = resolve_field(&config.temp_path, root);
    config.driver_root = resolve_field(&config.driver_root, root);
    config.update_root = resolve_field(&config.update_root, root);
    config.yunona_path = resolve_field(&config.yunona_path, root);
    for value in config.os_wim_map.values_mut() {
        *value = resolve_field(value, root);
    }
    if let Some(source_wim) = &mut config.source_wim {
        *source_wim = resolve_field(source_wim, root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_and_normalizes() {
        let root = Path::new("/engine/root");
        let resolved = resolve_field("${root}/Mount", root);
        assert!(!resolved.contains("${root}"));
        assert!(resolved.ends_with("Mount"));
    }

    #[test]
    fn leaves_fields_without_placeholder_untouched() {
        let root = Path::new("/engine/root");
        assert_eq!(resolve_field("C:/images/w10.wim", root), "C:/images/w10.wim");
    }

    #[test]
    fn missing_target_keeps_computed_absolute_path() {
        let root = Path::new("/engine/root/does-not-exist");
        let resolved = resolve_field("${root}/Sub/Dir", root);
        assert!(resolved.contains("Sub"));
        assert!(resolved.contains("Dir"));
    }
}
