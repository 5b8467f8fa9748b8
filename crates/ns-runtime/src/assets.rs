use std::sync::OnceLock;

use ns_core::AssetRecord;
use regex::Regex;

fn extension_regex() -> &'static Regex {
    static EXTENSION: OnceLock<Regex> = OnceLock::new();
    EXTENSION.get_or_init(|| Regex::new(r"\.[^/.]+$").expect("extension regex must compile"))
}

fn non_alphanumeric_regex() -> &'static Regex {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]").expect("key regex must compile"))
}

/// Lookup key normalization: drop a trailing `.extension`, lower-case, and
/// map every remaining non-alphanumeric character to `_`.
pub fn normalize_key(key: &str) -> String {
    let stripped = extension_regex().replace(key, "");
    let lowered = stripped.to_lowercase();
    non_alphanumeric_regex()
        .replace_all(&lowered, "_")
        .into_owned()
}

/// Resolves `key` against the asset list, trying exact id, normalized id,
/// exact name, exact path, normalized name, then normalized path.
pub fn find_asset<'a>(assets: &'a [AssetRecord], key: &str) -> Option<&'a AssetRecord> {
    let normalized = normalize_key(key);
    let exact = |field: fn(&AssetRecord) -> Option<&String>| {
        assets
            .iter()
            .find(|asset| field(asset).is_some_and(|value| value == key))
    };
    let fuzzy = |field: fn(&AssetRecord) -> Option<&String>| {
        assets
            .iter()
            .find(|asset| field(asset).is_some_and(|value| normalize_key(value) == normalized))
    };

    exact(|asset| asset.id.as_ref())
        .or_else(|| fuzzy(|asset| asset.id.as_ref()))
        .or_else(|| exact(|asset| asset.name.as_ref()))
        .or_else(|| exact(|asset| asset.path.as_ref()))
        .or_else(|| fuzzy(|asset| asset.name.as_ref()))
        .or_else(|| fuzzy(|asset| asset.path.as_ref()))
}

/// The reference a host should load for an asset: inline data first, then url, src, path.
pub fn asset_source(asset: &AssetRecord) -> Option<&str> {
    asset
        .data
        .as_deref()
        .or(asset.url.as_deref())
        .or(asset.src.as_deref())
        .or(asset.path.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: Option<&str>, name: Option<&str>, path: Option<&str>) -> AssetRecord {
        AssetRecord {
            id: id.map(ToString::to_string),
            name: name.map(ToString::to_string),
            path: path.map(ToString::to_string),
            url: Some(format!("url:{}", id.or(name).or(path).unwrap_or("?"))),
            ..AssetRecord::default()
        }
    }

    #[test]
    fn normalize_key_strips_extension_and_symbols() {
        assert_eq!(normalize_key("Hero.PNG"), "hero");
        assert_eq!(normalize_key(""), "");
        assert_eq!(normalize_key("Town Square-Night.jpg"), "town_square_night");
        assert_eq!(normalize_key("bg/forest.v2.webp"), "bg_forest_v2");
        assert_eq!(normalize_key("no_extension"), "no_extension");
    }

    #[test]
    fn find_asset_prefers_exact_id_over_normalized_matches() {
        let assets = vec![
            asset(Some("hero_png"), None, None),
            asset(Some("Hero.png"), None, None),
        ];
        let found = find_asset(&assets, "Hero.png").expect("asset");
        assert_eq!(found.id.as_deref(), Some("Hero.png"));
    }

    #[test]
    fn find_asset_follows_lookup_order() {
        let assets = vec![
            asset(None, None, Some("images/hero.png")),
            asset(None, Some("hero"), None),
            asset(Some("villain"), None, None),
        ];

        let by_normalized_id = find_asset(&assets, "Villain.PNG").expect("normalized id");
        assert_eq!(by_normalized_id.id.as_deref(), Some("villain"));

        let by_name = find_asset(&assets, "hero").expect("exact name");
        assert_eq!(by_name.name.as_deref(), Some("hero"));

        let by_path = find_asset(&assets, "images/hero.png").expect("exact path");
        assert_eq!(by_path.path.as_deref(), Some("images/hero.png"));

        let by_normalized_path = find_asset(&assets, "Images/Hero.jpg").expect("normalized path");
        assert_eq!(by_normalized_path.path.as_deref(), Some("images/hero.png"));

        assert!(find_asset(&assets, "nobody").is_none());
    }

    #[test]
    fn asset_source_prefers_inline_data() {
        let mut record = asset(Some("a"), None, Some("a.png"));
        assert_eq!(asset_source(&record), Some("url:a"));
        record.data = Some("data:image/png;base64,AAAA".to_string());
        assert_eq!(asset_source(&record), Some("data:image/png;base64,AAAA"));
        record.data = None;
        record.url = None;
        assert_eq!(asset_source(&record), Some("a.png"));
    }
}
