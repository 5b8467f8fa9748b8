use std::collections::BTreeMap;

use ns_core::NsValue;

pub(crate) const PATH_SEPARATOR: char = '.';

pub(crate) fn parse_ref_path(path: &str) -> Vec<String> {
    path.split(PATH_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub(crate) fn read_nested_path<'a>(target: &'a NsValue, path: &[String]) -> Option<&'a NsValue> {
    let mut current = target;
    for segment in path {
        current = match current {
            NsValue::Map(entries) => entries.get(segment)?,
            NsValue::Array(values) => values.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` at `path`, turning the target and every missing or
/// non-map intermediate into a map.
pub(crate) fn assign_nested_path(target: &mut NsValue, path: &[String], value: NsValue) {
    let Some((head, rest)) = path.split_first() else {
        *target = value;
        return;
    };

    if !matches!(target, NsValue::Map(_)) {
        *target = NsValue::Map(BTreeMap::new());
    }
    let NsValue::Map(entries) = target else {
        return;
    };

    if rest.is_empty() {
        entries.insert(head.clone(), value);
        return;
    }

    let next = entries
        .entry(head.clone())
        .or_insert_with(|| NsValue::Map(BTreeMap::new()));
    assign_nested_path(next, rest, value);
}

/// Adds `delta` to the number at `path`; a missing or non-numeric leaf counts as 0.
pub(crate) fn add_at_nested_path(target: &mut NsValue, path: &[String], delta: f64) -> f64 {
    let current = read_nested_path(target, path)
        .and_then(NsValue::as_number)
        .unwrap_or(0.0);
    let next = current + delta;
    assign_nested_path(target, path, NsValue::Number(next));
    next
}

#[cfg(test)]
mod value_path_tests {
    use super::*;

    fn path(raw: &str) -> Vec<String> {
        parse_ref_path(raw)
    }

    #[test]
    fn parse_ref_path_skips_empty_segments() {
        assert_eq!(path(" player . stats..hp "), vec!["player", "stats", "hp"]);
        assert!(path("").is_empty());
    }

    #[test]
    fn read_nested_path_walks_maps_and_list_indices() {
        let value = NsValue::Map(BTreeMap::from([(
            "bag".to_string(),
            NsValue::Array(vec![NsValue::String("rope".to_string())]),
        )]));
        assert_eq!(
            read_nested_path(&value, &path("bag.0")),
            Some(&NsValue::String("rope".to_string()))
        );
        assert!(read_nested_path(&value, &path("bag.1")).is_none());
        assert!(read_nested_path(&value, &path("bag.x")).is_none());
        assert!(read_nested_path(&value, &path("missing.deep")).is_none());
    }

    #[test]
    fn assign_nested_path_creates_intermediate_maps() {
        let mut value = NsValue::Bool(false);
        assign_nested_path(&mut value, &path("stats.hp"), NsValue::Number(3.0));
        assert_eq!(
            read_nested_path(&value, &path("stats.hp")),
            Some(&NsValue::Number(3.0))
        );

        assign_nested_path(&mut value, &path("stats.hp.max"), NsValue::Number(9.0));
        assert_eq!(
            read_nested_path(&value, &path("stats.hp.max")),
            Some(&NsValue::Number(9.0))
        );
    }

    #[test]
    fn add_at_nested_path_defaults_non_numeric_leaf_to_zero() {
        let mut value = NsValue::Map(BTreeMap::from([(
            "level".to_string(),
            NsValue::String("high".to_string()),
        )]));
        assert_eq!(add_at_nested_path(&mut value, &path("level"), 2.0), 2.0);
        assert_eq!(add_at_nested_path(&mut value, &path("level"), 3.0), 5.0);
    }
}
