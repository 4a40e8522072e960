use crate::types::{Dataset, School};
use std::collections::BTreeSet;

/// Every region code present, ascending by ordinal string order.
/// The first entry is the default selection.
pub fn distinct_regions(dataset: &Dataset) -> Vec<String> {
    dataset.schools().iter()
        .map(|s| s.region_code.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn by_region<'a>(dataset: &'a Dataset, code: &str) -> Vec<&'a School> {
    dataset.schools().iter()
        .filter(|s| s.region_code == code)
        .collect()
}

/// Case-insensitive substring match on the school name. An empty query matches nothing.
pub fn search<'a>(dataset: &'a Dataset, query: &str) -> Vec<&'a School> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    dataset.schools().iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn school(name: &str, region: &str, lat: f64, lon: f64) -> School {
        School {
            lot: "1".to_string(),
            region_code: region.to_string(),
            municipality: "Municipio".to_string(),
            inep_code: format!("INEP-{name}"),
            name: name.to_string(),
            address: format!("Rua {name}"),
            latitude: lat,
            longitude: lon,
            estimated_wifi_kits: "2".to_string(),
            estimated_additional_aps: "1".to_string(),
            has_backup_power: "Sim".to_string(),
        }
    }

    pub(crate) fn sample() -> Dataset {
        Dataset::new(vec![
            school("Escola Municipal Centro", "SP", -23.5, -46.6),
            school("Colégio Estadual", "RJ", -22.9, -43.2),
            school("Escola Rural", "MG", -19.9, -43.9),
            school("CENTRO EDUCACIONAL", "SP", -23.0, -47.0),
            school("Escola do Morro", "RJ", -22.8, -43.1),
        ], 0)
    }

    #[test]
    fn regions_are_sorted_and_unique() {
        assert_eq!(distinct_regions(&sample()), ["MG", "RJ", "SP"]);
    }

    #[test]
    fn regions_use_ordinal_order() {
        let ds = Dataset::new(vec![
            school("a", "sp", 0.0, 0.0),
            school("b", "SP", 0.0, 0.0),
            school("c", "AC", 0.0, 0.0),
        ], 0);
        assert_eq!(distinct_regions(&ds), ["AC", "SP", "sp"]);
    }

    #[test]
    fn regions_of_empty_dataset() {
        assert!(distinct_regions(&Dataset::default()).is_empty());
    }

    #[test]
    fn by_region_is_sound_and_complete() {
        let ds = sample();
        for code in distinct_regions(&ds) {
            let found = by_region(&ds, &code);
            assert!(found.iter().all(|s| s.region_code == code));
            let expected = ds.schools().iter().filter(|s| s.region_code == code).count();
            assert_eq!(found.len(), expected);
        }
    }

    #[test]
    fn by_region_keeps_dataset_order() {
        let ds = sample();
        let names: Vec<_> = by_region(&ds, "RJ").iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Colégio Estadual", "Escola do Morro"]);
    }

    #[test]
    fn unknown_region_is_empty() {
        assert!(by_region(&sample(), "XX").is_empty());
    }

    #[test]
    fn search_ignores_case() {
        let ds = sample();
        let names: Vec<_> = search(&ds, "centro").iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Escola Municipal Centro", "CENTRO EDUCACIONAL"]);
    }

    #[test]
    fn search_folds_non_ascii_letters() {
        let ds = sample();
        assert_eq!(search(&ds, "COLÉGIO").len(), 1);
    }

    #[test]
    fn search_without_match_is_empty() {
        assert!(search(&sample(), "zzz").is_empty());
    }

    #[test]
    fn empty_query_matches_nothing() {
        assert!(search(&sample(), "").is_empty());
    }

    #[test]
    fn search_is_literal_not_a_pattern() {
        let ds = Dataset::new(vec![school("E.M. Alfa", "SP", 0.0, 0.0), school("EXM Beta", "SP", 0.0, 0.0)], 0);
        let names: Vec<_> = search(&ds, "e.m").iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["E.M. Alfa"]);
    }
}
