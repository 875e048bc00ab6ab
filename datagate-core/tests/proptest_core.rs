//! Property-based tests for validation checks, statistics and CSV storage.

use proptest::prelude::*;

use datagate_core::stats::{chi2_contingency, ks_2samp};
use datagate_core::validate::{validate_duplicates, validate_missing_values};
use datagate_core::{Column, CsvStore, Dataset, DriftDetector, Value};
use std::path::Path;

// --- Missing-value threshold properties ---

proptest! {
    #[test]
    fn missing_check_passes_iff_fraction_within_threshold(
        rows in 1usize..200,
        nulls_pct in 0usize..=100,
        threshold in 0.0f64..=1.0,
    ) {
        let nulls = rows * nulls_pct / 100;
        let values = (0..rows).map(|i| if i < nulls { Value::Null } else { Value::Integer(i as i64) });
        let ds = Dataset::new(vec![Column::new("x", values)]).unwrap();

        let verdict = validate_missing_values(&ds, threshold);
        let fraction = nulls as f64 / rows as f64;
        prop_assert_eq!(verdict.passed, fraction <= threshold);
        prop_assert_eq!(verdict.diagnostics.is_empty(), verdict.passed);
    }

    #[test]
    fn zero_threshold_rejects_any_null(rows in 2usize..100, at in 0usize..100) {
        let at = at % rows;
        let values = (0..rows).map(|i| if i == at { Value::Null } else { Value::Float(i as f64) });
        let ds = Dataset::new(vec![Column::new("x", values)]).unwrap();
        prop_assert!(!validate_missing_values(&ds, 0.0).passed);
        prop_assert!(validate_missing_values(&ds, 1.0).passed);
    }
}

// --- Duplicate detection properties ---

proptest! {
    #[test]
    fn distinct_rows_never_duplicate(values in prop::collection::hash_set(any::<i64>(), 1..100)) {
        let ds = Dataset::new(vec![Column::new("id", values)]).unwrap();
        prop_assert!(validate_duplicates(&ds).passed);
    }

    #[test]
    fn repeated_row_is_always_detected(
        values in prop::collection::hash_set(any::<i64>(), 1..100),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut ids: Vec<i64> = values.into_iter().collect();
        let repeated = ids[pick.index(ids.len())];
        ids.push(repeated);
        let ds = Dataset::new(vec![Column::new("id", ids)]).unwrap();

        let verdict = validate_duplicates(&ds);
        prop_assert!(!verdict.passed);
        prop_assert_eq!(&verdict.diagnostics[0].message, "Data has 1 duplicate rows");
    }
}

// --- Statistic bounds ---

proptest! {
    #[test]
    fn ks_outputs_are_bounded_and_symmetric(
        a in prop::collection::vec(-1e6f64..1e6, 1..80),
        b in prop::collection::vec(-1e6f64..1e6, 1..80),
    ) {
        let ab = ks_2samp(&a, &b).unwrap();
        let ba = ks_2samp(&b, &a).unwrap();
        prop_assert!((0.0..=1.0).contains(&ab.statistic));
        prop_assert!((0.0..=1.0).contains(&ab.p_value));
        prop_assert!((ab.statistic - ba.statistic).abs() < 1e-12);
        prop_assert!((ab.p_value - ba.p_value).abs() < 1e-12);
    }

    #[test]
    fn chi_square_p_value_is_a_probability(
        counts in prop::collection::vec((1u32..500, 1u32..500), 1..12),
    ) {
        let (first, second): (Vec<f64>, Vec<f64>) =
            counts.iter().map(|(a, b)| (*a as f64, *b as f64)).unzip();
        let result = chi2_contingency(&first, &second).unwrap();
        prop_assert!(result.statistic >= 0.0);
        prop_assert!((0.0..=1.0).contains(&result.p_value));
        prop_assert_eq!(result.dof, counts.len() - 1);
    }

    #[test]
    fn drift_flag_matches_drifted_columns(
        base in prop::collection::vec(0i64..50, 5..60),
        cand in prop::collection::vec(0i64..50, 5..60),
        threshold in 0.0f64..0.5,
    ) {
        let base = Dataset::new(vec![Column::new("n", base)]).unwrap();
        let cand = Dataset::new(vec![Column::new("n", cand)]).unwrap();
        let report = DriftDetector::new(threshold).compare(&base, &cand).unwrap();

        let col = report.get("n").unwrap();
        prop_assert_eq!(col.drift_status, col.p_value < threshold);
        prop_assert_eq!(report.no_drift(), report.drifted_columns().is_empty());
    }
}

// --- CSV storage ---

proptest! {
    #[test]
    fn csv_render_then_parse_preserves_dataset(
        rows in prop::collection::vec(
            (any::<i64>(), -1e9f64..1e9, "v_[a-z ,\"]{0,6}", any::<bool>()),
            1..40,
        ),
    ) {
        let ds = Dataset::new(vec![
            Column::new("i", rows.iter().map(|r| r.0)),
            Column::new("f", rows.iter().map(|r| r.1)),
            Column::new("s", rows.iter().map(|r| r.2.trim_end().to_string())),
            Column::new("b", rows.iter().map(|r| r.3)),
        ])
        .unwrap();

        let store = CsvStore::default();
        let parsed = store.parse(&store.render(&ds), Path::new("mem.csv")).unwrap();
        prop_assert_eq!(parsed, ds);
    }
}
