//! Property-based tests for the graph containers.
//!
//! These verify invariants that should hold for any graph the builders
//! accept:
//! - incidence structure (one destination per arc, policy-correct weights)
//! - merge bookkeeping (counts, endpoint shifting, pooling attribution)
//! - persistence round-trips in both codecs

use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array1, Array2};
use proptest::prelude::*;
use zeolite_core::{AggregationMode, GraphObject, Problem, TextOptions};

fn build_graph(
    num_nodes: usize,
    arcs: &[(usize, usize)],
    feats: &[f32],
    mode: AggregationMode,
) -> GraphObject {
    let nodes = Array2::from_shape_fn((num_nodes, 1), |(i, _)| feats[i]);
    let arc_rows = Array2::from_shape_fn((arcs.len(), 3), |(i, j)| match j {
        0 => arcs[i].0 as f32,
        1 => arcs[i].1 as f32,
        _ => 1.0,
    });
    let targets = Array2::zeros((num_nodes, 1));
    GraphObject::builder(nodes, arc_rows, targets, Problem::Node)
        .aggregation(mode)
        .build()
        .expect("generated graphs are valid")
}

fn arb_parts() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, Vec<f32>)> {
    (1usize..8).prop_flat_map(|num_nodes| {
        (
            Just(num_nodes),
            proptest::collection::vec((0..num_nodes, 0..num_nodes), 1..12),
            proptest::collection::vec(-10.0f32..10.0, num_nodes),
        )
    })
}

mod incidence_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn every_arc_delivers_to_its_destination(
            (num_nodes, arcs, feats) in arb_parts(),
            mode in prop_oneof![
                Just(AggregationMode::Sum),
                Just(AggregationMode::Normalized),
                Just(AggregationMode::Average),
            ],
        ) {
            let g = build_graph(num_nodes, &arcs, &feats, mode);
            let an = g.arc_node();
            prop_assert_eq!(an.shape(), (arcs.len(), num_nodes));
            prop_assert_eq!(an.nnz(), arcs.len());
            for (i, (row, col)) in an.rows().iter().zip(an.cols()).enumerate() {
                prop_assert_eq!(*row, i, "one entry per arc, in arc order");
                prop_assert_eq!(*col, arcs[i].1, "entry sits at the destination column");
            }
        }

        #[test]
        fn average_weights_sum_to_one_per_destination(
            (num_nodes, arcs, feats) in arb_parts(),
        ) {
            let g = build_graph(num_nodes, &arcs, &feats, AggregationMode::Average);
            let mut in_degree = vec![0usize; num_nodes];
            for &(_, to) in &arcs {
                in_degree[to] += 1;
            }
            for (node, &sum) in g.arc_node().col_sums().iter().enumerate() {
                if in_degree[node] > 0 {
                    prop_assert!((sum - 1.0).abs() < 1.0e-5, "node {node} sums to {sum}");
                } else {
                    prop_assert_eq!(sum, 0.0);
                }
            }
        }

        #[test]
        fn normalized_weights_equal_inverse_arc_count(
            (num_nodes, arcs, feats) in arb_parts(),
        ) {
            let g = build_graph(num_nodes, &arcs, &feats, AggregationMode::Normalized);
            let expected = 1.0 / arcs.len() as f32;
            for &v in g.arc_node().data() {
                prop_assert_eq!(v, expected);
            }
        }
    }
}

mod merge_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn merge_concatenates_and_shifts(
            (n1, arcs1, feats1) in arb_parts(),
            (n2, arcs2, feats2) in arb_parts(),
        ) {
            let g1 = build_graph(n1, &arcs1, &feats1, AggregationMode::Sum);
            let g2 = build_graph(n2, &arcs2, &feats2, AggregationMode::Sum);
            let merged = GraphObject::merge(
                &[g1.copy(), g2.copy()],
                Problem::Node,
                AggregationMode::Sum,
            ).unwrap();

            prop_assert_eq!(merged.num_nodes(), n1 + n2);
            prop_assert_eq!(merged.num_arcs(), arcs1.len() + arcs2.len());
            // g1's arcs pass through unchanged.
            for (i, &(from, to)) in arcs1.iter().enumerate() {
                prop_assert_eq!(merged.arcs()[(i, 0)], from as f32);
                prop_assert_eq!(merged.arcs()[(i, 1)], to as f32);
            }
            // g2's endpoints shift by g1's node count.
            for (i, &(from, to)) in arcs2.iter().enumerate() {
                let row = arcs1.len() + i;
                prop_assert_eq!(merged.arcs()[(row, 0)], (from + n1) as f32);
                prop_assert_eq!(merged.arcs()[(row, 1)], (to + n1) as f32);
            }
        }
    }
}

mod persistence_props {
    use super::*;

    static CASE: AtomicUsize = AtomicUsize::new(0);

    fn case_dir(codec: &str) -> std::path::PathBuf {
        let case = CASE.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("zeolite_prop_{}_{codec}_{case}", std::process::id()))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn binary_save_load_round_trips(
            (num_nodes, arcs, feats) in arb_parts(),
            mask_bits in proptest::collection::vec(any::<bool>(), 8),
            weights in proptest::collection::vec(0.25f32..4.0, 8),
        ) {
            let g = GraphObject::builder(
                Array2::from_shape_fn((num_nodes, 1), |(i, _)| feats[i]),
                Array2::from_shape_fn((arcs.len(), 3), |(i, j)| match j {
                    0 => arcs[i].0 as f32,
                    1 => arcs[i].1 as f32,
                    _ => 1.0,
                }),
                Array2::zeros((num_nodes, 1)),
                Problem::Node,
            )
            .set_mask(mask_bits.iter().take(num_nodes).copied().collect())
            .sample_weights(Array1::from_iter(weights.iter().take(num_nodes).copied()))
            .build()
            .unwrap();

            let dir = case_dir("bin");
            g.save(&dir).unwrap();
            let loaded = GraphObject::load(&dir, Problem::Node, AggregationMode::Sum).unwrap();
            std::fs::remove_dir_all(&dir).unwrap();

            prop_assert_eq!(loaded.nodes(), g.nodes());
            prop_assert_eq!(loaded.arcs(), g.arcs());
            prop_assert_eq!(loaded.targets(), g.targets());
            prop_assert_eq!(loaded.set_mask(), g.set_mask());
            prop_assert_eq!(loaded.output_mask(), g.output_mask());
            prop_assert_eq!(loaded.sample_weights(), g.sample_weights());
        }

        #[test]
        fn text_save_load_round_trips(
            (num_nodes, arcs, feats) in arb_parts(),
        ) {
            let g = build_graph(num_nodes, &arcs, &feats, AggregationMode::Average);
            let dir = case_dir("txt");
            g.save_txt(&dir, &TextOptions::default()).unwrap();
            let loaded =
                GraphObject::load_txt(&dir, Problem::Node, AggregationMode::Average).unwrap();
            std::fs::remove_dir_all(&dir).unwrap();

            prop_assert_eq!(loaded.nodes(), g.nodes());
            prop_assert_eq!(loaded.arcs(), g.arcs());
            prop_assert_eq!(loaded.arc_node(), g.arc_node());
        }
    }
}
