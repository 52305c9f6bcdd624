//! Property tests over random allocate / free / resize sequences.

use carve_heap::{BlockInfo, FitStrategy, Heap, HeapConfig, HeapError};
use carve_test_utils::{assert_invariants, LiveModel};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Step {
    Allocate(u64),
    Free(usize),
    Resize(usize, u64),
    Strategy(FitStrategy),
}

fn fit_strategy() -> impl Strategy<Value = FitStrategy> {
    prop_oneof![
        Just(FitStrategy::FirstFit),
        Just(FitStrategy::BestFit),
        Just(FitStrategy::WorstFit),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (1u64..512).prop_map(Step::Allocate),
        3 => any::<usize>().prop_map(Step::Free),
        2 => (any::<usize>(), 1u64..768).prop_map(|(i, n)| Step::Resize(i, n)),
        1 => fit_strategy().prop_map(Step::Strategy),
    ]
}

fn heap(total: usize, strategy: FitStrategy, min_split: u64) -> Heap<Vec<u8>> {
    let config = HeapConfig::new()
        .with_strategy(strategy)
        .with_min_split_payload(min_split);
    Heap::init(vec![0u8; total], config).unwrap()
}

proptest! {
    #[test]
    fn invariants_hold_across_random_sequences(
        strategy in fit_strategy(),
        min_split in prop_oneof![Just(0u64), Just(8), Just(64)],
        steps in prop::collection::vec(step(), 1..120),
    ) {
        let mut heap = heap(8192, strategy, min_split);
        let mut model = LiveModel::new();

        for step in steps {
            match step {
                Step::Allocate(n) => match model.allocate(&mut heap, n) {
                    Ok(_) | Err(HeapError::CapacityExhausted { .. }) => {}
                    Err(e) => return Err(TestCaseError::fail(e.to_string())),
                },
                Step::Free(i) => {
                    if let Some(ptr) = model.pick(i) {
                        model.free(&mut heap, ptr).unwrap();
                    }
                }
                Step::Resize(i, n) => {
                    if let Some(ptr) = model.pick(i) {
                        match model.resize(&mut heap, ptr, n) {
                            Ok(_) | Err(HeapError::CapacityExhausted { .. }) => {}
                            Err(e) => return Err(TestCaseError::fail(e.to_string())),
                        }
                    }
                }
                Step::Strategy(s) => heap.set_strategy(s),
            }
            let stats = assert_invariants(&heap);
            prop_assert_eq!(stats.occupied_blocks, model.len());
            model.verify(&heap);
        }

        model.drain(&mut heap).unwrap();
        prop_assert_eq!(
            heap.blocks().collect::<Vec<_>>(),
            vec![BlockInfo::free(24, 8192 - 40)]
        );
    }

    #[test]
    fn allocate_then_free_restores_the_layout(
        strategy in fit_strategy(),
        prefix in prop::collection::vec(1u64..400, 0..12),
        holes in prop::collection::vec(any::<bool>(), 12),
        request in 1u64..600,
    ) {
        let mut heap = heap(8192, strategy, 8);
        let ptrs: Vec<_> = prefix.iter().filter_map(|&n| heap.allocate(n).ok()).collect();
        for (ptr, _) in ptrs.iter().zip(&holes).filter(|(_, hole)| **hole) {
            heap.free(*ptr).unwrap();
        }
        let before: Vec<_> = heap.blocks().collect();

        if let Ok(ptr) = heap.allocate(request) {
            heap.free(ptr).unwrap();
        }
        prop_assert_eq!(heap.blocks().collect::<Vec<_>>(), before);
    }

    #[test]
    fn attach_sees_the_same_arena(
        sizes in prop::collection::vec(1u64..300, 1..16),
    ) {
        let mut heap = heap(4096, FitStrategy::BestFit, 8);
        for n in sizes {
            let _ = heap.allocate(n);
        }
        let before: Vec<_> = heap.blocks().collect();
        let stats = heap.stats();

        let reopened = Heap::attach(heap.into_inner(), HeapConfig::default()).unwrap();
        prop_assert_eq!(reopened.strategy(), FitStrategy::BestFit);
        prop_assert_eq!(reopened.blocks().collect::<Vec<_>>(), before);
        prop_assert_eq!(reopened.stats(), stats);
    }
}
