use rand::prelude::*;

use eg_walker::list::ListCRDT;
use eg_walker::list_fuzzer_tools::make_random_change;

/// A single replica's edits must behave exactly like splicing a plain vec.
#[test]
fn fuzz_single_replica_vs_vec() {
    for seed in 0..50 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut doc = ListCRDT::new(0);
        let mut reference: Vec<char> = vec![];

        for _ in 0..100 {
            make_random_change(&mut doc, Some(&mut reference), &mut rng);
            let expected: String = reference.iter().collect();
            assert_eq!(doc.content_string(), expected, "diverged on seed {seed}");
        }
        doc.check();
    }
}

/// Three replicas editing concurrently with random pairwise merges. After
/// each mutual merge the pair must agree, and the incrementally maintained
/// snapshots must keep matching a from-scratch checkout.
#[test]
fn fuzz_concurrent_merges() {
    for seed in 0..30 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut docs = [ListCRDT::new(0), ListCRDT::new(1), ListCRDT::new(2)];

        for i in 0..100 {
            for _ in 0..3 {
                let idx = rng.gen_range(0..docs.len());
                make_random_change(&mut docs[idx], None, &mut rng);
            }

            let a_idx = rng.gen_range(0..docs.len());
            let b_idx = rng.gen_range(0..docs.len());
            if a_idx == b_idx {
                continue;
            }

            let (a_idx, b_idx) = (a_idx.min(b_idx), a_idx.max(b_idx));
            let (left, right) = docs.split_at_mut(b_idx);
            let a = &mut left[a_idx];
            let b = &mut right[0];

            a.merge_from(b).unwrap();
            b.merge_from(a).unwrap();

            assert_eq!(
                a.content_string(),
                b.content_string(),
                "documents disagree at seed {seed}, iteration {i}"
            );
        }

        for doc in &docs {
            doc.check();
        }
    }
}
