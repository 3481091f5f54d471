
use rand::prelude::*;
use rand::rngs::StdRng;

use super::*;
use crate::error::ProtocolError;

/// A tag that never matches: computed tags are narrower than 16 bits.
const NEVER_TAG: u16 = 0xffff;

/// A small predictor where every table has 16 entries.
fn tiny() -> TageConfig {
    let mut cfg = TageConfig::new(TageBaseConfig {
        ctr: CounterConfig::UNSIGNED_2BIT,
        index_bits: 4,
    }, 16);
    for len in [2, 4, 8] {
        cfg.add_component(TageComponentConfig::new(len, 4, 8,
            CounterConfig::SIGNED_3BIT));
    }
    cfg.aging_period_log2 = 4;
    cfg
}

/// Make sure that no tagged entry can hit.
fn isolate(tage: &mut TagePredictor) {
    for comp in tage.comp.iter_mut() {
        for entry in comp.data.iter_mut() {
            entry.tag = NEVER_TAG;
        }
    }
}

/// Drive a counter to the given value.
fn drive(ctr: &mut SaturatingCounter, val: i8) {
    while ctr.value() < val { ctr.increment(); }
    while ctr.value() > val { ctr.decrement(); }
    assert_eq!(ctr.value(), val);
}

/// Build a predictor where 'pc' hits in the given components, with the
/// given counter values.
fn with_hits(pc: usize, hits: &[(usize, i8)]) -> TagePredictor {
    let mut tage = tiny().build().unwrap();
    isolate(&mut tage);
    for (id, ctr) in hits {
        let comp = &mut tage.comp[*id];
        let idx = comp.get_index(pc);
        let tag = comp.get_tag(pc);
        let entry = comp.get_entry_mut(idx);
        entry.tag = tag;
        drive(&mut entry.ctr, *ctr);
    }
    tage
}

/// (tag, useful, counter) for every tagged entry.
fn snapshot(tage: &TagePredictor) -> Vec<Vec<(u16, u8, i8)>> {
    tage.comp.iter().map(|comp| {
        comp.data.iter().map(|e| (e.tag, e.useful, e.ctr.value())).collect()
    }).collect()
}

/// Run a repeating pattern of outcomes for a single branch, returning
/// the outcome of each prediction.
fn run_pattern(tage: &mut TagePredictor, pc: usize, pattern: &[Outcome],
    iters: usize) -> Vec<bool>
{
    let mut hits = Vec::new();
    for i in 0..iters {
        let outcome = pattern[i % pattern.len()];
        let p = tage.predict(pc, true);
        hits.push(p.outcome == outcome);
        tage.update(p, outcome, 0);
    }
    hits
}

#[test]
fn deterministic() {
    let mut rng = StdRng::seed_from_u64(1234);
    let pcs: Vec<usize> = (0..64).map(|_| rng.gen::<u32>() as usize).collect();
    let stream: Vec<(usize, Outcome)> = (0..20_000).map(|_| {
        let pc = pcs[rng.gen_range(0..pcs.len())];
        (pc, Outcome::from(rng.gen_bool(0.7)))
    }).collect();

    let mut a = TageConfig::small().build().unwrap();
    let mut b = TageConfig::small().build().unwrap();
    for (pc, outcome) in stream {
        let pa = a.predict(pc, true);
        let pb = b.predict(pc, true);
        assert_eq!(pa.outcome, pb.outcome);
        assert_eq!(pa.provider, pb.provider);
        assert_eq!(pa.alt_provider, pb.alt_provider);
        assert_eq!(pa.used_alt, pb.used_alt);
        assert_eq!(pa.lookups, pb.lookups);
        a.update(pa, outcome, 0);
        b.update(pb, outcome, 0);
    }
    assert_eq!(snapshot(&a), snapshot(&b));
}

#[test]
fn cold_start_is_weakly_not_taken() {
    for cfg in [TageConfig::small(), TageConfig::large()] {
        for pc in [0, 0x4000_1000, 0x7fff_fff0, 0xdead_beef] {
            let mut tage = cfg.clone().build().unwrap();
            let p = tage.predict(pc, true);
            assert_eq!(p.outcome, Outcome::N);
            assert_eq!(p.base_outcome, Outcome::N);
            assert!(!p.used_alt);
            assert_eq!(p.target(), PLACEHOLDER_TARGET);
        }
    }
}

#[test]
fn counters_stay_in_range() {
    let mut tage = TageConfig::small().build().unwrap();
    run_pattern(&mut tage, 0x1000, &[Outcome::T], 500);
    run_pattern(&mut tage, 0x1000, &[Outcome::N], 500);
    for ctr in tage.base.data.iter() {
        assert!((0..=3).contains(&ctr.value()));
    }
    for comp in tage.comp.iter() {
        for e in comp.data.iter() {
            assert!((0..=7).contains(&e.ctr.value()));
            assert!(e.useful <= 3);
        }
    }
    let base_idx = tage.base.get_index(0x1000);
    assert_eq!(tage.base.get_entry(base_idx).value(), 0);
}

#[test]
fn longest_history_provides() {
    let pc = 0x40;

    let mut tage = with_hits(pc, &[(0, 3), (2, -4)]);
    let p = tage.predict(pc, true);
    assert_eq!(p.provider, TageProvider::Tagged(2));
    assert_eq!(p.alt_provider, TageProvider::Tagged(0));
    assert_eq!(p.outcome, Outcome::N);
    assert!(!p.used_alt);

    // A hit between the provider and the alternate becomes the alternate
    let mut tage = with_hits(pc, &[(0, 3), (1, 3), (2, -4)]);
    let p = tage.predict(pc, true);
    assert_eq!(p.provider, TageProvider::Tagged(2));
    assert_eq!(p.alt_provider, TageProvider::Tagged(1));

    let mut tage = with_hits(pc, &[(1, 3)]);
    let p = tage.predict(pc, true);
    assert_eq!(p.provider, TageProvider::Tagged(1));
    assert_eq!(p.alt_provider, TageProvider::Base);
    assert_eq!(p.outcome, Outcome::T);

    let mut tage = with_hits(pc, &[]);
    let p = tage.predict(pc, true);
    assert_eq!(p.provider, TageProvider::Base);
    assert_eq!(p.outcome, p.base_outcome);
}

#[test]
fn weak_provider_defers_to_alternate() {
    let pc = 0x40;

    let mut tage = with_hits(pc, &[(0, 3), (2, -1)]);
    let p = tage.predict(pc, true);
    assert_eq!(p.provider_outcome, Outcome::N);
    assert_eq!(p.outcome, Outcome::T);
    assert!(p.used_alt);

    // The alternate agrees: nothing was overridden
    let mut tage = with_hits(pc, &[(0, -4), (2, -1)]);
    let p = tage.predict(pc, true);
    assert_eq!(p.outcome, Outcome::N);
    assert!(!p.used_alt);

    // No alternate: a weak provider still provides
    let mut tage = with_hits(pc, &[(2, 0)]);
    let p = tage.predict(pc, true);
    assert_eq!(p.outcome, Outcome::T);
    assert!(!p.used_alt);
}

#[test]
fn useful_counters_follow_own_predictions() {
    let pc = 0x40;
    let mut tage = with_hits(pc, &[(0, 3), (2, -1)]);
    let p = tage.predict(pc, true);
    assert!(p.used_alt);

    let pidx = p.lookups[2].idx;
    let aidx = p.lookups[0].idx;
    tage.comp[2].data[pidx].useful = 2;
    tage.comp[0].data[aidx].useful = 1;

    tage.update(p, Outcome::T, 0);

    // The provider was wrong, the alternate was right
    assert_eq!(tage.comp[2].data[pidx].useful, 1);
    assert_eq!(tage.comp[0].data[aidx].useful, 2);
    assert_eq!(tage.comp[2].data[pidx].ctr.value(), 0);
    assert_eq!(tage.comp[0].data[aidx].ctr.value(), 3);
    assert_eq!(tage.stat.alt_used, 1);

    // The alternate covered for the provider, so nothing is allocated
    assert_eq!(tage.stat.alcs, 0);
    assert_eq!(tage.stat.forced_alcs, 0);
}

#[test]
fn useful_untouched_without_override() {
    let pc = 0x40;
    let mut tage = with_hits(pc, &[(0, 3), (2, 2)]);
    let p = tage.predict(pc, true);
    assert!(!p.used_alt);
    let pidx = p.lookups[2].idx;
    tage.comp[2].data[pidx].useful = 2;

    tage.update(p, Outcome::N, 0);
    assert_eq!(tage.comp[2].data[pidx].useful, 2);
    assert_eq!(tage.comp[2].data[pidx].ctr.value(), 1);

    // The provider was the longest component: there's nowhere to allocate
    assert_eq!(tage.stat.failed_alcs, 1);
    assert_eq!(tage.stat.comp_miss[2], 1);
}

#[test]
fn allocation_improves_accuracy() {
    let patterns: [&[Outcome]; 3] = [
        &[Outcome::T, Outcome::N],
        &[Outcome::T, Outcome::T, Outcome::N],
        &[Outcome::T, Outcome::N, Outcome::N, Outcome::N, Outcome::T],
    ];
    for pattern in patterns {
        let mut tage = TageConfig::small().build().unwrap();
        let hits = run_pattern(&mut tage, 0x4000_0040, pattern, 3000);
        let early = hits[..60].iter().filter(|h| **h).count() as f64 / 60.0;
        let late = hits[2500..].iter().filter(|h| **h).count() as f64 / 500.0;
        assert!(tage.stat.alcs > 0);
        assert!(late > early, "{:?}: early={} late={}", pattern, early, late);
        assert!(late > 0.95, "{:?}: late={}", pattern, late);
    }
}

#[test]
fn allocates_at_most_two_entries() {
    let pc = 0x80;
    let mut tage = with_hits(pc, &[]);
    let before = snapshot(&tage);

    let p = tage.predict(pc, true);
    assert_eq!(p.outcome, Outcome::N);
    let lookups = p.lookups.clone();
    tage.update(p, Outcome::T, 0);

    for id in 0..2 {
        let e = &tage.comp[id].data[lookups[id].idx];
        assert_eq!(e.tag, lookups[id].tag);
        assert_eq!(e.useful, 0);
        assert_eq!(e.ctr.value(), 0);
        assert_eq!(e.predict(), Outcome::T);
    }
    assert_eq!(snapshot(&tage)[2], before[2]);
    assert_eq!(tage.stat.alcs, 2);
    assert_eq!(tage.stat.base_miss, 1);
}

#[test]
fn tagged_provider_allocates_above_itself() {
    let pc = 0x80;
    let mut tage = with_hits(pc, &[(0, 3)]);
    let before = snapshot(&tage);

    let p = tage.predict(pc, true);
    assert_eq!(p.provider, TageProvider::Tagged(0));
    assert_eq!(p.outcome, Outcome::T);
    let lookups = p.lookups.clone();
    tage.update(p, Outcome::N, 0);

    // The provider is trained in place, and both longer components take
    // a weakly not-taken entry
    let mut expected = before.clone();
    expected[0][lookups[0].idx].2 = 2;
    expected[1][lookups[1].idx] = (lookups[1].tag, 0, -1);
    expected[2][lookups[2].idx] = (lookups[2].tag, 0, -1);
    assert_eq!(snapshot(&tage), expected);
    assert_eq!(tage.stat.alcs, 2);
    assert_eq!(tage.stat.comp_miss[0], 1);
}

#[test]
fn agreeing_alternate_does_not_suppress_allocation() {
    let pc = 0x80;
    let mut tage = with_hits(pc, &[(0, -4), (1, -1)]);
    let before = snapshot(&tage);

    // The provider is weak, and the alternate agrees with it
    let p = tage.predict(pc, true);
    assert_eq!(p.provider, TageProvider::Tagged(1));
    assert_eq!(p.alt_provider, TageProvider::Tagged(0));
    assert_eq!(p.outcome, Outcome::N);
    assert!(!p.used_alt);
    let lookups = p.lookups.clone();
    tage.update(p, Outcome::T, 0);

    // Both were wrong: only the provider is trained, and the component
    // above it takes a new entry
    let mut expected = before.clone();
    expected[1][lookups[1].idx].2 = 0;
    expected[2][lookups[2].idx] = (lookups[2].tag, 0, 0);
    assert_eq!(snapshot(&tage), expected);
    assert_eq!(tage.stat.alcs, 1);
    assert_eq!(tage.stat.alt_used, 0);
}

#[test]
fn useful_entries_are_protected() {
    let pc = 0x80;
    let mut tage = with_hits(pc, &[]);
    for comp in tage.comp.iter_mut() {
        for entry in comp.data.iter_mut() {
            entry.useful = 3;
        }
    }
    let before = snapshot(&tage);

    let p = tage.predict(pc, true);
    let lookups = p.lookups.clone();
    tage.update(p, Outcome::T, 0);

    // Only the forced allocation in the first candidate is allowed
    let mut expected = before.clone();
    expected[0][lookups[0].idx] = (lookups[0].tag, 0, 0);
    assert_eq!(snapshot(&tage), expected);
    assert_eq!(tage.stat.forced_alcs, 1);
    assert_eq!(tage.stat.alcs, 0);
}

#[test]
fn allocation_skips_useful_entries() {
    let pc = 0x80;
    let mut tage = with_hits(pc, &[]);
    for comp in tage.comp.iter_mut() {
        for entry in comp.data.iter_mut() {
            entry.useful = 3;
        }
    }
    let idx1 = tage.comp[1].get_index(pc);
    tage.comp[1].data[idx1].useful = 0;
    let before = snapshot(&tage);

    let p = tage.predict(pc, true);
    let lookups = p.lookups.clone();
    tage.update(p, Outcome::T, 0);

    let mut expected = before.clone();
    expected[1][lookups[1].idx] = (lookups[1].tag, 0, 0);
    assert_eq!(snapshot(&tage), expected);
    assert_eq!(tage.stat.alcs, 1);
    assert_eq!(tage.stat.forced_alcs, 0);
}

#[test]
fn aging_decrements_useful_counters() {
    let mut tage = tiny().build().unwrap();
    isolate(&mut tage);
    for comp in tage.comp.iter_mut() {
        for (i, entry) in comp.data.iter_mut().enumerate() {
            entry.useful = (i % 4) as u8;
        }
    }
    let before = snapshot(&tage);

    // The base component always predicts this correctly, so nothing else
    // touches the 'useful' counters.
    let period = 1 << tage.cfg.aging_period_log2;
    run_pattern(&mut tage, 0x100, &[Outcome::N], period - 1);
    assert_eq!(snapshot(&tage), before);
    assert_eq!(tage.stat.agings, 0);

    run_pattern(&mut tage, 0x100, &[Outcome::N], 1);
    assert_eq!(tage.stat.agings, 1);
    let after = snapshot(&tage);
    for (b, a) in before.iter().flatten().zip(after.iter().flatten()) {
        assert_eq!(a.1, b.1.saturating_sub(1));
    }

    run_pattern(&mut tage, 0x100, &[Outcome::N], period * 4);
    assert_eq!(tage.stat.agings, 5);
    assert!(tage.comp.iter().all(|c| c.num_useful_entries() == 0));
}

#[test]
fn unconditional_branches_bypass_state() {
    let mut tage = tiny().build().unwrap();
    let before = snapshot(&tage);
    for pc in [0x10, 0x20, 0x30] {
        let p = tage.predict(pc, false);
        assert_eq!(p.outcome, Outcome::T);
        assert_eq!(p.target(), PLACEHOLDER_TARGET);
        tage.update(p, Outcome::T, 0x1234);
    }
    assert_eq!(snapshot(&tage), before);
    assert_eq!(tage.stat.clk, 0);
    assert!(tage.ghr().read(0..16).not_any());
    assert!(tage.base.data.iter().all(|c| c.value() == 1));
}

#[test]
fn folded_history_matches_register() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut tage = TageConfig::small().build().unwrap();
    for _ in 0..2000 {
        let pc = rng.gen_range(0..256usize) * 4;
        let conditional = rng.gen_bool(0.8);
        let p = tage.predict(pc, conditional);
        tage.update(p, Outcome::from(rng.gen::<bool>()), 0);

        for comp in tage.comp.iter() {
            let ghr = tage.ghr();
            assert_eq!(comp.index_csr.output(), ghr.fold(comp.cfg.history_len));
            assert_eq!(comp.tag_csr.output(),
                ghr.fold(hash::tag_history_len(comp.id, comp.cfg.history_len)));
        }
    }
    assert!(tage.ghr().read(0..64).any());
}

#[test]
fn history_records_conditional_outcomes() {
    let mut tage = tiny().build().unwrap();
    run_pattern(&mut tage, 0x100, &[Outcome::T, Outcome::T, Outcome::N], 3);
    let p = tage.predict(0x200, false);
    tage.update(p, Outcome::N, 0);
    assert_eq!(tage.ghr().to_string(), "0000000000000110");
    assert_eq!(tage.stat.clk, 3);
}

#[test]
#[should_panic]
fn predict_while_in_flight() {
    let mut tage = tiny().build().unwrap();
    let _p = tage.predict(0x100, true);
    let _q = tage.predict(0x104, true);
}

#[test]
fn protocol_errors() {
    let mut a = tiny().build().unwrap();
    let mut b = tiny().build().unwrap();

    let pa = a.try_predict(0x100, true).unwrap();
    assert_eq!(a.outstanding(), Some(pa.seq()));
    assert_eq!(a.try_predict(0x100, true).unwrap_err(),
        ProtocolError::Outstanding { outstanding: pa.seq() });

    // A prediction from another predictor is rejected
    let pb = b.try_predict(0x100, true).unwrap();
    let err = a.try_update(pb, Outcome::T, 0).unwrap_err();
    assert_eq!(err.error, ProtocolError::Foreign { got: 0 });
    assert_eq!(b.outstanding(), Some(0));

    a.try_update(pa, Outcome::T, 0).unwrap();
    assert_eq!(a.outstanding(), None);

    let pa = a.predict(0x100, true);
    assert_eq!(pa.seq(), 1);
    a.update(pa, Outcome::T, 0);

    let pa = a.predict(0x100, true);
    let mut c = tiny().build().unwrap();
    let err = c.try_update(pa, Outcome::T, 0).unwrap_err();
    assert_eq!(err.error, ProtocolError::NotInFlight { got: 2 });
    assert_eq!(err.prediction.seq(), 2);
    assert_eq!(c.stat.clk, 0);
}

#[test]
fn recover_after_misrouted_update() {
    let mut a = tiny().build().unwrap();
    let mut b = tiny().build().unwrap();
    let before = snapshot(&a);

    let pb = b.try_predict(0x100, true).unwrap();
    let err = a.try_update(pb, Outcome::T, 0).unwrap_err();
    assert_eq!(err.error, ProtocolError::Foreign { got: 0 });
    assert_eq!(a.outstanding(), None);
    assert_eq!(a.stat.clk, 0);
    assert_eq!(snapshot(&a), before);

    // The rejected prediction goes back to its own predictor
    let pb = err.prediction;
    assert_eq!(pb.pc, 0x100);
    b.try_update(pb, Outcome::T, 0).unwrap();
    assert_eq!(b.outstanding(), None);
    assert_eq!(b.stat.clk, 1);

    let pb = b.try_predict(0x104, true).unwrap();
    assert_eq!(pb.seq(), 1);
    b.try_update(pb, Outcome::N, 0).unwrap();
    assert_eq!(b.stat.clk, 2);
}

#[test]
#[should_panic]
fn update_with_foreign_prediction() {
    let mut a = tiny().build().unwrap();
    let mut b = tiny().build().unwrap();
    let _pa = a.predict(0x100, true);
    let pb = b.predict(0x100, true);
    a.update(pb, Outcome::T, 0);
}
