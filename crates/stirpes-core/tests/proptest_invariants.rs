use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::BTreeSet;
use stirpes_core::error::SuccessionError;
use stirpes_core::event::EventPayload;
use stirpes_core::fraction::Fraction;
use stirpes_core::rules::{Allocation, RuleSet, effective_shares};

use generators::*;

/// A predeceased heir's substitutes split its share evenly and exactly.
fn check_passthrough(allocation: &Allocation) -> Result<(), TestCaseError> {
    if !allocation.deceased {
        prop_assert!(allocation.passthrough.is_empty());
        return Ok(());
    }
    let k = allocation.passthrough.len();
    prop_assert!(k > 0, "deceased heir {} has no substitutes", allocation.person);

    let each = allocation.fraction.divided_among(k).unwrap();
    for substitute in &allocation.passthrough {
        prop_assert_eq!(substitute.fraction, each);
        check_passthrough(substitute)?;
    }
    let sum = Fraction::checked_sum(allocation.passthrough.iter().map(|a| a.fraction)).unwrap();
    prop_assert_eq!(sum, allocation.fraction);
    Ok(())
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn deaths_always_process_and_every_snapshot_sums_to_one(scenario in arb_deaths_scenario()) {
        let engine = scenario.run(&RuleSet::default()).unwrap();
        let ledger = engine.ledger();
        prop_assert_eq!(ledger.len(), scenario.events.len());

        for (index, entry) in ledger.entries().iter().enumerate() {
            prop_assert_eq!(entry.snapshot.total().unwrap(), Fraction::ONE);
            prop_assert!(entry.snapshot.holdings().all(|(_, f)| f.is_positive()));

            let before = ledger.snapshot_before(index).unwrap();
            let trail = &entry.trail;
            prop_assert_eq!(trail.source_share_before, before.share_of(&trail.source));
            prop_assert_eq!(entry.snapshot.share_of(&trail.source), Fraction::ZERO);

            if trail.source_share_before.is_zero() {
                prop_assert!(!trail.transfer);
                prop_assert_eq!(&entry.snapshot, before);
                continue;
            }

            // Every holder plus the unallocated remainder is exactly the
            // decedent's share.
            let distributed = Fraction::checked_sum(
                trail.recipients.iter().flat_map(|a| a.holders()).map(|a| a.fraction),
            )
            .unwrap();
            prop_assert_eq!(
                distributed.checked_add(trail.unallocated).unwrap(),
                trail.source_share_before
            );
            for allocation in &trail.recipients {
                check_passthrough(allocation)?;
            }

            // The trail accounts for each holder's change exactly.
            let shares = effective_shares(&trail.recipients).unwrap();
            prop_assert!(!shares.contains_key(&trail.source));
            let people: BTreeSet<_> = before
                .holdings()
                .chain(entry.snapshot.holdings())
                .map(|(p, _)| p.clone())
                .chain(shares.keys().cloned())
                .collect();
            for person in people.iter().filter(|p| **p != trail.source) {
                let delta = entry
                    .snapshot
                    .share_of(person)
                    .checked_sub(before.share_of(person))
                    .unwrap();
                prop_assert_eq!(
                    delta,
                    shares.get(person).copied().unwrap_or_default(),
                    "trail and snapshot disagree for {}",
                    person
                );
            }
        }
    }

    #[test]
    fn mixed_timelines_never_break_the_ledger(scenario in arb_mixed_scenario()) {
        let engine = match scenario.run(&RuleSet::default()) {
            Ok(engine) => engine,
            Err(failure) => {
                prop_assert!(
                    !matches!(failure.error, SuccessionError::LedgerInvariantViolation { .. }),
                    "{}",
                    failure.error
                );
                let partial = failure.partial().unwrap();
                prop_assert_eq!(Some(partial.ledger().len()), failure.event_index);
                *failure.engine.unwrap()
            }
        };

        let ledger = engine.ledger();
        for (index, entry) in ledger.entries().iter().enumerate() {
            prop_assert_eq!(entry.snapshot.total().unwrap(), Fraction::ONE);
            let event = &engine.events()[index];
            let EventPayload::Deed(deed) = &event.payload else {
                continue;
            };

            // Deeds move exactly what they convey.
            let before = ledger.snapshot_before(index).unwrap();
            let held = before.share_of(&event.source);
            let conveyed = deed.conveyed(held).unwrap();
            let requested = Fraction::checked_sum(conveyed.iter().map(|(_, f)| *f)).unwrap();
            prop_assert_eq!(
                entry.snapshot.share_of(&event.source),
                held.checked_sub(requested).unwrap()
            );
            for (person, amount) in conveyed {
                prop_assert_eq!(
                    entry.snapshot.share_of(&person),
                    before.share_of(&person).checked_add(amount).unwrap()
                );
            }
        }
    }

    #[test]
    fn fractions_stay_reduced(a in arb_fraction(), b in arb_fraction()) {
        for value in [
            a.checked_add(b).unwrap(),
            a.checked_sub(b).unwrap(),
            a.checked_mul(b).unwrap(),
        ] {
            prop_assert!(value.denominator() > 0);
            let (mut x, mut y) = (value.numerator().unsigned_abs(), value.denominator().unsigned_abs());
            while y != 0 {
                (x, y) = (y, x % y);
            }
            prop_assert!(value.is_zero() || x == 1, "{} is not reduced", value);
        }
        prop_assert_eq!(a.checked_add(b).unwrap(), b.checked_add(a).unwrap());
        prop_assert_eq!(a.checked_add(b).unwrap().checked_sub(b).unwrap(), a);
    }
}
