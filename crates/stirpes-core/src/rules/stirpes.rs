//! Per-stirpes substitution.
//!
//! When an heir predeceased the decedent, the heir's computed share is not
//! redistributed among the other heirs at that level. It passes down the
//! heir's own line: divided evenly among the heir's represented children,
//! recursing through any of those who also predeceased.
//!
//! A person is **represented** at a date when they were born by then and
//! either alive, or dead with at least one represented child. Only
//! represented people are counted when dividing a share, so a share never
//! flows into a line with nobody left to take it.

use chrono::NaiveDate;

use super::allocation::{Allocation, Channel, derivation};
use crate::error::SuccessionError;
use crate::fraction::Fraction;
use crate::graph::FamilyGraph;
use crate::model::PersonId;

/// Recursion limit for descent through generations.
pub const MAX_GENERATIONS: usize = 64;

/// Whether `id`'s line can take a share at `date`.
///
/// # Errors
///
/// Returns [`SuccessionError::UnknownPerson`] for unrecorded people and
/// [`SuccessionError::MalformedGraph`] past [`MAX_GENERATIONS`].
pub fn is_represented(
    graph: &FamilyGraph,
    id: &PersonId,
    date: NaiveDate,
) -> Result<bool, SuccessionError> {
    represented_at(graph, id, date, 0)
}

fn represented_at(
    graph: &FamilyGraph,
    id: &PersonId,
    date: NaiveDate,
    depth: usize,
) -> Result<bool, SuccessionError> {
    if depth > MAX_GENERATIONS {
        return Err(too_deep(id));
    }
    if !graph.is_born_by(id, date)? {
        return Ok(false);
    }
    if graph.is_alive(id, date)? {
        return Ok(true);
    }
    for child in graph.children_of(id)? {
        if represented_at(graph, &child, date, depth + 1)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Children of `id` whose lines can take a share at `date`, in recorded order.
///
/// # Errors
///
/// See [`is_represented`].
pub fn represented_children(
    graph: &FamilyGraph,
    id: &PersonId,
    date: NaiveDate,
) -> Result<Vec<PersonId>, SuccessionError> {
    let mut out = Vec::new();
    for child in graph.children_of(id)? {
        if is_represented(graph, &child, date)? {
            out.push(child);
        }
    }
    Ok(out)
}

/// Divide a predeceased heir's share among their represented children,
/// recursing through predeceased children.
///
/// Each of the `k` substitutes receives exactly `heir_share × 1/k`.
///
/// # Errors
///
/// Returns [`SuccessionError::MalformedGraph`] if the heir has no represented
/// child (the caller should never pass such an heir) or the recursion runs
/// past [`MAX_GENERATIONS`].
pub fn substitute(
    graph: &FamilyGraph,
    heir: &PersonId,
    heir_share: Fraction,
    date: NaiveDate,
) -> Result<Vec<Allocation>, SuccessionError> {
    substitute_at(graph, heir, heir_share, date, 0)
}

fn substitute_at(
    graph: &FamilyGraph,
    heir: &PersonId,
    heir_share: Fraction,
    date: NaiveDate,
    depth: usize,
) -> Result<Vec<Allocation>, SuccessionError> {
    if depth > MAX_GENERATIONS {
        return Err(too_deep(heir));
    }

    let substitutes = represented_children(graph, heir, date)?;
    if substitutes.is_empty() {
        return Err(SuccessionError::MalformedGraph(format!(
            "'{heir}' predeceased with no living line to take their share"
        )));
    }

    let portion = Fraction::unit(substitutes.len())?;
    let each = heir_share.checked_mul(portion)?;
    let heir_name = graph.name_of(heir);

    let mut out = Vec::with_capacity(substitutes.len());
    for child in substitutes {
        let child_name = graph.name_of(&child);
        let alive = graph.is_alive(&child, date)?;
        let verb = if alive { "receives" } else { "would receive" };
        let explanation = format!(
            "As {heir_name}'s child (per stirpes), {child_name} {verb} {portion} of \
             {heir_name}'s share ({heir_share}), yielding {}",
            derivation(&[portion, heir_share], each)
        );
        let passthrough = if alive {
            Vec::new()
        } else {
            substitute_at(graph, &child, each, date, depth + 1)?
        };

        out.push(Allocation {
            person: child,
            channel: Channel::Progeny,
            fraction: each,
            portion,
            deceased: !alive,
            explanation,
            passthrough,
        });
    }
    Ok(out)
}

fn too_deep(id: &PersonId) -> SuccessionError {
    SuccessionError::MalformedGraph(format!(
        "descent from '{id}' exceeds {MAX_GENERATIONS} generations"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Person;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn frac(s: &str) -> Fraction {
        s.parse().expect("valid fraction")
    }

    /// bob (dead) -> david, emma, frank; frank (dead) -> gil, hana; emma's
    /// daughter ivy is unborn at the reference date.
    fn lineage() -> FamilyGraph {
        let mut g = FamilyGraph::new();
        for person in [
            Person::new("bob", "Bob", 1970).died(2018),
            Person::new("david", "David", 1995),
            Person::new("emma", "Emma", 1998),
            Person::new("frank", "Frank", 1990).died(2019),
            Person::new("gil", "Gil", 2012),
            Person::new("hana", "Hana", 2015),
            Person::new("ivy", "Ivy", 2030),
            Person::new("otto", "Otto", 1972).died(2000),
        ] {
            g.add_person(person).expect("add person");
        }
        for (p, c) in [
            ("bob", "david"),
            ("bob", "emma"),
            ("bob", "frank"),
            ("frank", "gil"),
            ("frank", "hana"),
            ("emma", "ivy"),
        ] {
            g.add_parentage(&p.into(), &c.into()).expect("edge");
        }
        g
    }

    #[test]
    fn representation_requires_a_living_line() {
        let g = lineage();
        let at = date(2020, 9, 20);
        assert!(is_represented(&g, &"bob".into(), at).expect("ok"));
        assert!(is_represented(&g, &"frank".into(), at).expect("ok"));
        assert!(!is_represented(&g, &"otto".into(), at).expect("ok"));
        assert!(!is_represented(&g, &"ivy".into(), at).expect("ok"));
    }

    #[test]
    fn substitutes_split_evenly_and_sum_to_heir_share() {
        let g = lineage();
        let out = substitute(&g, &"bob".into(), frac("1/8"), date(2020, 9, 20)).expect("ok");

        assert_eq!(out.len(), 3);
        for a in &out {
            assert_eq!(a.fraction, frac("1/24"));
            assert_eq!(a.portion, frac("1/3"));
        }
        let total = Fraction::checked_sum(out.iter().map(|a| a.fraction)).expect("sum");
        assert_eq!(total, frac("1/8"));
    }

    #[test]
    fn substitution_recurses_through_predeceased_children() {
        let g = lineage();
        let out = substitute(&g, &"bob".into(), frac("1/8"), date(2020, 9, 20)).expect("ok");

        let frank = out.iter().find(|a| a.person.as_str() == "frank").expect("frank");
        assert!(frank.deceased);
        assert!(frank.explanation.contains("would receive"));
        assert_eq!(frank.passthrough.len(), 2);
        for grandchild in &frank.passthrough {
            assert_eq!(grandchild.fraction, frac("1/48"));
            assert!(!grandchild.deceased);
        }
    }

    #[test]
    fn explanation_mirrors_arithmetic() {
        let g = lineage();
        let out = substitute(&g, &"bob".into(), frac("3/16"), date(2020, 9, 20)).expect("ok");
        assert_eq!(
            out[0].explanation,
            "As Bob's child (per stirpes), David receives 1/3 of Bob's share (3/16), \
             yielding 1/3 × 3/16 = 1/16"
        );
    }

    #[test]
    fn heir_without_line_is_an_error() {
        let g = lineage();
        let err = substitute(&g, &"otto".into(), frac("1/8"), date(2020, 9, 20)).unwrap_err();
        assert!(matches!(err, SuccessionError::MalformedGraph(_)));
    }
}
