//! Arena-backed family graph: people, marriages, and parent/child edges.
//!
//! People live in a `Vec` and every relation is an index into it, so the
//! spouse/child cross-links never form ownership cycles. The graph answers
//! the questions succession rules ask about a decedent at a date: who are
//! the children, descendants, siblings, parents, and the spouse, and who was
//! alive.
//!
//! # Invariants enforced on insertion
//!
//! - Person ids are unique.
//! - Parent/child edges are not self-links, not duplicated, at most two
//!   parents per child, and never form a cycle.
//! - Marriages join two distinct known people and do not end before they
//!   start.
//!
//! Overlapping marriages are *not* rejected on insertion. They are surfaced
//! by [`FamilyGraph::spouse_at`] as [`SuccessionError::AmbiguousSpouse`]
//! when a query actually lands in the overlap.

#![allow(clippy::module_name_repetitions)]

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::SuccessionError;
use crate::model::{Marriage, Person, PersonId};

/// Which relatives count as siblings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingScope {
    /// Anyone sharing at least one recorded parent (full or half blood).
    #[default]
    SharedParent,
    /// Only people with exactly the same recorded parents.
    FullBlood,
}

/// The static family record for one computation run.
#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    people: Vec<Person>,
    index: HashMap<PersonId, usize>,
    marriages: Vec<Marriage>,
    parents: Vec<Vec<usize>>,
    children: Vec<Vec<usize>>,
    death_dates: HashMap<usize, NaiveDate>,
}

impl FamilyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a person.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::MalformedGraph`] if the id is already taken
    /// or the death year precedes the birth year.
    pub fn add_person(&mut self, person: Person) -> Result<(), SuccessionError> {
        if self.index.contains_key(&person.id) {
            return Err(SuccessionError::MalformedGraph(format!(
                "person '{}' is recorded twice",
                person.id
            )));
        }
        if let Some(death) = person.death {
            if death < person.birth {
                return Err(SuccessionError::MalformedGraph(format!(
                    "person '{}' dies in {death} before being born in {}",
                    person.id, person.birth
                )));
            }
        }

        let idx = self.people.len();
        self.index.insert(person.id.clone(), idx);
        self.people.push(person);
        self.parents.push(Vec::new());
        self.children.push(Vec::new());
        Ok(())
    }

    /// Record a marriage.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownPerson`] for an unrecorded partner
    /// and [`SuccessionError::MalformedGraph`] for a self-marriage or an end
    /// year before the start year.
    pub fn add_marriage(&mut self, marriage: Marriage) -> Result<(), SuccessionError> {
        let [a, b] = &marriage.partners;
        self.idx(a)?;
        self.idx(b)?;
        if a == b {
            return Err(SuccessionError::MalformedGraph(format!(
                "'{a}' cannot marry themselves"
            )));
        }
        if let Some(end) = marriage.end {
            if end < marriage.start {
                return Err(SuccessionError::MalformedGraph(format!(
                    "marriage of '{a}' and '{b}' ends in {end} before starting in {}",
                    marriage.start
                )));
            }
        }
        self.marriages.push(marriage);
        Ok(())
    }

    /// Record that `parent` is a parent of `child`.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownPerson`] for unrecorded people and
    /// [`SuccessionError::MalformedGraph`] for self-links, duplicates, a
    /// third parent, or an edge that would make someone their own ancestor.
    pub fn add_parentage(
        &mut self,
        parent: &PersonId,
        child: &PersonId,
    ) -> Result<(), SuccessionError> {
        let p = self.idx(parent)?;
        let c = self.idx(child)?;

        if p == c {
            return Err(SuccessionError::MalformedGraph(format!(
                "'{parent}' cannot be their own parent"
            )));
        }
        if self.parents[c].contains(&p) {
            return Err(SuccessionError::MalformedGraph(format!(
                "'{parent}' is already recorded as a parent of '{child}'"
            )));
        }
        if self.parents[c].len() >= 2 {
            return Err(SuccessionError::MalformedGraph(format!(
                "'{child}' already has two recorded parents"
            )));
        }
        if self.reaches(c, p) {
            return Err(SuccessionError::MalformedGraph(format!(
                "'{parent}' is a descendant of '{child}'; the edge would create a cycle"
            )));
        }

        self.parents[c].push(p);
        self.children[p].push(c);
        Ok(())
    }

    /// Record the exact date of a person's death, as established by a death
    /// event.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::MalformedGraph`] if the date contradicts the
    /// recorded death year or a previously recorded date.
    pub fn record_death_date(
        &mut self,
        id: &PersonId,
        date: NaiveDate,
    ) -> Result<(), SuccessionError> {
        let idx = self.idx(id)?;
        let person = &self.people[idx];

        if let Some(year) = person.death {
            if year != date.year() {
                return Err(SuccessionError::MalformedGraph(format!(
                    "'{id}' is recorded as dying in {year} but a death event is dated {date}"
                )));
            }
        }
        if date.year() < person.birth {
            return Err(SuccessionError::MalformedGraph(format!(
                "'{id}' cannot die on {date} before being born in {}",
                person.birth
            )));
        }
        match self.death_dates.get(&idx) {
            Some(existing) if *existing != date => Err(SuccessionError::MalformedGraph(format!(
                "'{id}' has two death dates: {existing} and {date}"
            ))),
            _ => {
                self.death_dates.insert(idx, date);
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn contains(&self, id: &PersonId) -> bool {
        self.index.contains_key(id)
    }

    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownPerson`] if `id` is not recorded.
    pub fn person(&self, id: &PersonId) -> Result<&Person, SuccessionError> {
        Ok(&self.people[self.idx(id)?])
    }

    /// Display name for `id`, falling back to the id itself.
    #[must_use]
    pub fn name_of(&self, id: &PersonId) -> String {
        self.person(id)
            .map_or_else(|_| id.to_string(), |p| p.name.clone())
    }

    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.iter()
    }

    #[must_use]
    pub fn marriages(&self) -> &[Marriage] {
        &self.marriages
    }

    /// Every recorded marriage `id` took part in.
    #[must_use]
    pub fn marriages_of(&self, id: &PersonId) -> Vec<&Marriage> {
        self.marriages
            .iter()
            .filter(|m| m.partner_of(id).is_some())
            .collect()
    }

    #[must_use]
    pub fn death_date(&self, id: &PersonId) -> Option<NaiveDate> {
        self.index
            .get(id)
            .and_then(|idx| self.death_dates.get(idx).copied())
    }

    // -----------------------------------------------------------------------
    // Relations
    // -----------------------------------------------------------------------

    /// Direct children of `id`, in recorded order.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownPerson`] if `id` is not recorded.
    pub fn children_of(&self, id: &PersonId) -> Result<Vec<PersonId>, SuccessionError> {
        let idx = self.idx(id)?;
        Ok(self.ids(&self.children[idx]))
    }

    /// Recorded parents of `id` (zero, one, or two).
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownPerson`] if `id` is not recorded.
    pub fn parents_of(&self, id: &PersonId) -> Result<Vec<PersonId>, SuccessionError> {
        let idx = self.idx(id)?;
        Ok(self.ids(&self.parents[idx]))
    }

    /// Everyone reachable from `id` through parent→child edges, excluding
    /// `id`, in breadth-first order.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownPerson`] if `id` is not recorded.
    pub fn descendants_of(&self, id: &PersonId) -> Result<Vec<PersonId>, SuccessionError> {
        let start = self.idx(id)?;
        let mut seen = HashSet::from([start]);
        let mut queue: VecDeque<usize> = self.children[start].iter().copied().collect();
        let mut out = Vec::new();

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            queue.extend(self.children[next].iter().copied());
        }

        Ok(self.ids(&out))
    }

    /// People sharing a parent with `id` under the given scope, excluding
    /// `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownPerson`] if `id` is not recorded.
    pub fn siblings_of(
        &self,
        id: &PersonId,
        scope: SiblingScope,
    ) -> Result<Vec<PersonId>, SuccessionError> {
        let idx = self.idx(id)?;
        let own_parents = sorted(&self.parents[idx]);
        let mut seen = HashSet::from([idx]);
        let mut out = Vec::new();

        for &parent in &self.parents[idx] {
            for &candidate in &self.children[parent] {
                if !seen.insert(candidate) {
                    continue;
                }
                let eligible = match scope {
                    SiblingScope::SharedParent => true,
                    SiblingScope::FullBlood => sorted(&self.parents[candidate]) == own_parents,
                };
                if eligible {
                    out.push(candidate);
                }
            }
        }

        Ok(self.ids(&out))
    }

    /// The partner whose marriage interval covers `date`'s year.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::AmbiguousSpouse`] when more than one
    /// distinct partner matches, and [`SuccessionError::UnknownPerson`] if
    /// `id` is not recorded.
    pub fn spouse_at(
        &self,
        id: &PersonId,
        date: NaiveDate,
    ) -> Result<Option<PersonId>, SuccessionError> {
        self.idx(id)?;
        let year = date.year();

        let mut candidates: Vec<PersonId> = Vec::new();
        for marriage in &self.marriages {
            let Some(partner) = marriage.partner_of(id) else {
                continue;
            };
            if marriage.is_active_in(year) && !candidates.contains(partner) {
                candidates.push(partner.clone());
            }
        }

        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            _ => Err(SuccessionError::AmbiguousSpouse {
                person: id.clone(),
                year,
                candidates,
            }),
        }
    }

    /// Whether `id` was alive on `date`.
    ///
    /// A person is not alive before their birth year. With an exact death
    /// date (from a death event) they are alive strictly before it; with only
    /// a death year they are treated as dead from January 1 of that year.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownPerson`] if `id` is not recorded.
    pub fn is_alive(&self, id: &PersonId, date: NaiveDate) -> Result<bool, SuccessionError> {
        let idx = self.idx(id)?;
        let person = &self.people[idx];

        if person.birth > date.year() {
            return Ok(false);
        }
        if let Some(death) = self.death_dates.get(&idx) {
            return Ok(date < *death);
        }
        Ok(person.death.is_none_or(|year| date.year() < year))
    }

    /// Whether `id` had been born by `date`'s year.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownPerson`] if `id` is not recorded.
    pub fn is_born_by(&self, id: &PersonId, date: NaiveDate) -> Result<bool, SuccessionError> {
        Ok(self.person(id)?.birth <= date.year())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn idx(&self, id: &PersonId) -> Result<usize, SuccessionError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| SuccessionError::UnknownPerson(id.clone()))
    }

    fn ids(&self, indices: &[usize]) -> Vec<PersonId> {
        indices.iter().map(|&i| self.people[i].id.clone()).collect()
    }

    /// Whether `target` is reachable from `from` along child edges
    /// (or `from == target`).
    fn reaches(&self, from: usize, target: usize) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(next) = stack.pop() {
            if next == target {
                return true;
            }
            if seen.insert(next) {
                stack.extend(self.children[next].iter().copied());
            }
        }
        false
    }
}

fn sorted(indices: &[usize]) -> Vec<usize> {
    let mut out = indices.to_vec();
    out.sort_unstable();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EndReason;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn id(s: &str) -> PersonId {
        PersonId::from(s)
    }

    fn ids(list: &[&str]) -> Vec<PersonId> {
        list.iter().map(|s| id(s)).collect()
    }

    /// The Smith family from the reference timeline.
    fn smith_family() -> FamilyGraph {
        let mut g = FamilyGraph::new();
        for person in [
            Person::new("john", "John Smith", 1940).died(2020),
            Person::new("mary", "Mary Johnson", 1942).died(2005),
            Person::new("susan", "Susan Davis", 1955),
            Person::new("alice", "Alice Smith", 1968),
            Person::new("bob", "Bob Smith", 1970).died(2018),
            Person::new("charlie", "Charlie Smith", 1985),
            Person::new("david", "David Smith", 1995),
            Person::new("emma", "Emma Smith", 1998),
            Person::new("frank", "Frank Smith", 2000).died(2021),
        ] {
            g.add_person(person).expect("add person");
        }
        g.add_marriage(Marriage::new("john", "mary", 1965).ended(2005, EndReason::Death))
            .expect("add marriage");
        g.add_marriage(Marriage::new("john", "susan", 2007)).expect("add marriage");
        for child in ["alice", "bob", "charlie"] {
            g.add_parentage(&id("john"), &id(child)).expect("add parentage");
        }
        for child in ["david", "emma", "frank"] {
            g.add_parentage(&id("bob"), &id(child)).expect("add parentage");
        }
        g
    }

    #[test]
    fn children_are_direct_and_ordered() {
        let g = smith_family();
        assert_eq!(
            g.children_of(&id("john")).expect("children"),
            ids(&["alice", "bob", "charlie"])
        );
        assert!(g.children_of(&id("alice")).expect("children").is_empty());
    }

    #[test]
    fn descendants_are_transitive_and_exclude_self() {
        let g = smith_family();
        let d = g.descendants_of(&id("john")).expect("descendants");
        assert_eq!(
            d,
            ids(&["alice", "bob", "charlie", "david", "emma", "frank"])
        );
        assert!(!d.contains(&id("john")));
    }

    #[test]
    fn siblings_share_a_parent() {
        let g = smith_family();
        assert_eq!(
            g.siblings_of(&id("frank"), SiblingScope::SharedParent)
                .expect("siblings"),
            ids(&["david", "emma"])
        );
        assert!(
            g.siblings_of(&id("john"), SiblingScope::SharedParent)
                .expect("siblings")
                .is_empty()
        );
    }

    #[test]
    fn full_blood_scope_excludes_half_siblings() {
        let mut g = smith_family();
        g.add_person(Person::new("gwen", "Gwen Smith", 1972)).expect("add");
        g.add_person(Person::new("hal", "Hal Smith", 2001)).expect("add");
        g.add_parentage(&id("gwen"), &id("frank")).expect("edge");
        g.add_parentage(&id("bob"), &id("hal")).expect("edge");

        let shared = g
            .siblings_of(&id("frank"), SiblingScope::SharedParent)
            .expect("siblings");
        assert_eq!(shared, ids(&["david", "emma", "hal"]));

        let full = g
            .siblings_of(&id("frank"), SiblingScope::FullBlood)
            .expect("siblings");
        assert!(full.is_empty());

        let hal_full = g.siblings_of(&id("hal"), SiblingScope::FullBlood).expect("siblings");
        assert_eq!(hal_full, ids(&["david", "emma"]));
    }

    #[test]
    fn spouse_at_follows_marriage_intervals() {
        let g = smith_family();
        assert_eq!(g.spouse_at(&id("john"), date(1990, 1, 1)).expect("spouse"), Some(id("mary")));
        assert_eq!(g.spouse_at(&id("john"), date(2006, 1, 1)).expect("spouse"), None);
        assert_eq!(
            g.spouse_at(&id("john"), date(2020, 9, 20)).expect("spouse"),
            Some(id("susan"))
        );
        assert_eq!(g.spouse_at(&id("bob"), date(2010, 1, 1)).expect("spouse"), None);
    }

    #[test]
    fn overlapping_marriages_are_ambiguous() {
        let mut g = smith_family();
        g.add_person(Person::new("zoe", "Zoe Park", 1960)).expect("add");
        g.add_marriage(Marriage::new("zoe", "john", 2010)).expect("marriage");

        let err = g.spouse_at(&id("john"), date(2015, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            SuccessionError::AmbiguousSpouse { ref candidates, year: 2015, .. }
                if candidates.len() == 2
        ));
    }

    #[test]
    fn is_alive_uses_years_then_exact_dates() {
        let mut g = smith_family();
        assert!(g.is_alive(&id("frank"), date(2020, 9, 20)).expect("alive"));
        assert!(!g.is_alive(&id("bob"), date(2020, 9, 20)).expect("alive"));
        assert!(!g.is_alive(&id("frank"), date(2021, 1, 2)).expect("alive"));
        assert!(!g.is_alive(&id("frank"), date(1999, 1, 1)).expect("alive"));

        g.record_death_date(&id("frank"), date(2021, 5, 15)).expect("record");
        assert!(g.is_alive(&id("frank"), date(2021, 5, 14)).expect("alive"));
        assert!(!g.is_alive(&id("frank"), date(2021, 5, 15)).expect("alive"));
    }

    #[test]
    fn death_date_must_match_death_year() {
        let mut g = smith_family();
        let err = g.record_death_date(&id("frank"), date(2022, 1, 1)).unwrap_err();
        assert!(matches!(err, SuccessionError::MalformedGraph(_)));
        g.record_death_date(&id("susan"), date(2030, 2, 2)).expect("unrecorded death is fine");
        assert_eq!(g.death_date(&id("susan")), Some(date(2030, 2, 2)));
    }

    #[test]
    fn cycles_and_self_links_are_rejected() {
        let mut g = smith_family();
        let err = g.add_parentage(&id("david"), &id("john")).unwrap_err();
        assert!(matches!(err, SuccessionError::MalformedGraph(ref m) if m.contains("cycle")));
        assert!(g.add_parentage(&id("alice"), &id("alice")).is_err());
        assert!(g.add_parentage(&id("john"), &id("alice")).is_err());
    }

    #[test]
    fn third_parent_is_rejected() {
        let mut g = smith_family();
        g.add_parentage(&id("mary"), &id("alice")).expect("second parent");
        let err = g.add_parentage(&id("susan"), &id("alice")).unwrap_err();
        assert!(matches!(err, SuccessionError::MalformedGraph(_)));
    }

    #[test]
    fn unknown_people_are_reported() {
        let g = smith_family();
        assert_eq!(
            g.children_of(&id("nobody")).unwrap_err(),
            SuccessionError::UnknownPerson(id("nobody"))
        );
        let mut g = g;
        assert!(g.add_marriage(Marriage::new("john", "nobody", 2000)).is_err());
        assert!(g.add_person(Person::new("john", "Dup", 1900)).is_err());
    }
}
