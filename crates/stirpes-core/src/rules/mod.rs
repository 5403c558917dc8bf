//! Intestate succession rules.
//!
//! A death distributes the decedent's share among heir classes chosen by a
//! fixed, ordered decision table over the decedent's circumstances at the
//! date of death. The first matching [`Rule`] wins; rules are never combined.
//!
//! | # | Rule                   | Spouse | Descendants | Parents | Siblings |
//! |---|------------------------|--------|-------------|---------|----------|
//! | 1 | `SpouseAndDescendants` | yes    | yes         |         |          |
//! | 2 | `DescendantsOnly`      | no     | yes         |         |          |
//! | 3 | `SpouseAndParents`     | yes    | no          | yes     |          |
//! | 4 | `SpouseOnly`           | yes    | no          | no      |          |
//! | 5 | `ParentsOnly`          | no     | no          | yes (*) |          |
//! | 6 | `Siblings`             | no     | no          | (*)     | yes      |
//! | 7 | `Unresolved`           | no     | no          | no      | no       |
//!
//! (*) With `parents_preempt_siblings` a living parent takes before
//! siblings; without it parents only take when there are no siblings.
//!
//! Within a class the class's aggregate portion is divided evenly. Classes
//! of descendants (and of siblings, with `sibling_representation`) take per
//! stirpes: see [`stirpes`].
//!
//! New jurisdictions are expressed by configuring a [`RuleSet`], and new
//! statutory cases by extending [`Rule`].

pub mod allocation;
pub mod stirpes;
pub mod warnings;

pub use allocation::{Allocation, Channel, effective_shares};
pub use warnings::{Warning, WarningKind};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::SuccessionError;
use crate::event::LegalBasis;
use crate::fraction::Fraction;
use crate::graph::{FamilyGraph, SiblingScope};
use crate::model::PersonId;
use allocation::{count_noun, derivation};

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// One statutory distribution case.
///
/// Serialized as its snake-case name so it can key citation tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rule {
    SpouseAndDescendants,
    DescendantsOnly,
    SpouseAndParents,
    SpouseOnly,
    ParentsOnly,
    Siblings,
    Unresolved,
}

impl Rule {
    /// All rules in priority order.
    pub const ALL: [Self; 7] = [
        Self::SpouseAndDescendants,
        Self::DescendantsOnly,
        Self::SpouseAndParents,
        Self::SpouseOnly,
        Self::ParentsOnly,
        Self::Siblings,
        Self::Unresolved,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpouseAndDescendants => "spouse_and_descendants",
            Self::DescendantsOnly => "descendants_only",
            Self::SpouseAndParents => "spouse_and_parents",
            Self::SpouseOnly => "spouse_only",
            Self::ParentsOnly => "parents_only",
            Self::Siblings => "siblings",
            Self::Unresolved => "unresolved",
        }
    }

    /// Pick the first rule whose preconditions hold.
    #[must_use]
    pub fn select(circumstances: &Circumstances, rules: &RuleSet) -> Self {
        let spouse = circumstances.spouse.is_some();
        let descendants = !circumstances.children.is_empty();
        let parents = !circumstances.parents.is_empty();
        let siblings = !circumstances.siblings.is_empty();

        match (spouse, descendants) {
            (true, true) => Self::SpouseAndDescendants,
            (false, true) => Self::DescendantsOnly,
            (true, false) if parents && rules.spouse_share_with_parents < Fraction::ONE => {
                Self::SpouseAndParents
            }
            (true, false) => Self::SpouseOnly,
            (false, false) if parents && rules.parents_preempt_siblings => Self::ParentsOnly,
            (false, false) if siblings => Self::Siblings,
            (false, false) if parents => Self::ParentsOnly,
            (false, false) => Self::Unresolved,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|rule| rule.as_str() == wanted)
            .ok_or_else(|| format!("unknown rule '{s}'"))
    }
}

impl Serialize for Rule {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// A jurisdiction's succession configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    /// Spouse's portion of the decedent's share when descendants survive.
    pub spouse_share_with_descendants: Fraction,
    /// Spouse's portion when no descendants but a parent survives.
    pub spouse_share_with_parents: Fraction,
    pub sibling_scope: SiblingScope,
    /// A living parent takes before siblings.
    pub parents_preempt_siblings: bool,
    /// Predeceased siblings are represented by their descendants.
    pub sibling_representation: bool,
    /// Statute cited for each rule.
    pub citations: BTreeMap<Rule, LegalBasis>,
}

impl Default for RuleSet {
    fn default() -> Self {
        let half = Fraction::new(1, 2).unwrap_or(Fraction::ONE);
        Self {
            name: "North Carolina (reference)".to_string(),
            spouse_share_with_descendants: half,
            spouse_share_with_parents: half,
            sibling_scope: SiblingScope::SharedParent,
            parents_preempt_siblings: true,
            sibling_representation: false,
            citations: default_citations(),
        }
    }
}

fn default_citations() -> BTreeMap<Rule, LegalBasis> {
    BTreeMap::from([
        (
            Rule::SpouseAndDescendants,
            LegalBasis {
                statute: "N.C. Gen. Stat. § 29-15".to_string(),
                title: "Intestate Succession - Surviving Spouse and Descendants".to_string(),
                url: Some(
                    "https://www.ncleg.gov/EnactedLegislation/Statutes/HTML/BySection/Chapter_29/GS_29-15.html"
                        .to_string(),
                ),
            },
        ),
        (
            Rule::Siblings,
            LegalBasis {
                statute: "N.C. Gen. Stat. § 29-16".to_string(),
                title: "Intestate Succession - No Spouse, Parents, or Descendants".to_string(),
                url: Some(
                    "https://www.ncleg.gov/EnactedLegislation/Statutes/HTML/BySection/Chapter_29/GS_29-16.html"
                        .to_string(),
                ),
            },
        ),
    ])
}

impl RuleSet {
    /// Reject spouse shares outside `0..=1`.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::InvalidScenario`] naming the bad setting.
    pub fn validate(&self) -> Result<(), SuccessionError> {
        for (field, value) in [
            ("spouse_share_with_descendants", self.spouse_share_with_descendants),
            ("spouse_share_with_parents", self.spouse_share_with_parents),
        ] {
            if value.is_negative() || value > Fraction::ONE {
                return Err(SuccessionError::InvalidScenario(format!(
                    "{field} must be between 0 and 1, got {value}"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn citation(&self, rule: Rule) -> Option<&LegalBasis> {
        self.citations.get(&rule)
    }
}

// ---------------------------------------------------------------------------
// Circumstances
// ---------------------------------------------------------------------------

/// The heir classes available to a decedent at the date of death.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Circumstances {
    /// Living spouse, if any.
    pub spouse: Option<PersonId>,
    /// Represented children (alive, or predeceased with a living line).
    pub children: Vec<PersonId>,
    /// Living parents.
    pub parents: Vec<PersonId>,
    /// Eligible siblings under the configured scope and representation.
    pub siblings: Vec<PersonId>,
}

impl Circumstances {
    /// Inspect the family graph for `decedent` at `date`.
    ///
    /// # Errors
    ///
    /// Propagates [`SuccessionError::AmbiguousSpouse`] and lookup failures.
    pub fn gather(
        graph: &FamilyGraph,
        rules: &RuleSet,
        decedent: &PersonId,
        date: NaiveDate,
    ) -> Result<Self, SuccessionError> {
        let spouse = match graph.spouse_at(decedent, date)? {
            Some(partner) if graph.is_alive(&partner, date)? => Some(partner),
            _ => None,
        };

        let children = stirpes::represented_children(graph, decedent, date)?;

        let mut parents = Vec::new();
        for parent in graph.parents_of(decedent)? {
            if graph.is_alive(&parent, date)? {
                parents.push(parent);
            }
        }

        let mut siblings = Vec::new();
        for sibling in graph.siblings_of(decedent, rules.sibling_scope)? {
            let eligible = if rules.sibling_representation {
                stirpes::is_represented(graph, &sibling, date)?
            } else {
                graph.is_alive(&sibling, date)?
            };
            if eligible {
                siblings.push(sibling);
            }
        }

        Ok(Self {
            spouse,
            children,
            parents,
            siblings,
        })
    }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// The outcome of applying a rule to one decedent's share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub rule: Rule,
    pub preamble: String,
    pub legal_basis: Option<LegalBasis>,
    pub allocations: Vec<Allocation>,
    /// Share no known heir could take.
    pub unallocated: Fraction,
    pub warnings: Vec<Warning>,
}

impl Distribution {
    /// Holdings per person after following passthroughs.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::Fraction`] on overflow.
    pub fn effective_shares(&self) -> Result<BTreeMap<PersonId, Fraction>, SuccessionError> {
        Ok(effective_shares(&self.allocations)?)
    }

    /// Everything distributed, including the unallocated remainder.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::Fraction`] on overflow.
    pub fn total(&self) -> Result<Fraction, SuccessionError> {
        let distributed = Fraction::checked_sum(self.effective_shares()?.into_values())?;
        Ok(distributed.checked_add(self.unallocated)?)
    }
}

/// How a class of heirs takes when a member predeceased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Descent {
    /// Only living members are in the class.
    LivingOnly,
    /// Predeceased members are represented by their lines.
    PerStirpes,
}

/// Shared context for building one distribution's allocations.
struct ClassContext<'a> {
    graph: &'a FamilyGraph,
    decedent_name: String,
    share: Fraction,
    date: NaiveDate,
}

impl ClassContext<'_> {
    fn spouse(&self, spouse: &PersonId, portion: Fraction) -> Result<Allocation, SuccessionError> {
        let fraction = portion.checked_mul(self.share)?;
        let spouse_name = self.graph.name_of(spouse);
        let dec = &self.decedent_name;
        let share = self.share;
        let explanation = if portion == Fraction::ONE {
            format!(
                "As the surviving spouse, {spouse_name} receives all of {dec}'s share \
                 ({share} of the whole), yielding {fraction}"
            )
        } else {
            format!(
                "As the surviving spouse, {spouse_name} receives {portion} of {dec}'s share \
                 ({share} of the whole), yielding {}",
                derivation(&[portion, share], fraction)
            )
        };
        Ok(Allocation {
            person: spouse.clone(),
            channel: Channel::Spouse,
            fraction,
            portion,
            deceased: false,
            explanation,
            passthrough: Vec::new(),
        })
    }

    /// Divide `class_portion` of the decedent's share evenly among `members`.
    fn class(
        &self,
        members: &[PersonId],
        class_portion: Fraction,
        channel: Channel,
        descent: Descent,
    ) -> Result<Vec<Allocation>, SuccessionError> {
        let (role, singular, plural) = match channel {
            Channel::Progeny => ("a child", "child", "children"),
            Channel::Parent => ("a parent", "parent", "parents"),
            Channel::Sibling => ("a sibling", "sibling", "siblings"),
            Channel::Spouse | Channel::Grantee => ("an heir", "heir", "heirs"),
        };
        let n = members.len();
        let unit = Fraction::unit(n)?;
        let portion = class_portion.checked_mul(unit)?;
        let fraction = portion.checked_mul(self.share)?;
        let dec = &self.decedent_name;
        let share = self.share;
        let among = count_noun(n, singular, plural);

        let mut out = Vec::with_capacity(n);
        for member in members {
            let alive = self.graph.is_alive(member, self.date)?;
            let verb = if alive { "receives" } else { "would receive" };
            let name = self.graph.name_of(member);
            let (what, factors) = if class_portion == Fraction::ONE {
                (format!("{dec}'s share"), vec![share, unit])
            } else {
                (
                    format!("{class_portion} of {dec}'s share"),
                    vec![class_portion, share, unit],
                )
            };
            let explanation = format!(
                "As {role}, {name} {verb} {what} ({share} of the whole) divided among \
                 {among}, yielding {}",
                derivation(&factors, fraction)
            );

            let passthrough = match (alive, descent) {
                (true, _) => Vec::new(),
                (false, Descent::PerStirpes) => {
                    stirpes::substitute(self.graph, member, fraction, self.date)?
                }
                (false, Descent::LivingOnly) => {
                    return Err(SuccessionError::MalformedGraph(format!(
                        "'{member}' is not alive on {} but was counted as an heir",
                        self.date
                    )));
                }
            };

            out.push(Allocation {
                person: member.clone(),
                channel,
                fraction,
                portion,
                deceased: !alive,
                explanation,
                passthrough,
            });
        }
        Ok(out)
    }
}

/// Distribute `share` held by `decedent` at death on `date`.
///
/// The effective holdings of the result plus its unallocated remainder sum
/// exactly to `share`.
///
/// # Errors
///
/// Returns [`SuccessionError::AmbiguousSpouse`] for overlapping marriages,
/// [`SuccessionError::UnknownPerson`] for dangling ids, and
/// [`SuccessionError::Fraction`] on arithmetic overflow.
pub fn distribute(
    graph: &FamilyGraph,
    rules: &RuleSet,
    decedent: &PersonId,
    share: Fraction,
    date: NaiveDate,
) -> Result<Distribution, SuccessionError> {
    let circumstances = Circumstances::gather(graph, rules, decedent, date)?;
    let rule = Rule::select(&circumstances, rules);
    debug!(
        decedent = %decedent,
        %share,
        %rule,
        children = circumstances.children.len(),
        parents = circumstances.parents.len(),
        siblings = circumstances.siblings.len(),
        "selected succession rule"
    );

    let ctx = ClassContext {
        graph,
        decedent_name: graph.name_of(decedent),
        share,
        date,
    };
    let dec = ctx.decedent_name.clone();
    let mut allocations = Vec::new();
    let mut unallocated = Fraction::ZERO;

    let c = &circumstances;
    let preamble = match (rule, &c.spouse) {
        (Rule::SpouseAndDescendants, Some(spouse)) => {
            let spouse_portion = rules.spouse_share_with_descendants;
            allocations.push(ctx.spouse(spouse, spouse_portion)?);
            let rest = Fraction::ONE.checked_sub(spouse_portion)?;
            if rest.is_positive() {
                allocations.extend(ctx.class(&c.children, rest, Channel::Progeny, Descent::PerStirpes)?);
            }
            format!(
                "{dec} had a surviving spouse and {}; ownership passes to the spouse and to \
                 the children directly or to their living descendants.",
                count_noun(c.children.len(), "child", "children")
            )
        }
        (Rule::DescendantsOnly, _) => {
            allocations.extend(ctx.class(
                &c.children,
                Fraction::ONE,
                Channel::Progeny,
                Descent::PerStirpes,
            )?);
            format!(
                "{dec} had no surviving spouse; ownership passes to {} directly or to their \
                 living descendants.",
                count_noun(c.children.len(), "child", "children")
            )
        }
        (Rule::SpouseAndParents, Some(spouse)) => {
            let spouse_portion = rules.spouse_share_with_parents;
            allocations.push(ctx.spouse(spouse, spouse_portion)?);
            let rest = Fraction::ONE.checked_sub(spouse_portion)?;
            if rest.is_positive() {
                allocations.extend(ctx.class(&c.parents, rest, Channel::Parent, Descent::LivingOnly)?);
            }
            format!(
                "{dec} had a surviving spouse and no descendants; ownership passes to the \
                 spouse and {}.",
                count_noun(c.parents.len(), "living parent", "living parents")
            )
        }
        (Rule::SpouseOnly, Some(spouse)) => {
            allocations.push(ctx.spouse(spouse, Fraction::ONE)?);
            format!(
                "{dec} had a surviving spouse and no (known) descendants or living parents; \
                 ownership passes entirely to the spouse."
            )
        }
        (Rule::ParentsOnly, _) => {
            allocations.extend(ctx.class(
                &c.parents,
                Fraction::ONE,
                Channel::Parent,
                Descent::LivingOnly,
            )?);
            format!(
                "There is no (known) surviving spouse or descendant, so {dec}'s ownership \
                 passes to {}.",
                count_noun(c.parents.len(), "living parent", "living parents")
            )
        }
        (Rule::Siblings, _) => {
            let descent = if rules.sibling_representation {
                Descent::PerStirpes
            } else {
                Descent::LivingOnly
            };
            allocations.extend(ctx.class(&c.siblings, Fraction::ONE, Channel::Sibling, descent)?);
            format!(
                "There is no (known) alive parent, surviving spouse, or children, so {dec}'s \
                 ownership is split amongst {}.",
                count_noun(c.siblings.len(), "sibling", "siblings")
            )
        }
        _ => {
            unallocated = share;
            format!("No eligible heir of {dec} is known; the share is held as unallocated.")
        }
    };

    let warnings = warnings::completeness_warnings(
        graph,
        decedent,
        rule,
        &circumstances,
        share,
        rules.parents_preempt_siblings,
    )?;
    for w in &warnings {
        warn!(decedent = %decedent, kind = %w.kind, "{}", w.message);
    }

    Ok(Distribution {
        rule,
        preamble,
        legal_basis: rules.citation(rule).cloned(),
        allocations,
        unallocated,
        warnings,
    })
}
