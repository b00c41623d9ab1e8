//! Path classification: the keep-or-overwrite rule for revisited nodes.
//!
//! During expansion the same user can be discovered along several paths.
//! The stored classification is resolved by one pure rule so that merge
//! order never matters: higher priority wins, ties go to the shorter
//! path, everything else keeps the existing record.

use crate::graph::types::PathClass;

/// What to do with a discovered-or-revisited node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// No record exists; insert the candidate.
    Insert,
    /// The candidate beats the record; overwrite it.
    Update,
    /// The record stands; discard the candidate.
    Keep,
}

/// Resolves a candidate observation against an existing node record.
///
/// `existing` is the node's current `(path_class, distance)`, or `None`
/// if the node has not been seen yet. Adopt the candidate iff:
///
/// - no record exists yet, or
/// - the candidate's priority strictly exceeds the record's, or
/// - priorities are equal and the candidate's distance is strictly
///   shorter.
///
/// The rule is idempotent: re-feeding an adopted observation yields
/// `Keep`.
///
/// # Example
///
/// ```rust
/// use tierlink::{classify, Decision, PathClass};
///
/// // Priority beats distance: a longer first path overwrites a shorter
/// // one_point_five path.
/// let decision = classify(Some((PathClass::OnePointFive, 2)), PathClass::First, 3);
/// assert_eq!(decision, Decision::Update);
/// ```
pub fn classify(
    existing: Option<(PathClass, u32)>,
    candidate_class: PathClass,
    candidate_distance: u32,
) -> Decision {
    let Some((class, distance)) = existing else {
        return Decision::Insert;
    };

    if candidate_class.priority() > class.priority() {
        Decision::Update
    } else if candidate_class.priority() == class.priority() && candidate_distance < distance {
        Decision::Update
    } else {
        Decision::Keep
    }
}

/// Derives the classification a candidate inherits through its parent.
///
/// The viewer's own node has no classification, so hops out of the root
/// take the class of the edge itself; every deeper hop inherits the
/// parent's path class unchanged.
pub fn inherited_class(parent_path_class: Option<PathClass>, hop_class: PathClass) -> PathClass {
    parent_path_class.unwrap_or(hop_class)
}
