//! Stacking engine
//!
//! Groups a flat list of item instances into display stacks keyed by
//! semantic equality (item type + rarity or tier):
//!
//! - [`group`]: one linear pass, groups ordered by first encounter
//! - [`resolve_selection`]: "take N of this stack" back to concrete ids
//! - [`toggle_selection`]: the click-a-stack decision, free of side effects
//!
//! Every read produces a fresh snapshot; groups are never edited in place.

use crate::item::{ItemAttributes, ItemInstance, ItemRef};
use crate::{ItemId, ItemType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Key under which interchangeable items stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackKey(String);

impl StackKey {
    /// Derive the key from an item type and its attributes
    ///
    /// `"{type}_{rarity}"` when graded by rarity, `"{type}_T{tier}"` when
    /// graded by tier, otherwise the bare type. Rarity wins over tier.
    ///
    /// Only the instance's own attributes count. A catalog default rarity
    /// is not applied, so an unrated egg and a `Common` egg stack apart on
    /// every client regardless of which catalog it loaded.
    pub fn derive(item_type: &ItemType, attributes: &ItemAttributes) -> Self {
        match (attributes.rarity, attributes.tier) {
            (Some(rarity), _) => Self(format!("{}_{}", item_type, rarity)),
            (None, Some(tier)) => Self(format!("{}_T{}", item_type, tier)),
            (None, None) => Self(item_type.as_str().to_string()),
        }
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that can be grouped into stacks
pub trait Stackable {
    /// Unique id of the underlying instance
    fn item_id(&self) -> &ItemId;

    /// Stack key of the underlying instance
    fn stack_key(&self) -> StackKey;
}

impl Stackable for ItemInstance {
    fn item_id(&self) -> &ItemId {
        &self.id
    }

    fn stack_key(&self) -> StackKey {
        ItemInstance::stack_key(self)
    }
}

impl Stackable for ItemRef {
    fn item_id(&self) -> &ItemId {
        &self.id
    }

    fn stack_key(&self) -> StackKey {
        self.stack_key.clone()
    }
}

/// A display-level aggregation of interchangeable item instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedGroup<T> {
    pub stack_key: StackKey,
    /// First instance encountered with this key
    pub representative: T,
    /// Always equal to `member_ids.len()`, and at least 1
    pub count: usize,
    /// Member ids in encounter order
    pub member_ids: Vec<ItemId>,
}

impl<T> StackedGroup<T> {
    /// Check if the group contains an item id
    pub fn contains(&self, id: &ItemId) -> bool {
        self.member_ids.contains(id)
    }
}

/// Group items into stacks
///
/// The result partitions the input: each distinct id appears in exactly one
/// group. If an id occurs more than once in the input only its first
/// occurrence is counted.
pub fn group<T: Stackable + Clone>(items: &[T]) -> Vec<StackedGroup<T>> {
    let mut groups: IndexMap<StackKey, StackedGroup<T>> = IndexMap::new();
    let mut seen: HashSet<&ItemId> = HashSet::with_capacity(items.len());

    for item in items {
        if !seen.insert(item.item_id()) {
            continue;
        }
        let key = item.stack_key();
        match groups.get_mut(&key) {
            Some(existing) => {
                existing.count += 1;
                existing.member_ids.push(item.item_id().clone());
            }
            None => {
                groups.insert(
                    key.clone(),
                    StackedGroup {
                        stack_key: key,
                        representative: item.clone(),
                        count: 1,
                        member_ids: vec![item.item_id().clone()],
                    },
                );
            }
        }
    }

    groups.into_values().collect()
}

/// Resolve "take N of this stack" to concrete ids
///
/// Returns the first `desired_count` member ids in member order, clamped to
/// the group size.
pub fn resolve_selection<T>(group: &StackedGroup<T>, desired_count: usize) -> Vec<ItemId> {
    group
        .member_ids
        .iter()
        .take(desired_count)
        .cloned()
        .collect()
}

/// Outcome of clicking a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionAction {
    /// The stack becomes the current selection
    Select(StackKey),
    /// The stack was already selected and is released
    Deselect(StackKey),
}

impl SelectionAction {
    pub fn key(&self) -> &StackKey {
        match self {
            SelectionAction::Select(key) | SelectionAction::Deselect(key) => key,
        }
    }
}

/// Decide what a click on `group` does given the current selection
pub fn toggle_selection<T>(group: &StackedGroup<T>, currently_selected: Option<&StackKey>) -> SelectionAction {
    if currently_selected == Some(&group.stack_key) {
        SelectionAction::Deselect(group.stack_key.clone())
    } else {
        SelectionAction::Select(group.stack_key.clone())
    }
}

/// Find a group by key in a grouping snapshot
pub fn find_group<'a, T>(groups: &'a [StackedGroup<T>], key: &StackKey) -> Option<&'a StackedGroup<T>> {
    groups.iter().find(|g| &g.stack_key == key)
}
