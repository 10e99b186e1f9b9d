use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{Field, Gedcom, Individual, Xref};

/// Name shown for individuals without a `NAME` tag.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Generations below the root that [`Gedcom::tree`] descends into. Deeper
/// descendants are left out, which keeps building, serializing and dropping a
/// [`TreeNode`] within a bounded stack.
pub const MAX_TREE_DEPTH: usize = 256;

/// An individual and its descendants, as consumed by tree renderers.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: Xref,
    pub name: String,
    pub birth: Option<String>,
    pub death: Option<String>,
    /// Name of the spouse, if the spouse is a known individual.
    pub spouse: Option<String>,
    pub children: Vec<TreeNode>,
}

fn event_date(individual: &Individual, tag: &str) -> Option<String> {
    individual
        .field(tag)
        .and_then(|event| event.detail("DATE"))
        .map(str::to_string)
}

fn display_name(individual: &Individual) -> String {
    individual
        .field("NAME")
        .and_then(Field::as_value)
        .unwrap_or(UNKNOWN_NAME)
        .to_string()
}

impl Gedcom {
    /// Builds the descendant tree of `root`, or of the first individual without
    /// parents when `root` is `None`. Returns `None` if `root` is unknown or
    /// there are no individuals.
    ///
    /// Each individual appears at most once, so contradictory data cannot make
    /// the tree infinite. The tree is cut off after [`MAX_TREE_DEPTH`]
    /// generations; the nodes at that depth have no children.
    pub fn tree(&self, root: Option<&str>) -> Option<TreeNode> {
        let root = match root {
            Some(id) => self.individual(id)?,
            None => self
                .individuals
                .iter()
                .find(|individual| {
                    individual.relationships.father.is_none()
                        && individual.relationships.mother.is_none()
                })
                .or_else(|| self.individuals.first())?,
        };
        let mut visited = HashSet::new();
        visited.insert(root.id.clone());
        Some(self.tree_node(root, 1, &mut visited))
    }

    fn tree_node(
        &self,
        individual: &Individual,
        depth: usize,
        visited: &mut HashSet<Xref>,
    ) -> TreeNode {
        let mut children = Vec::new();
        let descendants: &[Xref] = if depth < MAX_TREE_DEPTH {
            &individual.relationships.children
        } else {
            if !individual.relationships.children.is_empty() {
                log::debug!("Cut off the tree below {}", individual.id);
            }
            &[]
        };
        for id in descendants {
            if let Some(child) = self.individual(id) {
                if visited.insert(child.id.clone()) {
                    children.push(self.tree_node(child, depth + 1, visited));
                }
            }
        }
        let spouse = individual
            .relationships
            .spouse
            .as_ref()
            .and_then(|id| self.individual(id))
            .map(display_name);
        TreeNode {
            id: individual.id.clone(),
            name: display_name(individual),
            birth: event_date(individual, "BIRT"),
            death: event_date(individual, "DEAT"),
            spouse,
            children,
        }
    }
}
