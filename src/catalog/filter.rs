use std::collections::HashSet;

use crate::catalog::models::CategoryViewNode;
use crate::notion::models::ResourceRecord;

/// Selection id meaning "every resource".
pub const ALL: &str = "all";

/// Resources to display for a selected category.
///
/// `"all"`, an empty id or an id matching nothing yield `resources` as is.
/// A root id yields its own links followed by its children's links,
/// deduplicated by id with the first occurrence kept. A second-level id
/// yields exactly that node's links.
pub fn filter_resources(
    resources: &[ResourceRecord],
    tree: &[CategoryViewNode],
    selected_id: &str,
) -> Vec<ResourceRecord> {
    if selected_id.is_empty() || selected_id == ALL {
        return resources.to_vec();
    }

    if let Some(root) = tree.iter().find(|n| n.id == selected_id) {
        let mut seen = HashSet::new();
        return root
            .links
            .iter()
            .chain(root.children.iter().flat_map(|child| child.links.iter()))
            .filter(|r| seen.insert(r.id.as_str()))
            .cloned()
            .collect();
    }

    if let Some(child) = tree
        .iter()
        .flat_map(|root| root.children.iter())
        .find(|n| n.id == selected_id)
    {
        return child.links.clone();
    }

    resources.to_vec()
}
