use std::collections::HashMap;

use crate::catalog::models::{CategoryRecord, CategoryViewNode};
use crate::notion::models::ResourceRecord;

/// Build the two-level category view from flat records.
///
/// Roots are the categories without a parent, sorted by `sort`. Their
/// `children` ids resolve to second-level nodes, which are the only nodes
/// carrying resolved `links`. Ids that resolve to nothing are dropped, and
/// a category is reachable only through its root's `children`.
pub fn build_tree(
    categories: &[CategoryRecord],
    resources: &[ResourceRecord],
) -> Vec<CategoryViewNode> {
    let resource_index: HashMap<&str, &ResourceRecord> =
        resources.iter().map(|r| (r.id.as_str(), r)).collect();
    let category_index: HashMap<&str, &CategoryRecord> =
        categories.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut roots: Vec<CategoryViewNode> = categories
        .iter()
        .filter(|c| c.is_primary())
        .map(|root| {
            let children = root
                .children
                .iter()
                .filter_map(|child| category_index.get(child.id.as_str()))
                .map(|child| second_level(child, &resource_index))
                .collect();
            node(root, children, vec![])
        })
        .collect();

    roots.sort_by_key(|n| n.sort);
    roots
}

fn second_level(
    category: &CategoryRecord,
    resource_index: &HashMap<&str, &ResourceRecord>,
) -> CategoryViewNode {
    let links = category
        .links
        .iter()
        .filter_map(|link| resource_index.get(link.id.as_str()))
        .map(|r| (*r).clone())
        .collect();
    node(category, vec![], links)
}

fn node(
    category: &CategoryRecord,
    children: Vec<CategoryViewNode>,
    links: Vec<ResourceRecord>,
) -> CategoryViewNode {
    CategoryViewNode {
        id: category.id.clone(),
        name: category.name.clone(),
        desc: category.desc.clone(),
        sort: category.sort,
        icon: category.icon.clone(),
        parent: category.parent.clone(),
        children,
        links,
    }
}
