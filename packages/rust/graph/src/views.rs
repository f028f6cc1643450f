//! Categorization views and the post-load normalization passes.
//!
//! After ingestion every loaded compound hangs off one of five synthetic
//! view roots. Three passes then normalize the trees: de-duplication drops
//! top-level entries that also appear deeper in the same view, the files
//! view re-parents files under their directories, and a final recursive
//! sort orders every child list by name.

use doxograph_shared::Kind;

use crate::entity::EntityId;
use crate::registry::EntityRegistry;

/// The five view roots. Detached entities, never bound in the refid map.
#[derive(Debug, Clone, Copy)]
pub struct Views {
    /// Language view: namespaces, classes, and friends.
    pub root: EntityId,
    pub groups: EntityId,
    /// Files and directories.
    pub files: EntityId,
    pub pages: EntityId,
    pub examples: EntityId,
}

impl Views {
    pub fn all(&self) -> [EntityId; 5] {
        [self.root, self.groups, self.files, self.pages, self.examples]
    }
}

/// Remove view-root children that also occur deeper inside the view.
///
/// The index lists every compound flat, so a class nested in a namespace
/// appears both as a top-level entry and as that namespace's child; only
/// the nested occurrence should survive. A non-empty `filter` restricts
/// which kinds are considered when descending (the groups view prunes on
/// group containment only).
pub fn fix_duplicates(registry: &mut EntityRegistry, view_root: EntityId, filter: &[Kind]) {
    dedup_in_place(registry, view_root);
    let top = registry.get(view_root).children.clone();
    for child in top {
        prune_descendants(registry, child, view_root, filter);
    }
}

fn dedup_in_place(registry: &mut EntityRegistry, view_root: EntityId) {
    let mut seen = Vec::new();
    registry.get_mut(view_root).children.retain(|&c| {
        if seen.contains(&c) {
            false
        } else {
            seen.push(c);
            true
        }
    });
}

fn prune_descendants(
    registry: &mut EntityRegistry,
    node: EntityId,
    view_root: EntityId,
    filter: &[Kind],
) {
    let children = registry.get(node).children.clone();
    for child in children {
        if !filter.is_empty() && !filter.contains(&registry.get(child).kind) {
            continue;
        }
        registry.get_mut(view_root).children.retain(|&c| c != child);
        prune_descendants(registry, child, view_root, filter);
    }
}

/// Re-parent files under their directory in the files view.
///
/// A file loaded before its directory records the view root as its parent;
/// once the directory's own listing claims it, the directory wins.
pub fn fix_parents(registry: &mut EntityRegistry, node: EntityId) {
    let entity = registry.get(node);
    if !entity.kind.is_dir() && !entity.kind.is_root() {
        return;
    }
    let children = entity.children.clone();
    for child in children {
        let kind = registry.get(child).kind;
        if kind.is_file() {
            registry.get_mut(child).parent = Some(node);
        }
        if kind.is_dir() {
            fix_parents(registry, child);
        }
    }
}

/// Sort every child list under `node` by entity name, recursively.
pub fn sort_recursive(registry: &mut EntityRegistry, node: EntityId) {
    let mut children = registry.get(node).children.clone();
    children.sort_by(|&a, &b| registry.get(a).name.cmp(&registry.get(b).name));
    for &child in &children {
        sort_recursive(registry, child);
    }
    registry.get_mut(node).children = children;
}

#[cfg(test)]
mod tests {
    use doxograph_shared::{DuplicateIdPolicy, RefId};

    use crate::entity::Entity;

    use super::*;

    fn add(
        registry: &mut EntityRegistry,
        refid: &str,
        kind: Kind,
        name: &str,
        parent: Option<EntityId>,
    ) -> EntityId {
        let mut e = Entity::new(RefId::from(refid), kind, name);
        e.parent = parent;
        let id = registry.register(e).expect("register");
        if let Some(p) = parent {
            registry.get_mut(p).children.push(id);
        }
        id
    }

    #[test]
    fn duplicates_of_nested_compounds_are_pruned_from_the_top() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let root = registry.insert_detached(Entity::view_root());
        let ns = add(&mut registry, "namespacegeom", Kind::Namespace, "geom", Some(root));
        let class = add(&mut registry, "classcircle", Kind::Class, "Circle", Some(ns));
        // The flat index also lists the class at the top level.
        registry.get_mut(root).children.push(class);

        fix_duplicates(&mut registry, root, &[]);
        assert_eq!(registry.get(root).children, vec![ns]);
        assert_eq!(registry.get(ns).children, vec![class]);
    }

    #[test]
    fn kind_filter_limits_the_descent() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let root = registry.insert_detached(Entity::view_root());
        let group = add(&mut registry, "group_a", Kind::Group, "A", Some(root));
        // A class inside the group: not pruned when filtering on groups.
        let class = add(&mut registry, "classb", Kind::Class, "B", Some(group));
        registry.get_mut(root).children.push(class);

        fix_duplicates(&mut registry, root, &[Kind::Group]);
        assert_eq!(registry.get(root).children, vec![group, class]);
    }

    #[test]
    fn repeated_top_level_listing_collapses() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let root = registry.insert_detached(Entity::view_root());
        let page = add(&mut registry, "pageintro", Kind::Page, "intro", Some(root));
        registry.get_mut(root).children.push(page);

        fix_duplicates(&mut registry, root, &[]);
        assert_eq!(registry.get(root).children, vec![page]);
    }

    #[test]
    fn files_are_reparented_under_their_directory() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let root = registry.insert_detached(Entity::view_root());
        // File loaded first: its parent starts out as the view root.
        let file = add(&mut registry, "main_8cpp", Kind::File, "main.cpp", Some(root));
        let dir = add(&mut registry, "dir_src", Kind::Dir, "src", Some(root));
        registry.get_mut(dir).children.push(file);

        fix_parents(&mut registry, root);
        assert_eq!(registry.get(file).parent, Some(dir));
    }

    #[test]
    fn sorting_is_recursive_and_by_name() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let root = registry.insert_detached(Entity::view_root());
        let ns = add(&mut registry, "ns", Kind::Namespace, "zeta", Some(root));
        let b = add(&mut registry, "classb", Kind::Class, "Beta", Some(ns));
        let a = add(&mut registry, "classa", Kind::Class, "Alpha", Some(ns));
        let early = add(&mut registry, "nsa", Kind::Namespace, "alpha", Some(root));

        sort_recursive(&mut registry, root);
        assert_eq!(registry.get(root).children, vec![early, ns]);
        assert_eq!(registry.get(ns).children, vec![a, b]);
    }
}
