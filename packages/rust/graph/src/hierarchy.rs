//! Inheritance hierarchy roots over the loaded graph.
//!
//! Classes with no bases are hierarchy roots. A class whose base is only
//! known by name (the base was never documented) hangs off a synthetic
//! placeholder instead, so the hierarchy still shows where it belongs;
//! classes sharing the same undocumented base share one placeholder.

use doxograph_shared::Kind;

use crate::entity::EntityId;
use crate::{ClassRef, DoxygenGraph};

/// One root of the class hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum HierarchyNode {
    /// A documented class with no base classes. Descend through
    /// [`DoxygenGraph::derived_classes`].
    Documented(EntityId),
    /// An undocumented base, known only by name, with the documented
    /// classes deriving from it in discovery order.
    Placeholder { name: String, derived: Vec<EntityId> },
}

/// Collect the hierarchy roots of every class, struct, and interface in the
/// primary scope view, sorted by display name.
pub fn class_hierarchy(graph: &DoxygenGraph) -> Vec<HierarchyNode> {
    let classes = graph.find_recursive(
        &[graph.views().root],
        &[Kind::Class, Kind::Struct, Kind::Interface],
    );

    let mut roots: Vec<HierarchyNode> = Vec::new();
    for class in classes {
        let bases = graph.base_classes(class);
        if bases.is_empty() {
            if !roots.contains(&HierarchyNode::Documented(class)) {
                roots.push(HierarchyNode::Documented(class));
            }
            continue;
        }
        for base in bases {
            match base {
                // Reachable from its documented base; not a root.
                ClassRef::Entity(_) => {}
                ClassRef::Unresolved(name) => attach_placeholder(&mut roots, name, class),
            }
        }
    }

    roots.sort_by_key(|node| match node {
        HierarchyNode::Documented(id) => graph.entity(*id).name.clone(),
        HierarchyNode::Placeholder { name, .. } => name.clone(),
    });
    roots
}

fn attach_placeholder(roots: &mut Vec<HierarchyNode>, name: String, class: EntityId) {
    for node in roots.iter_mut() {
        if let HierarchyNode::Placeholder {
            name: existing,
            derived,
        } = node
        {
            if *existing == name {
                if !derived.contains(&class) {
                    derived.push(class);
                }
                return;
            }
        }
    }
    roots.push(HierarchyNode::Placeholder {
        name,
        derived: vec![class],
    });
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use doxograph_shared::BuildConfig;

    use super::*;

    fn load_fixture(name: &str) -> DoxygenGraph {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/xml")
            .join(name);
        DoxygenGraph::load(&dir, &BuildConfig::default()).expect("fixture graph")
    }

    #[test]
    fn undocumented_base_becomes_a_placeholder_root() {
        let graph = load_fixture("shapes");
        let circle = graph.lookup("classgeom_1_1_circle").expect("circle");

        let roots = class_hierarchy(&graph);
        assert!(
            roots.contains(&HierarchyNode::Placeholder {
                name: "Shape".into(),
                derived: vec![circle],
            }),
            "got: {roots:?}"
        );
        // The derived class is reachable only through its placeholder base.
        assert!(!roots.contains(&HierarchyNode::Documented(circle)));
    }
}
