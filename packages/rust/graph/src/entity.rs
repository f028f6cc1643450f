//! The entity data model: one node of the cross-referenced graph.
//!
//! Entities are stored exactly once in the [`EntityRegistry`] arena; child
//! lists, parents, and every categorization view refer to them by
//! [`EntityId`]. Rich-text fields are kept as unconverted XML snippets and
//! converted lazily through the graph's link resolver.
//!
//! [`EntityRegistry`]: crate::registry::EntityRegistry

use doxograph_shared::{Kind, Modifiers, RefId, SourceLocation, Visibility};

/// Arena index of an entity. Stable for the lifetime of one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A base/derived/include reference: resolved by refid through the registry
/// when documented, otherwise only the literal name survives.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub refid: Option<RefId>,
    pub name: String,
}

/// One function/define parameter, raw. `type_xml` and `default_xml` are XML
/// snippets (they may contain cross-references); the name is plain text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawParam {
    pub type_xml: Option<String>,
    pub name: Option<String>,
    pub default_xml: Option<String>,
}

/// One `#include` reported for a file compound.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInclude {
    pub name: String,
    /// Quoted include (`"x.h"`) vs. angle-bracket include (`<x.h>`).
    pub local: bool,
}

/// Unconverted description and signature data carried by an entity.
///
/// Snippet fields store the verbatim XML of the corresponding element;
/// conversion happens on access so cross-references can resolve against the
/// fully built graph.
#[derive(Debug, Clone, Default)]
pub struct RawFields {
    pub brief: Option<String>,
    pub details: Option<String>,
    pub type_xml: Option<String>,
    pub initializer: Option<String>,
    pub listing: Option<String>,
    /// Plain argument string, e.g. `(int x) const noexcept`.
    pub argsstring: Option<String>,
    /// Plain definition text, e.g. `int geom::Circle::area`.
    pub definition: Option<String>,
    pub params: Vec<RawParam>,
    pub template_params: Vec<RawParam>,
    pub includes: Vec<RawInclude>,
    pub bases: Vec<TypeRef>,
    pub derived: Vec<TypeRef>,
    pub reimplements: Option<RefId>,
}

/// One documented entity: compound, member, view root, or stub.
#[derive(Debug, Clone)]
pub struct Entity {
    pub refid: RefId,
    pub kind: Kind,
    /// Display name (qualified for compounds, bare for members).
    pub name: String,
    /// Page title; falls back to the name.
    pub title: String,
    /// Language tag from the extractor (e.g. `C++`), inherited by members.
    pub language: Option<String>,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub location: Option<SourceLocation>,
    /// Weak back-reference to the primary parent; overridden only by the
    /// files-view fixup pass.
    pub parent: Option<EntityId>,
    /// Owned children, in declaration order until the final name sort.
    pub children: Vec<EntityId>,
    /// Placeholder for a referenced-but-undocumented compound.
    pub stub: bool,
    pub raw: RawFields,
}

impl Entity {
    pub fn new(refid: RefId, kind: Kind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            refid,
            kind,
            title: name.clone(),
            name,
            language: None,
            visibility: Visibility::Public,
            modifiers: Modifiers::default(),
            location: None,
            parent: None,
            children: Vec::new(),
            stub: false,
            raw: RawFields::default(),
        }
    }

    /// Synthetic root entity anchoring one categorization view. Never bound
    /// in the refid map.
    pub fn view_root() -> Self {
        Self::new(RefId::new("root"), Kind::Root, "root")
    }

    /// Stub leaf for a compound that is listed but has no backing file.
    /// The kind defaults to the kind implied by the listing element.
    pub fn stub(refid: RefId, kind: Kind, fallback_name: impl Into<String>) -> Self {
        let mut entity = Self::new(refid, kind, fallback_name);
        entity.stub = true;
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_defaults() {
        let e = Entity::new(RefId::new("classgeom_circle"), Kind::Class, "geom::Circle");
        assert_eq!(e.title, "geom::Circle");
        assert_eq!(e.visibility, Visibility::Public);
        assert!(e.children.is_empty());
        assert!(!e.stub);
    }

    #[test]
    fn stub_is_marked() {
        let e = Entity::stub(RefId::new("classundoc"), Kind::Class, "Undoc");
        assert!(e.stub);
        assert_eq!(e.name, "Undoc");
        assert_eq!(e.kind, Kind::Class);
    }
}
