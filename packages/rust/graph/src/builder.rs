//! Compound-file ingestion: loads one `{refid}.xml` per compound, registers
//! the entity, then walks its inner-compound and member listings.
//!
//! Registration happens before children are parsed, and any refid that is
//! already bound short-circuits to the existing entity. Together these make
//! the walk safe for cyclic and shared references (a class listed by its
//! namespace, its file, and a group loads exactly once).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use doxograph_shared::{
    DoxographError, Kind, Modifiers, RefId, Result, SourceLocation, Visibility,
};

use crate::entity::{Entity, EntityId, RawInclude, RawParam, TypeRef};
use crate::registry::EntityRegistry;

/// Walks compound files under one XML directory into a registry.
pub struct GraphBuilder<'r> {
    registry: &'r mut EntityRegistry,
    xml_dir: PathBuf,
}

impl<'r> GraphBuilder<'r> {
    pub fn new(registry: &'r mut EntityRegistry, xml_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            xml_dir: xml_dir.into(),
        }
    }

    /// Load the compound `refid`, or reuse it if some earlier listing
    /// already loaded it. A listed compound whose backing file is missing
    /// becomes a stub leaf.
    pub fn compound(
        &mut self,
        refid: &RefId,
        fallback_kind: Kind,
        fallback_name: Option<&str>,
        parent: Option<EntityId>,
    ) -> Result<EntityId> {
        if let Some(existing) = self.registry.lookup(refid) {
            return Ok(existing);
        }

        let path = self.xml_dir.join(format!("{refid}.xml"));
        if !path.exists() {
            warn!(%refid, "compound file missing; creating stub");
            let fallback = fallback_name.unwrap_or(refid.as_str());
            let mut stub = Entity::stub(refid.clone(), fallback_kind, fallback);
            stub.parent = parent;
            return self.registry.register(stub);
        }

        debug!(%refid, path = %path.display(), "loading compound");
        let text = read_document(&path)?;
        let doc = Document::parse(&text)
            .map_err(|e| DoxographError::xml(&path, e.to_string()))?;
        let compounddef = first_child(doc.root_element(), "compounddef")
            .ok_or_else(|| DoxographError::MissingRoot { path: path.clone() })?;

        let kind = compounddef
            .attribute("kind")
            .and_then(Kind::parse)
            .unwrap_or_else(|| {
                warn!(%refid, "unrecognized compound kind; using listing kind");
                fallback_kind
            });
        let mut name = first_child(compounddef, "compoundname")
            .and_then(|n| n.text())
            .map(str::to_string)
            .unwrap_or_else(|| fallback_name.unwrap_or(refid.as_str()).to_string());
        if kind == Kind::Namespace {
            name = name.replacen("anonymous_namespace{", "anonymous namespace{", 1);
        }

        let mut entity = Entity::new(refid.clone(), kind, name);
        entity.parent = parent;
        entity.language = compounddef.attribute("language").map(str::to_string);
        entity.visibility = compounddef
            .attribute("prot")
            .map(Visibility::parse)
            .unwrap_or_default();
        if let Some(title) = first_child(compounddef, "title").and_then(|t| t.text()) {
            entity.title = title.to_string();
        }
        entity.location = first_child(compounddef, "location").map(parse_location);
        extract_shared_raw(&mut entity, compounddef, &text);
        extract_compound_raw(&mut entity, compounddef, &text);

        let language = entity.language.clone();
        let id = self.registry.register(entity)?;

        let mut children = Vec::new();
        self.attach_inner_compounds(compounddef, id, &mut children);
        self.attach_members(compounddef, id, language.as_deref(), &text, &mut children)?;
        self.registry.get_mut(id).children = children;

        Ok(id)
    }

    /// Walk the `inner*` listings of a compound. A failed child aborts only
    /// that listing slot.
    fn attach_inner_compounds(
        &mut self,
        compounddef: Node<'_, '_>,
        parent: EntityId,
        children: &mut Vec<EntityId>,
    ) {
        for inner in compounddef.children().filter(|c| c.is_element()) {
            let implied_kind = match inner.tag_name().name() {
                "innerclass" => Kind::Class,
                "innernamespace" => Kind::Namespace,
                "innerfile" => Kind::File,
                "innerdir" => Kind::Dir,
                "innergroup" => Kind::Group,
                _ => continue,
            };
            let Some(child_refid) = inner.attribute("refid") else {
                warn!(parent = %self.registry.get(parent).refid, "inner listing without refid");
                continue;
            };
            let visibility = inner.attribute("prot").map(Visibility::parse);
            // Non-public inner classes are implementation detail of their
            // enclosing type and stay out of the graph.
            if implied_kind == Kind::Class
                && visibility.is_some_and(|v| v != Visibility::Public)
            {
                continue;
            }

            let child_refid = RefId::from(child_refid);
            let already_loaded = self.registry.lookup(&child_refid).is_some();
            let fallback_name = inner.text().map(str::to_string);
            match self.compound(
                &child_refid,
                implied_kind,
                fallback_name.as_deref(),
                Some(parent),
            ) {
                Ok(child) => {
                    if !already_loaded {
                        if let Some(v) = visibility {
                            self.registry.get_mut(child).visibility = v;
                        }
                    } else {
                        // Index-scan parentage is provisional; the first
                        // compound that lists this child as inner claims it.
                        let provisional = self
                            .registry
                            .get(child)
                            .parent
                            .is_none_or(|p| self.registry.get(p).kind.is_root());
                        if provisional && child != parent {
                            self.registry.get_mut(child).parent = Some(parent);
                        }
                    }
                    children.push(child);
                }
                Err(e) => {
                    warn!(refid = %child_refid, error = %e, "skipping unloadable inner compound");
                }
            }
        }
    }

    /// Walk `sectiondef`/`memberdef` listings into member entities.
    fn attach_members(
        &mut self,
        compounddef: Node<'_, '_>,
        parent: EntityId,
        language: Option<&str>,
        doc_text: &str,
        children: &mut Vec<EntityId>,
    ) -> Result<()> {
        for sectiondef in child_elements(compounddef, "sectiondef") {
            for memberdef in child_elements(sectiondef, "memberdef") {
                let Some(kind) = memberdef.attribute("kind").and_then(Kind::parse) else {
                    continue;
                };
                if !kind.is_language() {
                    continue;
                }
                let Some(refid) = memberdef.attribute("id") else {
                    warn!("memberdef without id attribute");
                    continue;
                };
                let refid = RefId::from(refid);
                if let Some(existing) = self.registry.lookup(&refid) {
                    // Shared member (group listings repeat their members).
                    children.push(existing);
                    continue;
                }
                let id = self.member(memberdef, refid, kind, parent, language, doc_text)?;
                children.push(id);
            }
        }
        Ok(())
    }

    fn member(
        &mut self,
        memberdef: Node<'_, '_>,
        refid: RefId,
        kind: Kind,
        parent: EntityId,
        language: Option<&str>,
        doc_text: &str,
    ) -> Result<EntityId> {
        let name = first_child(memberdef, "name")
            .and_then(|n| n.text())
            .or_else(|| first_child(memberdef, "qualifiedname").and_then(|n| n.text()))
            .unwrap_or(refid.as_str())
            .to_string();

        let mut entity = Entity::new(refid, kind, name);
        entity.parent = Some(parent);
        entity.language = language.map(str::to_string);
        entity.visibility = memberdef
            .attribute("prot")
            .map(Visibility::parse)
            .unwrap_or_default();
        entity.modifiers = parse_modifiers(memberdef);
        entity.location = first_child(memberdef, "location").map(parse_location);

        extract_shared_raw(&mut entity, memberdef, doc_text);
        extract_member_raw(&mut entity, memberdef, doc_text);

        let id = self.registry.register(entity)?;

        let mut enum_values = Vec::new();
        for value in child_elements(memberdef, "enumvalue") {
            match self.enum_value(value, id, language, doc_text) {
                Ok(child) => enum_values.push(child),
                Err(e) => warn!(error = %e, "skipping enum value"),
            }
        }
        self.registry.get_mut(id).children = enum_values;

        Ok(id)
    }

    fn enum_value(
        &mut self,
        value: Node<'_, '_>,
        parent: EntityId,
        language: Option<&str>,
        doc_text: &str,
    ) -> Result<EntityId> {
        let refid = value
            .attribute("id")
            .ok_or_else(|| DoxographError::config("enumvalue without id attribute"))?;
        let name = first_child(value, "name")
            .and_then(|n| n.text())
            .unwrap_or(refid)
            .to_string();

        let mut entity = Entity::new(RefId::from(refid), Kind::EnumValue, name);
        entity.parent = Some(parent);
        entity.language = language.map(str::to_string);
        entity.visibility = value
            .attribute("prot")
            .map(Visibility::parse)
            .unwrap_or_default();
        extract_shared_raw(&mut entity, value, doc_text);
        entity.raw.initializer = first_child(value, "initializer").map(|n| snippet(doc_text, n));

        self.registry.register(entity)
    }
}

// ---------------------------------------------------------------------------
// Raw-field extraction
// ---------------------------------------------------------------------------

/// Carve the verbatim XML of an element out of its source document.
fn snippet(doc_text: &str, node: Node<'_, '_>) -> String {
    doc_text[node.range()].to_string()
}

/// Fields shared by compounds, members, and enum values.
fn extract_shared_raw(entity: &mut Entity, el: Node<'_, '_>, doc_text: &str) {
    entity.raw.brief = first_child(el, "briefdescription").map(|n| snippet(doc_text, n));
    entity.raw.details = first_child(el, "detaileddescription").map(|n| snippet(doc_text, n));
}

fn extract_compound_raw(entity: &mut Entity, compounddef: Node<'_, '_>, doc_text: &str) {
    entity.raw.listing =
        first_child(compounddef, "programlisting").map(|n| snippet(doc_text, n));
    entity.raw.template_params = first_child(compounddef, "templateparamlist")
        .map(|tpl| parse_params(tpl, doc_text))
        .unwrap_or_default();
    for include in child_elements(compounddef, "includes") {
        if let Some(name) = include.text() {
            entity.raw.includes.push(RawInclude {
                name: name.to_string(),
                local: include.attribute("local") == Some("yes"),
            });
        }
    }
    entity.raw.bases = parse_type_refs(compounddef, "basecompoundref");
    entity.raw.derived = parse_type_refs(compounddef, "derivedcompoundref");
}

fn extract_member_raw(entity: &mut Entity, memberdef: Node<'_, '_>, doc_text: &str) {
    entity.raw.type_xml = first_child(memberdef, "type").map(|n| snippet(doc_text, n));
    entity.raw.initializer = first_child(memberdef, "initializer").map(|n| snippet(doc_text, n));
    entity.raw.argsstring = first_child(memberdef, "argsstring")
        .and_then(|n| n.text())
        .map(str::to_string);
    entity.raw.definition = first_child(memberdef, "definition")
        .and_then(|n| n.text())
        .map(str::to_string);
    entity.raw.params = parse_params(memberdef, doc_text);
    entity.raw.template_params = first_child(memberdef, "templateparamlist")
        .map(|tpl| parse_params(tpl, doc_text))
        .unwrap_or_default();
    entity.raw.reimplements = first_child(memberdef, "reimplements")
        .and_then(|n| n.attribute("refid"))
        .map(RefId::from);
}

fn parse_params(el: Node<'_, '_>, doc_text: &str) -> Vec<RawParam> {
    child_elements(el, "param")
        .map(|param| RawParam {
            type_xml: first_child(param, "type").map(|n| snippet(doc_text, n)),
            name: first_child(param, "declname")
                .or_else(|| first_child(param, "defname"))
                .and_then(|n| n.text())
                .map(str::to_string),
            default_xml: first_child(param, "defval").map(|n| snippet(doc_text, n)),
        })
        .collect()
}

fn parse_type_refs(el: Node<'_, '_>, tag: &str) -> Vec<TypeRef> {
    child_elements(el, tag)
        .map(|r| TypeRef {
            refid: r.attribute("refid").map(RefId::from),
            name: r.text().unwrap_or("").to_string(),
        })
        .collect()
}

fn parse_modifiers(memberdef: Node<'_, '_>) -> Modifiers {
    let yes = |attr: &str| memberdef.attribute(attr) == Some("yes");
    let virt = memberdef.attribute("virt").unwrap_or("non-virtual");
    Modifiers {
        is_static: yes("static"),
        is_virtual: virt == "virtual" || virt == "pure-virtual",
        is_pure_virtual: virt == "pure-virtual",
        is_explicit: yes("explicit"),
        is_inline: yes("inline"),
        is_const: yes("const"),
        is_mutable: yes("mutable"),
    }
}

fn parse_location(location: Node<'_, '_>) -> SourceLocation {
    let num = |attr: &str| {
        location
            .attribute(attr)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };
    SourceLocation {
        file: location.attribute("file").unwrap_or("").to_string(),
        line: num("line"),
        column: num("column"),
        body_start: num("bodystart"),
        body_end: num("bodyend"),
    }
}

// ---------------------------------------------------------------------------
// Document loading
// ---------------------------------------------------------------------------

/// Read a compound file, recovering from invalid UTF-8 by lossy decoding.
/// Extractors occasionally emit raw bytes copied from source comments.
pub(crate) fn read_document(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            warn!(path = %path.display(), "invalid UTF-8; decoding lossily");
            let bytes = fs::read(path).map_err(|e| DoxographError::io(path, e))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        Err(e) => Err(DoxographError::io(path, e)),
    }
}

// ---------------------------------------------------------------------------
// XML helpers
// ---------------------------------------------------------------------------

pub(crate) fn child_elements<'a, 'd: 'a>(
    el: Node<'a, 'd>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'd>> + 'a {
    el.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

pub(crate) fn first_child<'a, 'd>(el: Node<'a, 'd>, name: &str) -> Option<Node<'a, 'd>> {
    el.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

#[cfg(test)]
mod tests {
    use doxograph_shared::DuplicateIdPolicy;

    use super::*;

    fn fixture_dir(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/xml")
            .join(name)
    }

    #[test]
    fn missing_file_yields_stub() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let mut builder = GraphBuilder::new(&mut registry, fixture_dir("shapes"));
        let refid = RefId::from("classnowhere_to_be_found");
        let id = builder
            .compound(&refid, Kind::Class, Some("Nowhere"), None)
            .expect("stub");
        let entity = registry.get(id);
        assert!(entity.stub);
        assert_eq!(entity.name, "Nowhere");
        assert_eq!(entity.kind, Kind::Class);
        assert_eq!(registry.lookup(&refid), Some(id));
    }

    #[test]
    fn repeated_load_reuses_the_registration() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let mut builder = GraphBuilder::new(&mut registry, fixture_dir("shapes"));
        let refid = RefId::from("classgeom_1_1_circle");
        let first = builder
            .compound(&refid, Kind::Class, None, None)
            .expect("load");
        let second = builder
            .compound(&refid, Kind::Class, None, None)
            .expect("reload");
        assert_eq!(first, second);
    }

    #[test]
    fn class_members_and_modifiers() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let mut builder = GraphBuilder::new(&mut registry, fixture_dir("shapes"));
        let id = builder
            .compound(&RefId::from("classgeom_1_1_circle"), Kind::Class, None, None)
            .expect("load");
        let circle = registry.get(id);
        assert_eq!(circle.name, "geom::Circle");
        assert_eq!(circle.language.as_deref(), Some("C++"));

        let area = circle
            .children
            .iter()
            .map(|&c| registry.get(c))
            .find(|e| e.name == "area")
            .expect("area member");
        assert!(area.modifiers.is_const);
        assert!(area.modifiers.is_virtual);
        assert!(!area.modifiers.is_static);
        assert_eq!(area.visibility, Visibility::Public);
        assert_eq!(area.language.as_deref(), Some("C++"));
    }

    #[test]
    fn private_members_are_kept_private_inner_classes_are_not() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let mut builder = GraphBuilder::new(&mut registry, fixture_dir("shapes"));
        let id = builder
            .compound(&RefId::from("classgeom_1_1_circle"), Kind::Class, None, None)
            .expect("load");
        let circle = registry.get(id);
        let radius = circle
            .children
            .iter()
            .map(|&c| registry.get(c))
            .find(|e| e.name == "radius_")
            .expect("private field");
        assert_eq!(radius.visibility, Visibility::Private);
        assert!(
            !circle
                .children
                .iter()
                .any(|&c| registry.get(c).refid.as_str() == "classgeom_1_1_circle_1_1_impl"),
            "private inner class must be dropped"
        );
    }

    #[test]
    fn namespace_loads_inner_class_and_stub() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let mut builder = GraphBuilder::new(&mut registry, fixture_dir("shapes"));
        let id = builder
            .compound(&RefId::from("namespacegeom"), Kind::Namespace, None, None)
            .expect("load");
        let ns = registry.get(id);
        assert_eq!(ns.name, "geom");

        let circle = registry
            .lookup_str("classgeom_1_1_circle")
            .expect("inner class loaded");
        assert!(ns.children.contains(&circle));
        assert_eq!(registry.get(circle).parent, Some(id));

        // Listed but without a backing file.
        let detail = registry
            .lookup_str("namespacegeom_1_1detail")
            .expect("stub registered");
        assert!(registry.get(detail).stub);
        assert!(ns.children.contains(&detail));
    }

    #[test]
    fn anonymous_namespace_name_is_humanized() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let mut builder = GraphBuilder::new(&mut registry, fixture_dir("anon"));
        let id = builder
            .compound(
                &RefId::from("namespaceanonymous__namespace_02util_8cpp_03"),
                Kind::Namespace,
                None,
                None,
            )
            .expect("load");
        assert_eq!(registry.get(id).name, "anonymous namespace{util.cpp}");
    }

    #[test]
    fn lossy_recovery_of_invalid_utf8() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let mut builder = GraphBuilder::new(&mut registry, fixture_dir("badutf8"));
        let id = builder
            .compound(&RefId::from("classmojibake"), Kind::Class, None, None)
            .expect("lossy load");
        let entity = registry.get(id);
        assert!(!entity.stub);
        assert_eq!(entity.name, "Mojibake");
    }

    #[test]
    fn enum_values_become_children() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let mut builder = GraphBuilder::new(&mut registry, fixture_dir("shapes"));
        builder
            .compound(&RefId::from("classgeom_1_1_circle"), Kind::Class, None, None)
            .expect("load");
        let color = registry
            .lookup_str("classgeom_1_1_circle_1a_color")
            .expect("enum registered");
        let values: Vec<_> = registry
            .get(color)
            .children
            .iter()
            .map(|&c| registry.get(c))
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.kind == Kind::EnumValue));
        assert_eq!(values[0].name, "Red");
        assert!(values[0].raw.initializer.is_some());
    }
}
