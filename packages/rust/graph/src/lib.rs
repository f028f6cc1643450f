//! Cross-referenced entity graph over extractor XML output.
//!
//! [`DoxygenGraph::load`] scans `index.xml`, ingests every listed compound
//! file into a de-duplicated arena, and normalizes five categorization
//! views. The loaded graph then answers derived questions: URLs and
//! anchors, overload numbering, qualified names, reconstructed signatures,
//! base/derived class links, and rendered descriptions.

pub mod builder;
pub mod derived;
pub mod entity;
pub mod hierarchy;
pub mod registry;
pub mod views;

use std::path::Path;

use roxmltree::Document;
use tracing::{debug, instrument, warn};

use doxograph_doctree::{
    LinkResolver, ResolvedLink, brief_from_xml, escape, listing_from_xml, markdown_from_xml,
    plain_from_xml,
};
use doxograph_shared::{BuildConfig, DoxographError, Kind, RefId, Result, Visibility};

use builder::{GraphBuilder, child_elements, first_child, read_document};
use entity::{Entity, EntityId, TypeRef};
use registry::EntityRegistry;
use views::Views;

pub use entity::{RawInclude, RawParam};
pub use hierarchy::{HierarchyNode, class_hierarchy};

/// A base- or derived-class reference after resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    /// The referenced class is in the graph.
    Entity(EntityId),
    /// Only the literal name is known.
    Unresolved(String),
}

/// Child filter for [`DoxygenGraph::query`]. Empty/`None` fields match all.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberQuery<'a> {
    pub kinds: &'a [Kind],
    pub visibility: Option<Visibility>,
    pub is_static: Option<bool>,
}

/// The fully loaded, normalized entity graph.
#[derive(Debug)]
pub struct DoxygenGraph {
    registry: EntityRegistry,
    views: Views,
    link_prefix: String,
}

impl DoxygenGraph {
    /// Build the graph from an extractor XML directory.
    ///
    /// Reads `index.xml`, loads each listed compound into the view its kind
    /// belongs to, then de-duplicates, re-parents files under directories,
    /// and sorts every view by name. A compound that fails to load is
    /// skipped with a warning; only a missing or unreadable index is fatal.
    #[instrument(skip(config), fields(xml_dir = %xml_dir.display()))]
    pub fn load(xml_dir: &Path, config: &BuildConfig) -> Result<Self> {
        let mut registry = EntityRegistry::new(config.on_duplicate_id);
        let views = Views {
            root: registry.insert_detached(Entity::view_root()),
            groups: registry.insert_detached(Entity::view_root()),
            files: registry.insert_detached(Entity::view_root()),
            pages: registry.insert_detached(Entity::view_root()),
            examples: registry.insert_detached(Entity::view_root()),
        };

        let index_path = xml_dir.join("index.xml");
        let text = read_document(&index_path)?;
        let doc = Document::parse(&text)
            .map_err(|e| DoxographError::xml(&index_path, e.to_string()))?;

        let mut routed: Vec<(EntityId, EntityId)> = Vec::new();
        {
            let mut builder = GraphBuilder::new(&mut registry, xml_dir);
            for compound in child_elements(doc.root_element(), "compound") {
                let Some(refid) = compound.attribute("refid") else {
                    warn!("index entry without refid");
                    continue;
                };
                let Some(kind) = compound.attribute("kind").and_then(Kind::parse) else {
                    warn!(refid, "index entry with unrecognized kind");
                    continue;
                };
                let view = if kind.is_language() {
                    views.root
                } else {
                    match kind {
                        Kind::Group => views.groups,
                        Kind::File | Kind::Dir => views.files,
                        Kind::Page => views.pages,
                        Kind::Example => views.examples,
                        _ => continue,
                    }
                };
                let name = first_child(compound, "name").and_then(|n| n.text());
                let refid = RefId::from(refid);
                match builder.compound(&refid, kind, name, Some(view)) {
                    Ok(id) => routed.push((view, id)),
                    Err(e) => warn!(%refid, error = %e, "skipping unloadable compound"),
                }
            }
        }
        for (view, id) in routed {
            registry.get_mut(view).children.push(id);
        }
        debug!(entities = registry.len(), "compound scan complete");

        views::fix_duplicates(&mut registry, views.root, &[]);
        views::fix_duplicates(&mut registry, views.groups, &[Kind::Group]);
        views::fix_duplicates(&mut registry, views.files, &[Kind::File, Kind::Dir]);
        views::fix_duplicates(&mut registry, views.examples, &[Kind::Example]);
        views::fix_parents(&mut registry, views.files);
        for view in views.all() {
            views::sort_recursive(&mut registry, view);
        }

        Ok(Self {
            registry,
            views,
            link_prefix: config.link_prefix.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Structure access
    // -----------------------------------------------------------------------

    pub fn views(&self) -> Views {
        self.views
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        self.registry.get(id)
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        &self.registry.get(id).children
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.registry.get(id).parent
    }

    pub fn lookup(&self, refid: &str) -> Option<EntityId> {
        self.registry.lookup_str(refid)
    }

    /// Direct children of `parent` matching a filter, in child order.
    pub fn query(&self, parent: EntityId, filter: &MemberQuery<'_>) -> Vec<EntityId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| {
                let e = self.entity(c);
                (filter.kinds.is_empty() || filter.kinds.contains(&e.kind))
                    && filter.visibility.is_none_or(|v| e.visibility == v)
                    && filter.is_static.is_none_or(|s| e.modifiers.is_static == s)
            })
            .collect()
    }

    /// All entities of the given kinds in the subtrees under `roots`.
    pub fn find_recursive(&self, roots: &[EntityId], kinds: &[Kind]) -> Vec<EntityId> {
        let mut found = Vec::new();
        for &root in roots {
            self.collect(root, &mut |e: &Entity| kinds.contains(&e.kind), &mut found);
        }
        found
    }

    /// Entities of `kinds` whose direct parent has one of `parent_kinds`.
    pub fn find_with_parent(
        &self,
        roots: &[EntityId],
        kinds: &[Kind],
        parent_kinds: &[Kind],
    ) -> Vec<EntityId> {
        self.find_recursive(roots, kinds)
            .into_iter()
            .filter(|&id| {
                self.parent(id)
                    .is_some_and(|p| parent_kinds.contains(&self.entity(p).kind))
            })
            .collect()
    }

    fn collect(
        &self,
        node: EntityId,
        pred: &mut impl FnMut(&Entity) -> bool,
        out: &mut Vec<EntityId>,
    ) {
        for &child in self.children(node) {
            if pred(self.entity(child)) && !out.contains(&child) {
                out.push(child);
            }
            self.collect(child, pred, out);
        }
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    /// Fully scope-qualified display name. Compound names arrive already
    /// qualified; members chain through scope-container parents.
    pub fn qualified_name(&self, id: EntityId) -> String {
        let e = self.entity(id);
        if !e.kind.is_parent() {
            if let Some(p) = e.parent {
                if self.entity(p).kind.is_parent() {
                    return format!("{}::{}", self.qualified_name(p), e.name);
                }
            }
        }
        e.name.clone()
    }

    /// Last name token, Markdown-escaped.
    pub fn name_short(&self, id: EntityId) -> String {
        let e = self.entity(id);
        let tokens = derived::name_tokens(e.kind, &e.name);
        escape(tokens.last().map(String::as_str).unwrap_or(&e.name))
    }

    /// Full qualified name, Markdown-escaped.
    pub fn name_long(&self, id: EntityId) -> String {
        escape(&self.qualified_name(id))
    }

    // -----------------------------------------------------------------------
    // Overload numbering
    // -----------------------------------------------------------------------

    fn operator_position(&self, id: EntityId) -> usize {
        let Some(parent) = self.parent(id) else {
            return 1;
        };
        let mut position = 0;
        for &sibling in self.children(parent) {
            let e = self.entity(sibling);
            if e.kind.is_function() && derived::is_operator(&e.name) {
                position += 1;
            }
            if sibling == id {
                break;
            }
        }
        position.max(1)
    }

    /// Number of same-named function siblings, counting only members of a
    /// class or struct. 1 means not overloaded.
    pub fn overload_total(&self, id: EntityId) -> usize {
        let e = self.entity(id);
        if !e.kind.is_function() {
            return 1;
        }
        let Some(parent) = e.parent else {
            return 1;
        };
        if !self.entity(parent).kind.is_class_or_struct() {
            return 1;
        }
        self.children(parent)
            .iter()
            .filter(|&&s| {
                let sib = self.entity(s);
                sib.kind.is_function() && sib.name == e.name
            })
            .count()
            .max(1)
    }

    /// 1-based position of this function among its same-named siblings, in
    /// structural order.
    pub fn overload_num(&self, id: EntityId) -> usize {
        let e = self.entity(id);
        let Some(parent) = e.parent else {
            return 1;
        };
        let mut num = 0;
        for &sibling in self.children(parent) {
            let sib = self.entity(sibling);
            if sib.kind.is_function() && sib.name == e.name {
                num += 1;
            }
            if sibling == id {
                break;
            }
        }
        num.max(1)
    }

    /// `[n/N]` marker for overloaded functions, empty otherwise. Operators
    /// are disambiguated through their anchor instead.
    pub fn overload_suffix(&self, id: EntityId) -> String {
        let e = self.entity(id);
        if derived::is_operator(&e.name) {
            return String::new();
        }
        let total = self.overload_total(id);
        if total > 1 {
            format!("[{}/{}]", self.overload_num(id), total)
        } else {
            String::new()
        }
    }

    // -----------------------------------------------------------------------
    // Anchors and URLs
    // -----------------------------------------------------------------------

    /// In-page anchor: `<kind>-<name>`, with operators collapsed to a
    /// positional token and overloads suffixed by position.
    pub fn anchor(&self, id: EntityId) -> String {
        let e = self.entity(id);
        let is_op = e.kind.is_function() && derived::is_operator(&e.name);
        let mut name = if is_op {
            let position = self.operator_position(id);
            if position <= 1 {
                "operator".to_string()
            } else {
                format!("operator_{}", position - 1)
            }
        } else {
            let tokens = derived::name_tokens(e.kind, &e.name);
            derived::url_safe(tokens.last().map(String::as_str).unwrap_or(&e.name))
        };
        if !is_op {
            let total = self.overload_total(id);
            if total > 1 {
                name.push_str(&format!("-{}{}", self.overload_num(id), total));
            }
        }
        let anchor = format!("{}-{}", e.kind.as_str(), name);
        anchor.trim_matches('-').to_string()
    }

    /// Page URL for compounds with their own page; `page#anchor` otherwise.
    pub fn url(&self, id: EntityId) -> String {
        let e = self.entity(id);
        if e.kind.has_own_page() {
            format!("{}{}.md", self.link_prefix, e.refid)
        } else if let Some(parent) = e.parent {
            format!("{}#{}", self.url(parent), self.anchor(id))
        } else {
            format!("#{}", self.anchor(id))
        }
    }

    /// URL of the source-listing page (files only; everything else links to
    /// its regular page).
    pub fn url_source(&self, id: EntityId) -> String {
        let e = self.entity(id);
        if e.kind.is_file() {
            format!("{}{}_source.md", self.link_prefix, e.refid)
        } else {
            self.url(id)
        }
    }

    // -----------------------------------------------------------------------
    // Descriptions (lazy conversion of stored snippets)
    // -----------------------------------------------------------------------

    /// Brief description as single-line italic Markdown.
    pub fn brief(&self, id: EntityId) -> String {
        match &self.entity(id).raw.brief {
            Some(xml) => brief_from_xml(xml, self),
            None => String::new(),
        }
    }

    /// Detailed description as Markdown.
    pub fn details(&self, id: EntityId) -> String {
        match &self.entity(id).raw.details {
            Some(xml) => markdown_from_xml(xml, self, false),
            None => String::new(),
        }
    }

    /// Member type as Markdown (cross-references become links).
    pub fn type_md(&self, id: EntityId) -> String {
        match &self.entity(id).raw.type_xml {
            Some(xml) => markdown_from_xml(xml, self, false).trim().to_string(),
            None => String::new(),
        }
    }

    pub fn type_plain(&self, id: EntityId) -> String {
        match &self.entity(id).raw.type_xml {
            Some(xml) => plain_from_xml(xml),
            None => String::new(),
        }
    }

    pub fn initializer_plain(&self, id: EntityId) -> String {
        match &self.entity(id).raw.initializer {
            Some(xml) => plain_from_xml(xml),
            None => String::new(),
        }
    }

    /// Source listing of a file or example compound, as a fenced block.
    pub fn listing(&self, id: EntityId) -> String {
        match &self.entity(id).raw.listing {
            Some(xml) => listing_from_xml(xml),
            None => String::new(),
        }
    }

    /// Trailing specifier clause of a function signature.
    pub fn specifiers(&self, id: EntityId) -> String {
        let e = self.entity(id);
        derived::trailing_specifiers(e.raw.argsstring.as_deref(), &e.modifiers)
    }

    // -----------------------------------------------------------------------
    // Reconstructed signatures
    // -----------------------------------------------------------------------

    /// Fenced code block reconstructing the member's declaration.
    pub fn codeblock(&self, id: EntityId) -> String {
        let e = self.entity(id);
        let code = match e.kind {
            Kind::Function | Kind::Friend | Kind::Signal | Kind::Slot => self.function_code(id),
            Kind::Enum => self.enum_code(id),
            Kind::Define => self.define_code(id),
            _ => {
                let mut line = e
                    .raw
                    .definition
                    .clone()
                    .unwrap_or_else(|| e.name.clone());
                let init = self.initializer_plain(id);
                if !init.is_empty() {
                    line.push(' ');
                    line.push_str(&init);
                }
                line.push(';');
                line
            }
        };
        format!("```{}\n{}\n```", fence_language(e.language.as_deref()), code)
    }

    fn function_code(&self, id: EntityId) -> String {
        let e = self.entity(id);
        let mut code = String::new();
        if !e.raw.template_params.is_empty() {
            code.push_str(&format!(
                "template <{}>\n",
                self.param_list(&e.raw.template_params)
            ));
        }
        let m = &e.modifiers;
        for (flag, token) in [
            (m.is_static, "static "),
            (m.is_inline, "inline "),
            (m.is_explicit, "explicit "),
            (m.is_virtual, "virtual "),
        ] {
            if flag {
                code.push_str(token);
            }
        }
        let ret = self.type_plain(id);
        if !ret.is_empty() {
            code.push_str(&ret);
            code.push(' ');
        }
        code.push_str(&e.name);
        if e.raw.params.is_empty() {
            code.push_str(" ()");
        } else {
            code.push_str(" (\n");
            let rendered: Vec<String> = e
                .raw
                .params
                .iter()
                .map(|p| format!("    {}", self.param_text(p)))
                .collect();
            code.push_str(&rendered.join(",\n"));
            code.push_str("\n)");
        }
        let specifiers = self.specifiers(id);
        if !specifiers.is_empty() {
            code.push(' ');
            code.push_str(&specifiers);
        }
        code
    }

    fn enum_code(&self, id: EntityId) -> String {
        let e = self.entity(id);
        let mut code = format!("enum {} {{\n", e.name);
        let values: Vec<String> = self
            .children(id)
            .iter()
            .map(|&v| {
                let value = self.entity(v);
                let init = self.initializer_plain(v);
                if init.is_empty() {
                    format!("    {}", value.name)
                } else {
                    format!("    {} {}", value.name, init)
                }
            })
            .collect();
        code.push_str(&values.join(",\n"));
        code.push_str("\n};");
        code
    }

    fn define_code(&self, id: EntityId) -> String {
        let e = self.entity(id);
        let mut code = format!("#define {}", e.name);
        if !e.raw.params.is_empty() {
            let names: Vec<&str> = e
                .raw
                .params
                .iter()
                .map(|p| p.name.as_deref().unwrap_or(""))
                .collect();
            code.push_str(&format!("({})", names.join(", ")));
        }
        let init = self.initializer_plain(id);
        if !init.is_empty() {
            code.push(' ');
            code.push_str(&init);
        }
        code
    }

    fn param_list(&self, params: &[RawParam]) -> String {
        let rendered: Vec<String> = params.iter().map(|p| self.param_text(p)).collect();
        rendered.join(", ")
    }

    fn param_text(&self, param: &RawParam) -> String {
        let mut text = param
            .type_xml
            .as_deref()
            .map(plain_from_xml)
            .unwrap_or_default();
        if let Some(name) = &param.name {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(name);
        }
        if let Some(defval) = &param.default_xml {
            text.push_str(&format!(" = {}", plain_from_xml(defval)));
        }
        text
    }

    // -----------------------------------------------------------------------
    // Inheritance
    // -----------------------------------------------------------------------

    pub fn base_classes(&self, id: EntityId) -> Vec<ClassRef> {
        self.resolve_refs(&self.entity(id).raw.bases)
    }

    pub fn derived_classes(&self, id: EntityId) -> Vec<ClassRef> {
        self.resolve_refs(&self.entity(id).raw.derived)
    }

    pub fn reimplements(&self, id: EntityId) -> Option<EntityId> {
        self.entity(id)
            .raw
            .reimplements
            .as_ref()
            .and_then(|refid| self.registry.lookup(refid))
    }

    fn resolve_refs(&self, refs: &[TypeRef]) -> Vec<ClassRef> {
        refs.iter()
            .map(|r| {
                r.refid
                    .as_ref()
                    .and_then(|refid| self.registry.lookup(refid))
                    .map_or_else(|| ClassRef::Unresolved(r.name.clone()), ClassRef::Entity)
            })
            .collect()
    }
}

impl LinkResolver for DoxygenGraph {
    fn resolve(&self, refid: &str) -> Option<ResolvedLink> {
        let id = self.lookup(refid)?;
        Some(ResolvedLink {
            url: self.url(id),
            title: self.qualified_name(id),
        })
    }
}

fn fence_language(language: Option<&str>) -> &'static str {
    match language {
        Some("C++") | None => "cpp",
        Some("C") => "c",
        Some("C#") => "csharp",
        Some("Python") => "python",
        Some("Java") => "java",
        _ => "",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
