//! Recursive-descent conversion of rich-text description XML into the
//! document AST.
//!
//! Control is pure recursive descent dispatching on tag name over a closed
//! set of recognized tags; unrecognized tags degrade to their plain text.
//! Cross-references are resolved through a [`LinkResolver`]; an unresolved
//! or missing id degrades to the link's literal text and never fails.

use roxmltree::{Document, Node};
use tracing::warn;

use crate::{DocNode, TableRow, render_nodes};

// ---------------------------------------------------------------------------
// Link resolution
// ---------------------------------------------------------------------------

/// A resolved cross-reference target.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    /// Relative URL of the target's page (or page#anchor).
    pub url: String,
    /// Display title used when the reference carries no literal text.
    pub title: String,
}

/// Resolves a refid to a link target. Implemented by the entity graph;
/// tests use a map, and [`NoLinks`] resolves nothing.
pub trait LinkResolver {
    fn resolve(&self, refid: &str) -> Option<ResolvedLink>;
}

/// Resolver that knows no targets; every reference degrades to plain text.
pub struct NoLinks;

impl LinkResolver for NoLinks {
    fn resolve(&self, _refid: &str) -> Option<ResolvedLink> {
        None
    }
}

// ---------------------------------------------------------------------------
// Simple-section titles
// ---------------------------------------------------------------------------

/// Human-readable labels for admonition-like blocks.
fn section_title(kind: &str) -> String {
    let label = match kind {
        "see" => "See also:",
        "note" => "Note:",
        "bug" => "Bug:",
        "warning" => "Warning:",
        "return" | "returns" => "Returns:",
        "param" => "Parameters:",
        "templateparam" => "Template parameters:",
        "retval" => "Return value:",
        "author" => "Author:",
        "authors" => "Authors:",
        "since" => "Since:",
        "pre" => "Precondition:",
        "remark" => "Remark:",
        "copyright" => "Copyright:",
        "post" => "Postcondition:",
        "attention" => "Attention:",
        "invariant" => "Invariant:",
        "exception" => "Exception:",
        "date" => "Date:",
        "version" => "Version:",
        _ => {
            // Unlisted kinds get a capitalized fallback label.
            let mut chars = kind.chars();
            return match chars.next() {
                Some(c) => format!("{}{}:", c.to_uppercase(), chars.as_str()),
                None => String::new(),
            };
        }
    };
    label.to_string()
}

// ---------------------------------------------------------------------------
// Snippet entry points
// ---------------------------------------------------------------------------

/// Convert a raw description XML snippet to Markdown. The snippet's root
/// element is the stored description container; its children are converted.
pub fn markdown_from_xml(xml: &str, resolver: &dyn LinkResolver, italic: bool) -> String {
    match Document::parse(xml) {
        Ok(doc) => render_nodes(&convert_children(doc.root_element(), resolver, italic)),
        Err(e) => {
            warn!(error = %e, "description snippet failed to re-parse");
            String::new()
        }
    }
}

/// Convert a `<briefdescription>` snippet: each paragraph converted in
/// italic mode, paragraphs joined by a space.
pub fn brief_from_xml(xml: &str, resolver: &dyn LinkResolver) -> String {
    let Ok(doc) = Document::parse(xml) else {
        return String::new();
    };
    let parts: Vec<String> = child_elements(doc.root_element(), "para")
        .map(|para| render_nodes(&convert_children(para, resolver, true)))
        .collect();
    parts.join(" ").trim_end().to_string()
}

/// Extract the whitespace-normalized plain text of a snippet, dropping all
/// markup. Used for source-code-like signatures.
pub fn plain_from_xml(xml: &str) -> String {
    match Document::parse(xml) {
        Ok(doc) => plain_text(doc.root_element()),
        Err(_) => String::new(),
    }
}

/// Convert a `<programlisting>` snippet to a fenced Markdown code block.
pub fn listing_from_xml(xml: &str) -> String {
    match Document::parse(xml) {
        Ok(doc) => render_nodes(&convert_listing(doc.root_element())),
        Err(e) => {
            warn!(error = %e, "program listing failed to re-parse");
            String::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Node helpers
// ---------------------------------------------------------------------------

fn child_elements<'a, 'd: 'a>(
    el: Node<'a, 'd>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'd>> + 'a {
    el.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

fn first_child<'a, 'd>(el: Node<'a, 'd>, name: &str) -> Option<Node<'a, 'd>> {
    el.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

/// Trimmed text fragments of a subtree, in document order.
fn plain_pieces(el: Node<'_, '_>, out: &mut Vec<String>) {
    for child in el.children() {
        if child.is_text() {
            let piece = child.text().unwrap_or("").trim();
            if !piece.is_empty() {
                out.push(piece.to_string());
            }
        } else if child.is_element() {
            plain_pieces(child, out);
        }
    }
}

/// Whitespace-joined plain text of a subtree.
pub fn plain_text(el: Node<'_, '_>) -> String {
    let mut pieces = Vec::new();
    plain_pieces(el, &mut pieces);
    pieces.join(" ")
}

/// One listing line: concatenated highlight-span text, with explicit `<sp/>`
/// markers turned into spaces.
fn listing_line_text(el: Node<'_, '_>, line: &mut String) {
    for child in el.children() {
        if child.is_text() {
            line.push_str(child.text().unwrap_or(""));
        } else if child.is_element() {
            if child.tag_name().name() == "sp" {
                line.push(' ');
            }
            listing_line_text(child, line);
        }
    }
}

/// A formula is a block equation when it is the sole element of its
/// paragraph with no trailing text; otherwise it renders inline.
fn is_block_formula(para: Node<'_, '_>, formula: Node<'_, '_>) -> bool {
    let element_count = para.children().filter(|c| c.is_element()).count();
    if element_count != 1 {
        return false;
    }
    let mut seen = false;
    for sibling in para.children() {
        if seen && sibling.is_text() {
            let tail = sibling.text().unwrap_or("");
            if !tail.trim().is_empty() {
                return false;
            }
        }
        if sibling == formula {
            seen = true;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert a `<programlisting>` element into a fenced code block.
pub fn convert_listing(el: Node<'_, '_>) -> Vec<DocNode> {
    if el.tag_name().name() != "programlisting" {
        return Vec::new();
    }
    let language = el
        .attribute("filename")
        .map(|f| f.trim_start_matches('.').to_string())
        .filter(|l| !l.is_empty());
    let mut lines = Vec::new();
    for codeline in child_elements(el, "codeline") {
        let mut line = String::new();
        for highlight in child_elements(codeline, "highlight") {
            listing_line_text(highlight, &mut line);
        }
        lines.push(line);
    }
    vec![DocNode::Text("\n".into()), DocNode::CodeBlock { language, lines }]
}

/// Convert the children of a description element into AST nodes.
///
/// `italic` wraps bare text in italics (brief descriptions render this way).
pub fn convert_children(
    el: Node<'_, '_>,
    resolver: &dyn LinkResolver,
    italic: bool,
) -> Vec<DocNode> {
    let mut out: Vec<DocNode> = Vec::new();

    for item in el.children() {
        if item.is_text() {
            let text = item.text().unwrap_or("");
            if italic {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(DocNode::Italic(vec![DocNode::Text(trimmed.into())]));
                    out.push(DocNode::Text(" ".into()));
                }
            } else if !text.is_empty() {
                out.push(DocNode::Text(text.into()));
            }
            continue;
        }
        if !item.is_element() {
            continue;
        }

        match item.tag_name().name() {
            "para" => {
                out.push(DocNode::Paragraph(convert_children(item, resolver, italic)));
                out.push(DocNode::Text("\n".into()));
            }

            "image" => {
                if let Some(url) = item.attribute("name") {
                    out.push(DocNode::Image { url: url.into() });
                }
            }

            "computeroutput" => {
                out.push(DocNode::InlineCode(plain_text(item)));
            }

            "programlisting" => {
                out.extend(convert_listing(item));
            }

            "table" => {
                let mut rows = Vec::new();
                for row in child_elements(item, "row") {
                    let mut cells = Vec::new();
                    for entry in child_elements(row, "entry") {
                        for para in child_elements(entry, "para") {
                            cells.push(convert_children(para, resolver, false));
                        }
                    }
                    rows.push(TableRow { cells });
                }
                out.push(DocNode::Table { rows });
            }

            "blockquote" => {
                let mut children = Vec::new();
                for para in child_elements(item, "para") {
                    children.extend(convert_children(para, resolver, false));
                }
                out.push(DocNode::BlockQuote(children));
            }

            "heading" => {
                if let Some(level) = item.attribute("level").and_then(|l| l.parse::<u8>().ok()) {
                    out.push(DocNode::Header {
                        level,
                        children: convert_children(item, resolver, false),
                    });
                }
            }

            tag @ ("orderedlist" | "itemizedlist") => {
                let mut items = Vec::new();
                for listitem in child_elements(item, "listitem") {
                    let mut para_item = Vec::new();
                    for para in child_elements(listitem, "para") {
                        para_item.extend(convert_children(para, resolver, false));
                    }
                    items.push(DocNode::Paragraph(para_item));
                }
                out.push(DocNode::List {
                    ordered: tag == "orderedlist",
                    items,
                });
            }

            "ref" => {
                let literal = item.text().unwrap_or("");
                match item.attribute("refid").and_then(|id| resolver.resolve(id)) {
                    Some(link) => {
                        let label = if literal.is_empty() {
                            link.title.clone()
                        } else {
                            literal.to_string()
                        };
                        let bold = DocNode::Bold(vec![DocNode::Text(label)]);
                        let children = if italic {
                            vec![DocNode::Italic(vec![bold])]
                        } else {
                            vec![bold]
                        };
                        out.push(DocNode::Link {
                            children,
                            target: link.url,
                        });
                    }
                    // Unresolved or missing id: degrade to the literal text.
                    None => {
                        if !literal.is_empty() {
                            out.push(DocNode::Text(literal.into()));
                        }
                    }
                }
            }

            tag @ ("sect1" | "sect2" | "sect3" | "sect4" | "sect5") => {
                let level = match tag {
                    "sect1" => 2,
                    "sect2" => 3,
                    "sect3" => 4,
                    "sect4" => 5,
                    _ => 6,
                };
                if let Some(title) = first_child(item, "title").and_then(|t| t.text()) {
                    if !title.is_empty() {
                        out.push(DocNode::Header {
                            level,
                            children: vec![DocNode::Text(title.into())],
                        });
                    }
                }
                out.extend(convert_children(item, resolver, false));
            }

            "variablelist" => {
                if let Some(entry) = first_child(item, "varlistentry") {
                    if let Some(term) = first_child(entry, "term") {
                        out.push(DocNode::Header {
                            level: 4,
                            children: convert_children(term, resolver, false),
                        });
                    }
                }
                for listitem in child_elements(item, "listitem") {
                    for para in child_elements(listitem, "para") {
                        out.push(DocNode::Paragraph(convert_children(para, resolver, false)));
                    }
                }
            }

            "parameterlist" => {
                let mut items = Vec::new();
                for pitem in child_elements(item, "parameteritem") {
                    let mut par = Vec::new();
                    if let Some(name) = first_child(pitem, "parameternamelist")
                        .and_then(|nl| first_child(nl, "parametername"))
                    {
                        par.extend(convert_children(name, resolver, false));
                    }
                    par.push(DocNode::Text(" ".into()));
                    if let Some(desc) = first_child(pitem, "parameterdescription") {
                        for para in child_elements(desc, "para") {
                            par.extend(convert_children(para, resolver, false));
                        }
                    }
                    items.push(DocNode::Paragraph(par));
                }
                if let Some(kind) = item.attribute("kind") {
                    out.push(DocNode::Admonition {
                        title: section_title(kind),
                        inline: false,
                        children: vec![DocNode::List {
                            ordered: false,
                            items,
                        }],
                    });
                }
            }

            "simplesect" => {
                if let Some(kind) = item.attribute("kind") {
                    // A \par section carries its own title element.
                    let title = if kind == "par" {
                        first_child(item, "title")
                            .and_then(|t| t.text())
                            .unwrap_or("")
                            .to_string()
                    } else {
                        section_title(kind)
                    };
                    let inline = kind == "see";
                    let paras: Vec<_> = child_elements(item, "para").collect();
                    let count = paras.len();
                    let mut children = Vec::new();
                    for (i, para) in paras.into_iter().enumerate() {
                        children.extend(convert_children(para, resolver, false));
                        if inline {
                            if i + 1 < count {
                                children.push(DocNode::Text(", ".into()));
                            }
                        } else {
                            children.push(DocNode::LineBreak);
                        }
                    }
                    out.push(DocNode::Admonition {
                        title,
                        inline,
                        children,
                    });
                }
            }

            "xrefsect" => {
                if let Some(title) = first_child(item, "xreftitle") {
                    if title.text().is_some_and(|t| !t.is_empty()) {
                        out.push(DocNode::LineBreak);
                        out.push(DocNode::Bold(convert_children(title, resolver, false)));
                        out.push(DocNode::LineBreak);
                    }
                }
                if let Some(desc) = first_child(item, "xrefdescription") {
                    for para in child_elements(desc, "para") {
                        out.extend(convert_children(para, resolver, false));
                        out.push(DocNode::LineBreak);
                    }
                }
            }

            "ulink" => match item.attribute("url") {
                Some(url) => out.push(DocNode::Link {
                    children: convert_children(item, resolver, false),
                    target: url.into(),
                }),
                None => out.extend(convert_children(item, resolver, false)),
            },

            "bold" => out.push(DocNode::Bold(convert_children(item, resolver, false))),

            "emphasis" => out.push(DocNode::Italic(convert_children(item, resolver, false))),

            "formula" => {
                if let Some(text) = item.text() {
                    let equation = text.trim_matches(['$', ' ']).to_string();
                    if is_block_formula(el, item) {
                        out.push(DocNode::BlockEquation(equation));
                    } else {
                        out.push(DocNode::InlineEquation(equation));
                    }
                }
            }

            "linebreak" => out.push(DocNode::LineBreak),

            // Titles are consumed by their section handlers above.
            "title" => {}

            // Unknown tag: treat the whole subtree as plain text.
            _ => {
                let text = plain_text(item);
                if !text.is_empty() {
                    out.push(DocNode::Text(text));
                }
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MapResolver(HashMap<String, ResolvedLink>);

    impl MapResolver {
        fn with(entries: &[(&str, &str, &str)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(id, url, title)| {
                        (
                            id.to_string(),
                            ResolvedLink {
                                url: url.to_string(),
                                title: title.to_string(),
                            },
                        )
                    })
                    .collect(),
            )
        }
    }

    impl LinkResolver for MapResolver {
        fn resolve(&self, refid: &str) -> Option<ResolvedLink> {
            self.0.get(refid).cloned()
        }
    }

    #[test]
    fn paragraph_with_styles() {
        let xml = "<detaileddescription><para>Mixed <bold>strong</bold> and \
                   <emphasis>soft</emphasis> text.</para></detaileddescription>";
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert_eq!(md, "Mixed **strong** and _soft_ text.\n\n");
    }

    #[test]
    fn brief_renders_italic_joined() {
        let xml =
            "<briefdescription><para>Computes the area.</para></briefdescription>";
        let md = brief_from_xml(xml, &NoLinks);
        assert_eq!(md, "_Computes the area._");
    }

    #[test]
    fn resolved_ref_becomes_bold_link() {
        let resolver = MapResolver::with(&[("classshape", "classshape.md", "Shape")]);
        let xml = r#"<detaileddescription><para>See <ref refid="classshape">Shape</ref>.</para></detaileddescription>"#;
        let md = markdown_from_xml(xml, &resolver, false);
        assert!(md.contains("[**Shape**](classshape.md)"), "got: {md}");
    }

    #[test]
    fn unresolved_ref_degrades_to_plain_text() {
        // Scenario: a cross-reference to an id absent from the index renders
        // as the reference's literal text with no link target.
        let xml = r#"<detaileddescription><para>See <ref refid="missing">OldName</ref>.</para></detaileddescription>"#;
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert!(md.contains("OldName"));
        assert!(!md.contains('['));
        assert!(!md.contains("missing"));
    }

    #[test]
    fn ref_without_text_uses_resolved_title() {
        let resolver = MapResolver::with(&[("classshape", "classshape.md", "geom::Shape")]);
        let xml = r#"<d><para><ref refid="classshape"/></para></d>"#;
        let md = markdown_from_xml(xml, &resolver, false);
        assert!(md.contains("[**geom::Shape**](classshape.md)"), "got: {md}");
    }

    #[test]
    fn code_listing_concatenates_highlight_spans() {
        let xml = r#"<programlisting filename=".cpp"><codeline><highlight class="keyword">int<sp/></highlight><highlight class="normal">x = 1;</highlight></codeline><codeline><highlight class="normal">return<sp/>x;</highlight></codeline></programlisting>"#;
        let md = listing_from_xml(xml);
        assert!(md.contains("```cpp\n"), "got: {md}");
        assert!(md.contains("int x = 1;\n"));
        assert!(md.contains("return x;\n"));
    }

    #[test]
    fn table_rows_and_cells() {
        let xml = "<d><para><table rows=\"2\" cols=\"2\">\
                   <row><entry><para>Name</para></entry><entry><para>Value</para></entry></row>\
                   <row><entry><para>x</para></entry><entry><para>1</para></entry></row>\
                   </table></para></d>";
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert!(md.contains("|Name|Value|"));
        assert!(md.contains("|-----|-----|"));
        assert!(md.contains("|x|1|"));
    }

    #[test]
    fn lists_ordered_and_unordered() {
        let xml = "<d><para><itemizedlist>\
                   <listitem><para>alpha</para></listitem>\
                   <listitem><para>beta</para></listitem>\
                   </itemizedlist></para></d>";
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert!(md.contains("* alpha\n"));
        assert!(md.contains("* beta\n"));
    }

    #[test]
    fn section_headers_map_to_levels() {
        let xml = "<d><para><sect2><title>Usage</title><para>Body.</para></sect2></para></d>";
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert!(md.contains("### Usage\n"), "got: {md}");
        assert!(md.contains("Body."));
    }

    #[test]
    fn see_section_joins_inline_with_commas() {
        let xml = r#"<d><para><simplesect kind="see"><para>first</para><para>second</para></simplesect></para></d>"#;
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert!(md.contains("**See also:** first, second"), "got: {md}");
    }

    #[test]
    fn note_section_is_a_block() {
        let xml = r#"<d><para><simplesect kind="note"><para>Careful.</para></simplesect></para></d>"#;
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert!(md.contains("**Note:**\n\nCareful."), "got: {md}");
    }

    #[test]
    fn parameter_list_renders_labelled_items() {
        let xml = r#"<d><para><parameterlist kind="param"><parameteritem>
            <parameternamelist><parametername>radius</parametername></parameternamelist>
            <parameterdescription><para>circle radius</para></parameterdescription>
            </parameteritem></parameterlist></para></d>"#;
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert!(md.contains("**Parameters:**"), "got: {md}");
        assert!(md.contains("* radius circle radius"), "got: {md}");
    }

    #[test]
    fn formula_block_when_sole_paragraph_content() {
        let block = r#"<d><para><formula id="0">$a+b$</formula></para></d>"#;
        let md = markdown_from_xml(block, &NoLinks, false);
        assert!(md.contains("\\[a+b\\]"), "got: {md}");

        let inline = r#"<d><para>Given <formula id="1">$a+b$</formula> holds.</para></d>"#;
        let md = markdown_from_xml(inline, &NoLinks, false);
        assert!(md.contains("\\(a+b\\)"), "got: {md}");
    }

    #[test]
    fn unknown_tag_degrades_to_plain_text() {
        let xml = "<d><para>before <mysterytag>inner text</mysterytag> after</para></d>";
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert!(md.contains("before inner text after"), "got: {md}");
    }

    #[test]
    fn plain_text_strips_all_markup() {
        let xml = r#"<type>const <ref refid="classshape">Shape</ref> &amp;</type>"#;
        assert_eq!(plain_from_xml(xml), "const Shape &");
    }

    #[test]
    fn computeroutput_becomes_inline_code() {
        let xml = "<d><para>Call <computeroutput>area()</computeroutput> now.</para></d>";
        let md = markdown_from_xml(xml, &NoLinks, false);
        assert!(md.contains("`area()`"), "got: {md}");
    }

    #[test]
    fn malformed_snippet_degrades_to_empty() {
        assert_eq!(markdown_from_xml("<unclosed", &NoLinks, false), "");
        assert_eq!(plain_from_xml("<unclosed"), "");
    }
}
