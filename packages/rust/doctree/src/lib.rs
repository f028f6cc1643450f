//! Renderer-neutral document AST for description blocks, plus its Markdown
//! renderer.
//!
//! Rich-text XML subtrees (briefs, details, admonitions, tables, code
//! listings, formulas) are converted into [`DocNode`] trees by the
//! [`convert`] module; downstream template renderers obtain text by calling
//! [`DocNode::render`] with an output sink and an indentation context.

pub mod convert;

pub use convert::{
    LinkResolver, NoLinks, ResolvedLink, brief_from_xml, listing_from_xml, markdown_from_xml,
    plain_from_xml,
};

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape characters that carry Markdown or HTML meaning in plain text.
pub fn escape(s: &str) -> String {
    s.replace('*', "\\*")
        .replace('_', "\\_")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('|', "\\|")
}

// ---------------------------------------------------------------------------
// Output sink
// ---------------------------------------------------------------------------

/// Markdown output sink with end-of-line tracking, so consecutive block
/// elements never emit doubled blank lines.
#[derive(Debug, Default)]
pub struct MdWriter {
    output: String,
    eol_flag: bool,
}

impl MdWriter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            eol_flag: true,
        }
    }

    pub fn write(&mut self, s: &str) {
        self.output.push_str(s);
        self.eol_flag = false;
    }

    /// Terminate the current line, unless it is already terminated.
    pub fn eol(&mut self) {
        if !self.eol_flag {
            self.output.push('\n');
            self.eol_flag = true;
        }
    }

    pub fn into_string(self) -> String {
        self.output
    }

    pub fn as_str(&self) -> &str {
        &self.output
    }
}

/// Render a slice of nodes to a Markdown string.
pub fn render_nodes(nodes: &[DocNode]) -> String {
    let mut f = MdWriter::new();
    for node in nodes {
        node.render(&mut f, "");
    }
    f.into_string()
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// One row of a [`DocNode::Table`]; each cell owns its inline content.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<Vec<DocNode>>,
}

/// A node of the renderer-neutral document tree.
///
/// Every variant owns its children and exposes exactly one operation:
/// appending its rendering to an [`MdWriter`] given an indentation context.
#[derive(Debug, Clone, PartialEq)]
pub enum DocNode {
    /// Plain text, escaped at render time.
    Text(String),
    /// A hard paragraph break.
    LineBreak,
    Bold(Vec<DocNode>),
    Italic(Vec<DocNode>),
    /// Inline monospace span.
    InlineCode(String),
    Link {
        children: Vec<DocNode>,
        target: String,
    },
    Image {
        url: String,
    },
    Paragraph(Vec<DocNode>),
    /// Ordered or unordered list; items are typically paragraphs.
    List {
        ordered: bool,
        items: Vec<DocNode>,
    },
    Table {
        rows: Vec<TableRow>,
    },
    BlockQuote(Vec<DocNode>),
    Header {
        level: u8,
        children: Vec<DocNode>,
    },
    /// Fenced code block built from per-line listing content.
    CodeBlock {
        language: Option<String>,
        lines: Vec<String>,
    },
    /// Labelled block (note, warning, see-also, parameter list, ...).
    /// `inline` admonitions keep their body on the label line.
    Admonition {
        title: String,
        inline: bool,
        children: Vec<DocNode>,
    },
    InlineEquation(String),
    BlockEquation(String),
}

impl DocNode {
    /// Append this node's Markdown rendering to `f`.
    pub fn render(&self, f: &mut MdWriter, indent: &str) {
        match self {
            Self::Text(text) => {
                if !text.is_empty() {
                    f.write(&escape(text));
                }
            }
            Self::LineBreak => f.write("\n\n"),
            Self::Bold(children) => {
                f.write("**");
                render_children(children, f);
                f.write("**");
            }
            Self::Italic(children) => {
                f.write("_");
                render_children(children, f);
                f.write("_");
            }
            Self::InlineCode(text) => {
                f.write(&format!("`{text}`"));
            }
            Self::Link { children, target } => {
                f.write("[");
                render_children(children, f);
                f.write(&format!("]({target})"));
            }
            Self::Image { url } => {
                f.write(&format!("![Image]({url})"));
            }
            Self::Paragraph(children) => {
                for child in children {
                    child.render(f, indent);
                }
                f.eol();
            }
            Self::List { ordered: _, items } => {
                f.eol();
                for item in items {
                    if !matches!(item, Self::List { .. }) {
                        f.write(&format!("{indent}* "));
                    }
                    item.render(f, &format!("{indent}  "));
                }
            }
            Self::Table { rows } => {
                f.eol();
                let mut is_first = true;
                for row in rows {
                    f.eol();
                    f.write("|");
                    for cell in &row.cells {
                        render_children(cell, f);
                        f.write("|");
                    }
                    f.eol();
                    if is_first {
                        for _ in 0..row.cells.len() {
                            f.write("|-----");
                        }
                        f.write("|");
                    }
                    is_first = false;
                }
                f.write("\n\n");
            }
            Self::BlockQuote(children) => {
                f.write("\n");
                for child in children {
                    f.write("> ");
                    child.render(f, "");
                    f.write("\n");
                }
            }
            Self::Header { level, children } => {
                f.write(&format!("{} ", "#".repeat(*level as usize)));
                render_children(children, f);
                f.write("\n");
                f.eol();
            }
            Self::CodeBlock { language, lines } => {
                f.write(&format!("```{}\n", language.as_deref().unwrap_or("")));
                for line in lines {
                    f.write(line);
                    f.write("\n");
                }
                f.write("```\n");
            }
            Self::Admonition {
                title,
                inline,
                children,
            } => {
                f.write("\n\n");
                f.write(&format!("**{title}**"));
                if *inline {
                    f.write(" ");
                } else {
                    f.write("\n\n");
                }
                for child in children {
                    child.render(f, indent);
                }
            }
            Self::InlineEquation(equation) => {
                if !equation.is_empty() {
                    f.write(&format!("\\({equation}\\)"));
                }
            }
            Self::BlockEquation(equation) => {
                f.write(&format!("\n\\[{equation}\\]\n"));
            }
        }
    }
}

fn render_children(children: &[DocNode], f: &mut MdWriter) {
    for child in children {
        child.render(f, "");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> DocNode {
        DocNode::Text(s.into())
    }

    #[test]
    fn escape_markdown_specials() {
        assert_eq!(escape("a*b_c|d"), "a\\*b\\_c\\|d");
        assert_eq!(escape("vector<int>"), "vector&lt;int&gt;");
    }

    #[test]
    fn renders_inline_styles() {
        let nodes = vec![
            DocNode::Bold(vec![text("strong")]),
            text(" and "),
            DocNode::Italic(vec![text("soft")]),
        ];
        assert_eq!(render_nodes(&nodes), "**strong** and _soft_");
    }

    #[test]
    fn renders_link_and_code() {
        let nodes = vec![
            DocNode::Link {
                children: vec![DocNode::Bold(vec![text("Shape")])],
                target: "classshape.md".into(),
            },
            text(" uses "),
            DocNode::InlineCode("area()".into()),
        ];
        assert_eq!(render_nodes(&nodes), "[**Shape**](classshape.md) uses `area()`");
    }

    #[test]
    fn renders_list_with_nesting_indent() {
        let list = DocNode::List {
            ordered: false,
            items: vec![
                DocNode::Paragraph(vec![text("first")]),
                DocNode::Paragraph(vec![text("second")]),
            ],
        };
        assert_eq!(render_nodes(&[list]), "* first\n* second\n");
    }

    #[test]
    fn renders_table_with_separator_after_header() {
        let table = DocNode::Table {
            rows: vec![
                TableRow {
                    cells: vec![vec![text("Name")], vec![text("Value")]],
                },
                TableRow {
                    cells: vec![vec![text("x")], vec![text("1")]],
                },
            ],
        };
        let out = render_nodes(&[table]);
        assert!(out.contains("|Name|Value|"));
        assert!(out.contains("|-----|-----|"));
        assert!(out.contains("|x|1|"));
    }

    #[test]
    fn renders_code_block_with_language() {
        let block = DocNode::CodeBlock {
            language: Some("cpp".into()),
            lines: vec!["int main() {".into(), "}".into()],
        };
        assert_eq!(render_nodes(&[block]), "```cpp\nint main() {\n}\n```\n");
    }

    #[test]
    fn renders_admonition_block_and_inline() {
        let block = DocNode::Admonition {
            title: "Note:".into(),
            inline: false,
            children: vec![text("careful")],
        };
        assert_eq!(render_nodes(&[block]), "\n\n**Note:**\n\ncareful");

        let inline = DocNode::Admonition {
            title: "See also:".into(),
            inline: true,
            children: vec![text("a"), text(", "), text("b")],
        };
        assert_eq!(render_nodes(&[inline]), "\n\n**See also:** a, b");
    }

    #[test]
    fn renders_equations() {
        let nodes = vec![
            DocNode::InlineEquation("e = mc^2".into()),
            DocNode::BlockEquation("\\sum_i x_i".into()),
        ];
        let out = render_nodes(&nodes);
        assert!(out.contains("\\(e = mc^2\\)"));
        assert!(out.contains("\n\\[\\sum_i x_i\\]\n"));
    }

    #[test]
    fn writer_eol_is_idempotent() {
        let mut f = MdWriter::new();
        f.write("line");
        f.eol();
        f.eol();
        assert_eq!(f.into_string(), "line\n");
    }
}
