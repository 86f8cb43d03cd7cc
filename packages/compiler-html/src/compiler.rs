use pubweave_model::{
    embedding_of, Element, EmbeddingKind, HtmlRule, Node, Schema, TextLeaf, ATTR_CLASS, ATTR_DATA,
    ATTR_FIELD_SLUG, ATTR_ID, ATTR_PARENT_PUB_ID, ATTR_PUB_ID, ATTR_PUB_TYPE_ID,
};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during HTML compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Node type has no HTML rule: {0}")]
    UnsupportedNode(String),

    #[error("Unknown mark type: {0}")]
    UnknownMark(String),

    #[error("Could not serialize embed data: {0}")]
    EmbedData(String),
}

/// Options for HTML compilation
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Pretty print block structure
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
        }
    }
}

struct Context {
    options: CompileOptions,
    depth: usize,
    buffer: String,
}

impl Context {
    fn new(options: CompileOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_line(&mut self, text: &str) {
        if self.options.pretty {
            self.add_indent();
        }
        self.add(text);
        if self.options.pretty {
            self.add("\n");
        }
    }

    fn add_indent(&mut self) {
        let indent = self.options.indent.clone();
        for _ in 0..self.depth {
            self.add(&indent);
        }
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    fn get_output(self) -> String {
        self.buffer
    }
}

/// Compile a document tree to an HTML fragment.
///
/// The root element itself has no tag; its block children are emitted at
/// the top level. Each node serializes per its declared [`HtmlRule`].
pub fn compile_to_html(
    schema: &Schema,
    doc: &Element,
    options: CompileOptions,
) -> Result<String, CompileError> {
    let mut ctx = Context::new(options);
    for child in &doc.content {
        compile_block(schema, child, &mut ctx)?;
    }
    Ok(ctx.get_output())
}

fn compile_block(schema: &Schema, node: &Node, ctx: &mut Context) -> Result<(), CompileError> {
    let el = match node {
        Node::Element(el) => el,
        // loose text at block level does not occur in valid trees
        Node::Text(t) => {
            let mut line = String::new();
            escape(&t.text, &mut line);
            ctx.add_line(&line);
            return Ok(());
        }
    };

    let spec = schema
        .node_spec(&el.type_name)
        .ok_or_else(|| CompileError::UnsupportedNode(el.type_name.clone()))?;
    let rule = spec
        .html
        .as_ref()
        .ok_or_else(|| CompileError::UnsupportedNode(el.type_name.clone()))?;

    match rule {
        HtmlRule::Tag(tag) => {
            if schema.is_textblock(&el.type_name) {
                let mut line = String::new();
                open_tag(tag, &styling_attrs(el), &mut line);
                compile_inline(schema, &el.content, &mut line)?;
                line.push_str(&format!("</{}>", tag));
                ctx.add_line(&line);
            } else {
                let mut open = String::new();
                open_tag(tag, &styling_attrs(el), &mut open);
                ctx.add_line(&open);
                ctx.indent();
                for child in &el.content {
                    compile_block(schema, child, ctx)?;
                }
                ctx.dedent();
                ctx.add_line(&format!("</{}>", tag));
            }
        }

        HtmlRule::HeadingByLevel => {
            let level = el
                .attrs
                .get("level")
                .and_then(Value::as_i64)
                .unwrap_or(1)
                .clamp(1, 6);
            let tag = format!("h{}", level);
            let mut line = String::new();
            open_tag(&tag, &styling_attrs(el), &mut line);
            compile_inline(schema, &el.content, &mut line)?;
            line.push_str(&format!("</{}>", tag));
            ctx.add_line(&line);
        }

        HtmlRule::Void(tag) => {
            let mut line = String::new();
            open_tag(tag, &styling_attrs(el), &mut line);
            ctx.add_line(&line);
        }

        HtmlRule::Image => {
            let mut attrs = Vec::new();
            for key in ["src", "alt"] {
                if let Some(v) = el.attr_str(key) {
                    attrs.push((key.to_string(), v.to_string()));
                }
            }
            attrs.extend(styling_attrs(el));
            let mut line = String::new();
            open_tag("img", &attrs, &mut line);
            ctx.add_line(&line);
        }

        HtmlRule::Embed => {
            let embed = embedding_of(schema, el)
                .ok_or_else(|| CompileError::UnsupportedNode(el.type_name.clone()))?;
            let mut attrs = Vec::new();
            let kind = match embed.kind {
                EmbeddingKind::Atom => "atom",
                EmbeddingKind::Doc => "doc",
            };
            attrs.push(("data-embed".to_string(), kind.to_string()));
            for (key, name) in [
                (ATTR_PUB_ID, "data-pub-id"),
                (ATTR_PUB_TYPE_ID, "data-pub-type-id"),
                (ATTR_PARENT_PUB_ID, "data-parent-pub-id"),
                (ATTR_FIELD_SLUG, "data-field-slug"),
            ] {
                if let Some(v) = el.attr_str(key) {
                    attrs.push((name.to_string(), v.to_string()));
                }
            }
            if let Some(data) = el.attrs.get(ATTR_DATA) {
                let json = serde_json::to_string(data)
                    .map_err(|e| CompileError::EmbedData(e.to_string()))?;
                attrs.push(("data-values".to_string(), json));
            }
            attrs.extend(styling_attrs(el));

            if el.content.is_empty() {
                let mut line = String::new();
                open_tag("div", &attrs, &mut line);
                line.push_str("</div>");
                ctx.add_line(&line);
            } else {
                let mut open = String::new();
                open_tag("div", &attrs, &mut open);
                ctx.add_line(&open);
                ctx.indent();
                for child in &el.content {
                    compile_block(schema, child, ctx)?;
                }
                ctx.dedent();
                ctx.add_line("</div>");
            }
        }
    }

    Ok(())
}

fn compile_inline(schema: &Schema, nodes: &[Node], out: &mut String) -> Result<(), CompileError> {
    for node in nodes {
        match node {
            Node::Text(t) => compile_text(schema, t, out)?,
            Node::Element(el) => {
                let rule = schema
                    .node_spec(&el.type_name)
                    .and_then(|s| s.html.as_ref())
                    .ok_or_else(|| CompileError::UnsupportedNode(el.type_name.clone()))?;
                match rule {
                    HtmlRule::Void(tag) => open_tag(tag, &styling_attrs(el), out),
                    _ => return Err(CompileError::UnsupportedNode(el.type_name.clone())),
                }
            }
        }
    }
    Ok(())
}

fn compile_text(schema: &Schema, leaf: &TextLeaf, out: &mut String) -> Result<(), CompileError> {
    // Marks wrap outside-in, in storage order
    for mark in &leaf.marks {
        let spec = schema
            .mark_spec(&mark.type_name)
            .ok_or_else(|| CompileError::UnknownMark(mark.type_name.clone()))?;
        let mut attrs = Vec::new();
        for key in &spec.attr_keys {
            if let Some(v) = mark.attrs.get(key).and_then(Value::as_str) {
                attrs.push((key.clone(), v.to_string()));
            }
        }
        open_tag(&spec.tag, &attrs, out);
    }
    escape(&leaf.text, out);
    for mark in leaf.marks.iter().rev() {
        let spec = schema
            .mark_spec(&mark.type_name)
            .ok_or_else(|| CompileError::UnknownMark(mark.type_name.clone()))?;
        out.push_str(&format!("</{}>", spec.tag));
    }
    Ok(())
}

fn styling_attrs(el: &Element) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    for key in [ATTR_ID, ATTR_CLASS] {
        if let Some(v) = el.attr_str(key) {
            attrs.push((key.to_string(), v.to_string()));
        }
    }
    attrs
}

fn open_tag(tag: &str, attrs: &[(String, String)], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape(value, out);
        out.push('"');
    }
    out.push('>');
}

pub(crate) fn escape(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

pub(crate) fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
