use logos::Logos;

/// Token types for the HTML importer.
///
/// The importer only consumes markup the compiler emits: attribute values
/// are always double-quoted and fully escaped, so a tag never contains a
/// raw `>`.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // Closing tag: </p>
    #[regex(r"</[a-zA-Z][a-zA-Z0-9_-]*\s*>", |lex| lex.slice())]
    CloseTag(&'src str),

    // Opening tag with attributes: <div data-embed="atom">
    #[regex(r"<[a-zA-Z][^>]*>", |lex| lex.slice())]
    OpenTag(&'src str),

    // Character data between tags
    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Tokenize an HTML fragment, dropping nothing: whitespace between block
/// tags surfaces as `Text` and is filtered by the importer in block
/// context.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    Token::lexer(source)
        .spanned()
        .filter_map(|(token, span)| token.ok().map(|t| (t, span)))
        .collect()
}

/// A parsed opening tag
#[derive(Debug, Clone, PartialEq)]
pub struct TagParts {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl TagParts {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Split an `OpenTag` slice into tag name and attribute pairs
pub fn parse_tag(slice: &str) -> TagParts {
    let inner = slice
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    let mut chars = inner.char_indices().peekable();

    let mut name_end = inner.len();
    for (i, c) in chars.by_ref() {
        if c.is_whitespace() {
            name_end = i;
            break;
        }
    }
    let name = inner[..name_end.min(inner.len())].to_string();

    let mut attrs = Vec::new();
    let rest = &inner[name_end.min(inner.len())..];
    let mut cursor = rest.char_indices().peekable();
    while let Some(&(start, c)) = cursor.peek() {
        if c.is_whitespace() {
            cursor.next();
            continue;
        }
        // key
        let mut key_end = rest.len();
        while let Some(&(i, c)) = cursor.peek() {
            if c == '=' || c.is_whitespace() {
                key_end = i;
                break;
            }
            key_end = i + c.len_utf8();
            cursor.next();
        }
        let key = rest[start..key_end].to_string();

        // value, when present
        let mut value = String::new();
        if let Some(&(_, '=')) = cursor.peek() {
            cursor.next();
            if let Some(&(_, '"')) = cursor.peek() {
                cursor.next();
                let mut value_end = rest.len();
                let value_start = cursor.peek().map(|&(i, _)| i).unwrap_or(rest.len());
                for (i, c) in cursor.by_ref() {
                    if c == '"' {
                        value_end = i;
                        break;
                    }
                }
                value = crate::compiler::unescape(&rest[value_start..value_end.min(rest.len())]);
            }
        }
        if !key.is_empty() {
            attrs.push((key, value));
        }
    }

    TagParts { name, attrs }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("<p>hi</p>");
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[0].0, Token::OpenTag("<p>")));
        assert!(matches!(tokens[1].0, Token::Text("hi")));
        assert!(matches!(tokens[2].0, Token::CloseTag("</p>")));
    }

    #[test]
    fn test_parse_tag_with_attrs() {
        let parts = parse_tag(r#"<h2 id="intro" class="fancy">"#);
        assert_eq!(parts.name, "h2");
        assert_eq!(parts.attr("id"), Some("intro"));
        assert_eq!(parts.attr("class"), Some("fancy"));
    }

    #[test]
    fn test_parse_tag_unescapes_values() {
        let parts = parse_tag(r#"<div data-values="{&quot;a&quot;:1}">"#);
        assert_eq!(parts.attr("data-values"), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_parse_tag_without_attrs() {
        let parts = parse_tag("<br>");
        assert_eq!(parts.name, "br");
        assert!(parts.attrs.is_empty());
    }
}
