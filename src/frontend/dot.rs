//! # Graphviz Reader
//!
//! A reader for the subset of the DOT language printed by `nvdisasm -cfg`:
//!
//! ```text
//! digraph f {
//! node [fontname="Courier",fontsize=10,shape=Mrecord];
//! "f"
//! [label="{<entry>f:\l/*0000*/ MOV R1, c[0x0][0x28] ;\l|<exit0>/*0010*/ @P0 BRA `(.L_1) ;\l}"]
//! "f":exit0:e -> ".L_1":entry:n [style=solid];
//! }
//! ```
//!
//! Graph, node and edge defaults as well as graph attributes are skipped.
//! Record labels are split into their ports, the text of every port is
//! returned with Graphviz line breaks (`\l`) left in place.

use std::sync::OnceLock;

use regex::Regex;

use super::{ParseError, ParseResult};

/// One field of a record label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// The port name, e.g. `entry` for `<entry>`.
    pub name: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotNode {
    pub name: String,
    pub ports: Vec<Port>,
}

impl DotNode {
    /// The index of the port named `name`.
    pub fn port(&self, name: &str) -> Option<usize> {
        self.ports
            .iter()
            .position(|port| port.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotEdge {
    pub from: String,
    /// The port the edge leaves through, e.g. `exit0`.
    pub port: Option<String>,
    pub to: String,
}

#[derive(Debug, Default)]
pub struct DotGraph {
    pub name: Option<String>,
    /// Nodes in declaration order.
    pub nodes: Vec<DotNode>,
    /// Edges in declaration order.
    pub edges: Vec<DotEdge>,
}

impl DotGraph {
    pub fn node(&self, name: &str) -> Option<&DotNode> { self.nodes.iter().find(|n| n.name == name) }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Quoted(String),
    Arrow,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eq,
    Colon,
    Semi,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Quoted(s) => format!("\"{}\"", s),
            Token::Arrow => "->".to_string(),
            Token::LBracket => "[".to_string(),
            Token::RBracket => "]".to_string(),
            Token::LBrace => "{".to_string(),
            Token::RBrace => "}".to_string(),
            Token::Eq => "=".to_string(),
            Token::Colon => ":".to_string(),
            Token::Semi => ";".to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?:(?P<blank>\s+)|(?P<comment>//[^\n]*|#[^\n]*|/\*(?s:.*?)\*/)|(?P<quoted>"(?:[^"\\]|\\(?s:.))*")|(?P<arrow>->|--)|(?P<ident>[A-Za-z0-9_.$]+|-[0-9.]+)|(?P<punct>[\[\]{}=:;,]))"#,
        )
        .expect("token pattern is valid")
    })
}

fn tokenize(src: &str) -> ParseResult<Vec<(Token, usize)>> {
    let re = token_regex();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while pos < src.len() {
        let rest = &src[pos..];
        let caps = match re.captures(rest) {
            Some(caps) => caps,
            None if rest.starts_with('"') => return Err(ParseError::UnterminatedString { line }),
            None => {
                let ch = rest.chars().next().unwrap_or_default();
                return Err(ParseError::UnexpectedChar { line, ch });
            }
        };

        let whole = caps.get(0).map_or("", |m| m.as_str());
        let token = if let Some(m) = caps.name("quoted") {
            Some(Token::Quoted(unquote(m.as_str())))
        } else if caps.name("arrow").is_some() {
            Some(Token::Arrow)
        } else if let Some(m) = caps.name("ident") {
            Some(Token::Ident(m.as_str().to_string()))
        } else if let Some(m) = caps.name("punct") {
            match m.as_str() {
                "[" => Some(Token::LBracket),
                "]" => Some(Token::RBracket),
                "{" => Some(Token::LBrace),
                "}" => Some(Token::RBrace),
                "=" => Some(Token::Eq),
                ":" => Some(Token::Colon),
                ";" => Some(Token::Semi),
                _ => Some(Token::Comma),
            }
        } else {
            None
        };

        if let Some(token) = token {
            tokens.push((token, line));
        }
        line += whole.matches('\n').count();
        pos += whole.len();
    }

    Ok(tokens)
}

/// Strip the quotes of a quoted id, resolving `\"` and line continuations.
///
/// Other escapes are meaningful to labels and are kept.
fn unquote(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut s = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            s.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => s.push('"'),
            Some('\n') => {}
            Some(next) => {
                s.push('\\');
                s.push(next);
            }
            None => s.push('\\'),
        }
    }
    s
}

/// Resolve the record escapes of a field, Graphviz line breaks are kept as
/// `\l`.
fn unescape_field(field: &str) -> String {
    let mut s = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            s.push(c);
            continue;
        }
        match chars.next() {
            Some(c @ ('{' | '}' | '|' | '<' | '>' | ' ' | '\\')) => s.push(c),
            Some('l' | 'n' | 'r') => s.push_str("\\l"),
            Some(next) => {
                s.push('\\');
                s.push(next);
            }
            None => s.push('\\'),
        }
    }
    s
}

/// Split a record label into its fields.
fn parse_record(label: &str) -> Vec<Port> {
    let trimmed = label.trim();
    let body = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(trimmed);

    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut escaped = false;
    for (idx, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                fields.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    fields.push(&body[start..]);

    fields.into_iter().map(parse_field).collect()
}

fn parse_field(field: &str) -> Port {
    let field = field.trim_start();
    if let Some(rest) = field.strip_prefix('<') {
        let mut escaped = false;
        for (idx, c) in rest.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '>' => {
                    return Port {
                        name: Some(unescape_field(&rest[..idx]).trim().to_string()),
                        text: unescape_field(&rest[idx + 1..]),
                    }
                }
                _ => {}
            }
        }
    }
    Port {
        name: None,
        text: unescape_field(field),
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> { self.tokens.get(self.pos).map(|(t, _)| t) }

    fn peek_nth(&self, n: usize) -> Option<&Token> { self.tokens.get(self.pos + n).map(|(t, _)| t) }

    fn bump(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> ParseResult<()> {
        match self.bump() {
            Some((t, _)) if t == token => Ok(()),
            Some((t, line)) => Err(ParseError::UnexpectedToken {
                line,
                expected,
                found: t.describe(),
            }),
            None => Err(ParseError::UnexpectedEof(expected)),
        }
    }

    fn id(&mut self, expected: &'static str) -> ParseResult<String> {
        match self.bump() {
            Some((Token::Ident(s) | Token::Quoted(s), _)) => Ok(s),
            Some((t, line)) => Err(ParseError::UnexpectedToken {
                line,
                expected,
                found: t.describe(),
            }),
            None => Err(ParseError::UnexpectedEof(expected)),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn graph(&mut self) -> ParseResult<DotGraph> {
        let mut graph = DotGraph::default();

        if self.is_keyword("strict") {
            self.pos += 1;
        }
        if self.is_keyword("digraph") || self.is_keyword("graph") {
            self.pos += 1;
        } else {
            let found = self.peek().map(Token::describe);
            return match (found, self.tokens.get(self.pos)) {
                (Some(found), Some((_, line))) => Err(ParseError::UnexpectedToken {
                    line: *line,
                    expected: "`digraph`",
                    found,
                }),
                _ => Err(ParseError::UnexpectedEof("`digraph`")),
            };
        }
        if !matches!(self.peek(), Some(Token::LBrace)) {
            graph.name = Some(self.id("a graph name")?);
        }
        self.expect(Token::LBrace, "`{`")?;

        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Semi) => self.pos += 1,
                Some(_) => self.stmt(&mut graph)?,
                None => return Err(ParseError::UnexpectedEof("`}`")),
            }
        }

        Ok(graph)
    }

    fn stmt(&mut self, graph: &mut DotGraph) -> ParseResult<()> {
        if (self.is_keyword("node") || self.is_keyword("edge") || self.is_keyword("graph"))
            && self.peek_nth(1) == Some(&Token::LBracket)
        {
            self.pos += 1;
            self.attrs()?;
            return Ok(());
        }

        let (name, port) = self.node_id()?;

        if self.eat(&Token::Eq) {
            // graph attribute
            self.id("an attribute value")?;
            return Ok(());
        }

        if self.peek() == Some(&Token::Arrow) {
            let (mut from, mut from_port) = (name, port);
            while self.eat(&Token::Arrow) {
                let (to, to_port) = self.node_id()?;
                graph.edges.push(DotEdge {
                    from,
                    port: from_port,
                    to: to.clone(),
                });
                from = to;
                from_port = to_port;
            }
            if self.peek() == Some(&Token::LBracket) {
                self.attrs()?;
            }
            return Ok(());
        }

        let attrs = if self.peek() == Some(&Token::LBracket) {
            self.attrs()?
        } else {
            Vec::new()
        };
        let label = attrs
            .into_iter()
            .find(|(key, _)| key == "label")
            .map(|(_, value)| value);

        if graph.nodes.iter().any(|n| n.name == name) {
            // a later declaration may only add attributes other than the label
            if label.is_some() {
                return Err(ParseError::DuplicateNode(name));
            }
        } else {
            graph.nodes.push(DotNode {
                name,
                ports: label.as_deref().map(parse_record).unwrap_or_default(),
            });
        }

        Ok(())
    }

    fn node_id(&mut self) -> ParseResult<(String, Option<String>)> {
        let name = self.id("a node name")?;
        let mut port = None;
        if self.eat(&Token::Colon) {
            port = Some(self.id("a port name")?);
            if self.eat(&Token::Colon) {
                // compass point
                self.id("a compass point")?;
            }
        }
        Ok((name, port))
    }

    /// One or more bracketed attribute lists.
    fn attrs(&mut self) -> ParseResult<Vec<(String, String)>> {
        let mut attrs = Vec::new();
        while self.eat(&Token::LBracket) {
            loop {
                if self.eat(&Token::RBracket) {
                    break;
                }
                let key = self.id("an attribute name")?;
                self.expect(Token::Eq, "`=`")?;
                let value = self.id("an attribute value")?;
                attrs.push((key, value));
                if !self.eat(&Token::Comma) {
                    self.eat(&Token::Semi);
                }
            }
        }
        Ok(attrs)
    }
}

/// Parse a Graphviz digraph.
pub fn parse(src: &str) -> ParseResult<DotGraph> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.graph()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"digraph f {
node [fontname="Courier",fontsize=10,shape=Mrecord];
"f"
[label="{<entry>f:\l/*0000*/ MOV R1, c[0x0][0x28] ;\l|<exit0>/*0010*/ @P0 BRA `(.L_1) ;\l}"]
"f":exit0:e -> ".L_1":entry:n [style=solid];
"f":exit0:s -> ".L_2":entry:n [style=solid];
".L_1"
[label="{<entry>.L_1:\l/*0020*/ EXIT ;\l}"]
".L_2" [label="{<entry>.L_2:\l/*0030*/ \{ NOP ;\l\}}"]
}
"#;

    #[test]
    fn test_parse_sample() {
        let graph = parse(SAMPLE).unwrap();
        assert_eq!(graph.name.as_deref(), Some("f"));
        assert_eq!(graph.nodes.len(), 3);

        let f = graph.node("f").unwrap();
        assert_eq!(f.ports.len(), 2);
        assert_eq!(f.port("exit0"), Some(1));
        assert_eq!(f.ports[1].text, "/*0010*/ @P0 BRA `(.L_1) ;\\l");

        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].from, "f");
        assert_eq!(graph.edges[0].port.as_deref(), Some("exit0"));
        assert_eq!(graph.edges[1].to, ".L_2");
    }

    #[test]
    fn test_escaped_braces() {
        let graph = parse(SAMPLE).unwrap();
        let node = graph.node(".L_2").unwrap();
        assert_eq!(node.ports.len(), 1);
        assert_eq!(node.ports[0].text, ".L_2:\\l/*0030*/ { NOP ;\\l}");
    }

    #[test]
    fn test_edge_chain() {
        let graph = parse("digraph { a -> b -> c; a }").unwrap();
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[1].from, "b");
        assert_eq!(graph.nodes.len(), 1);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse("digraph { \"a"),
            Err(ParseError::UnterminatedString { line: 1 })
        ));
        assert!(matches!(
            parse("digraph {\n a -> }"),
            Err(ParseError::UnexpectedToken { line: 2, .. })
        ));
        assert!(matches!(
            parse("digraph {\n \"a\" [label=\"x\"]\n \"a\" [label=\"y\"] }"),
            Err(ParseError::DuplicateNode(_))
        ));
        assert!(matches!(parse("digraph {"), Err(ParseError::UnexpectedEof(_))));
    }
}
