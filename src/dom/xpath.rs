//! XPath evaluation
//!
//! A compact XPath 1.0 subset evaluated against [`Document`], returning an
//! ordered node-set the way `document.evaluate(.., ORDERED_NODE_SNAPSHOT_TYPE)`
//! does. Covers absolute location paths, `//`, the `child`, `descendant`,
//! `descendant-or-self`, `self` and `parent` axes, name/`*`/`node()`/`text()`
//! tests, and predicates built from positions, `@attr`, literals, `=`/`!=`,
//! `and`/`or` and a handful of core functions. Parenthesised paths may be
//! followed by predicates, e.g. `(//li)[2]`.

use super::document::{Document, NodeData, NodeId};
use crate::error::{HunterError, Result};

/// Evaluates `expression` and returns the matched nodes in document order
pub fn evaluate(doc: &Document, expression: &str) -> Result<Vec<NodeId>> {
    let expr = XPath::parse(expression)?;
    Ok(expr.evaluate(doc))
}

/// Number of nodes matched by `expression`
pub fn count(doc: &Document, expression: &str) -> Result<usize> {
    evaluate(doc, expression).map(|nodes| nodes.len())
}

/// A parsed XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    path: Vec<Step>,
    // predicates applied to the whole node-set of a parenthesised path
    filter: Option<Vec<Pred>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    AnyElement,
    AnyNode,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Pred>,
}

#[derive(Debug, Clone, PartialEq)]
enum Pred {
    Or(Box<Pred>, Box<Pred>),
    And(Box<Pred>, Box<Pred>),
    Eq(Box<Pred>, Box<Pred>),
    Ne(Box<Pred>, Box<Pred>),
    Number(f64),
    Literal(String),
    Attribute(String),
    ContextString,
    Call(Function, Vec<Pred>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Function {
    Contains,
    StartsWith,
    Position,
    Last,
    Not,
    NormalizeSpace,
    String,
    Text,
}

impl Function {
    fn lookup(name: &str) -> Option<(Function, std::ops::RangeInclusive<usize>)> {
        let entry = match name {
            "contains" => (Function::Contains, 2..=2),
            "starts-with" => (Function::StartsWith, 2..=2),
            "position" => (Function::Position, 0..=0),
            "last" => (Function::Last, 0..=0),
            "not" => (Function::Not, 1..=1),
            "normalize-space" => (Function::NormalizeSpace, 0..=1),
            "string" => (Function::String, 0..=1),
            "text" => (Function::Text, 0..=0),
            _ => return None,
        };
        Some(entry)
    }
}

// ===== LEXER =====

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Eq,
    NotEq,
    Star,
    ColonColon,
    Dot,
    DotDot,
    Name(String),
    Literal(String),
    Number(f64),
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '[' | ']' | '(' | ')' | '@' | ',' | '=' | '*' => {
                tokens.push(match c {
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '@' => Token::At,
                    ',' => Token::Comma,
                    '=' => Token::Eq,
                    _ => Token::Star,
                });
                i += 1;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            ':' if next == Some(':') => {
                tokens.push(Token::ColonColon);
                i += 2;
            }
            '.' if next == Some('.') => {
                tokens.push(Token::DotDot);
                i += 2;
            }
            '.' if !next.is_some_and(|n| n.is_ascii_digit()) => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|ch| *ch == c)
                    .ok_or_else(|| HunterError::xpath(source, "unterminated string literal"))?;
                tokens.push(Token::Literal(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| HunterError::xpath(source, format!("bad number '{}'", text)))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            other => {
                return Err(HunterError::xpath(
                    source,
                    format!("unsupported character '{}'", other),
                ))
            }
        }
    }
    Ok(tokens)
}

/// NCName continuation characters
fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{b7}')
}

// ===== PARSER =====

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl XPath {
    pub fn parse(source: &str) -> Result<Self> {
        let mut parser = Parser {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        };
        let xpath = parser.parse_expression()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error("unexpected trailing tokens"));
        }
        Ok(xpath)
    }

    /// Matched nodes in document order
    pub fn evaluate(&self, doc: &Document) -> Vec<NodeId> {
        let order = doc.preorder_index();
        let mut context = vec![doc.root()];
        for step in &self.path {
            context = step.apply(doc, &context, &order);
        }
        if let Some(predicates) = &self.filter {
            for pred in predicates {
                context = filter_by(pred, doc, context);
            }
        }
        context
    }
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> HunterError {
        HunterError::xpath(self.source, reason)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(ref t) if *t == expected => Ok(()),
            Some(t) => Err(self.error(format!("expected {:?}, found {:?}", expected, t))),
            None => Err(self.error(format!("expected {:?}", expected))),
        }
    }

    fn parse_expression(&mut self) -> Result<XPath> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let path = self.parse_path()?;
            self.expect(Token::RParen)?;
            let predicates = self.parse_predicates()?;
            return Ok(XPath {
                path,
                filter: Some(predicates),
            });
        }
        Ok(XPath {
            path: self.parse_path()?,
            filter: None,
        })
    }

    fn parse_path(&mut self) -> Result<Vec<Step>> {
        let mut steps = Vec::new();
        match self.peek() {
            Some(Token::Slash) | Some(Token::DoubleSlash) => {}
            _ => return Err(self.error("only absolute location paths are supported")),
        }
        while let Some(token) = self.peek().cloned() {
            match token {
                Token::Slash => {
                    self.pos += 1;
                    // a lone "/" selects the document node
                    if steps.is_empty() && self.at_path_end() {
                        return Ok(steps);
                    }
                }
                Token::DoubleSlash => {
                    self.pos += 1;
                    steps.push(Step {
                        axis: Axis::DescendantOrSelf,
                        test: NodeTest::AnyNode,
                        predicates: Vec::new(),
                    });
                }
                _ => break,
            }
            steps.push(self.parse_step()?);
        }
        Ok(steps)
    }

    fn at_path_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::RParen))
    }

    fn parse_step(&mut self) -> Result<Step> {
        match self.peek() {
            Some(Token::Dot) => {
                self.pos += 1;
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
            }
            Some(Token::DotDot) => {
                self.pos += 1;
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
            }
            _ => {}
        }

        let mut axis = Axis::Child;
        if let (Some(Token::Name(name)), Some(Token::ColonColon)) = (self.peek(), self.peek_at(1)) {
            axis = match name.as_str() {
                "child" => Axis::Child,
                "descendant" => Axis::Descendant,
                "descendant-or-self" => Axis::DescendantOrSelf,
                "self" => Axis::SelfAxis,
                "parent" => Axis::Parent,
                other => return Err(self.error(format!("unsupported axis '{}'", other))),
            };
            self.pos += 2;
        }

        let test = match self.next() {
            Some(Token::Star) => NodeTest::AnyElement,
            Some(Token::Name(name)) if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                self.expect(Token::RParen)?;
                match name.as_str() {
                    "node" => NodeTest::AnyNode,
                    "text" => NodeTest::Text,
                    other => return Err(self.error(format!("unsupported node test '{}()'", other))),
                }
            }
            Some(Token::Name(name)) => NodeTest::Name(name.to_lowercase()),
            _ => return Err(self.error("expected a node test")),
        };

        Ok(Step {
            axis,
            test,
            predicates: self.parse_predicates()?,
        })
    }

    fn parse_predicates(&mut self) -> Result<Vec<Pred>> {
        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }
        Ok(predicates)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == keyword)
    }

    fn parse_or(&mut self) -> Result<Pred> {
        let mut left = self.parse_and()?;
        while self.is_keyword("or") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Pred::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Pred> {
        let mut left = self.parse_comparison()?;
        while self.is_keyword("and") {
            self.pos += 1;
            let right = self.parse_comparison()?;
            left = Pred::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Pred> {
        let left = self.parse_primary()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.pos += 1;
                Ok(Pred::Eq(Box::new(left), Box::new(self.parse_primary()?)))
            }
            Some(Token::NotEq) => {
                self.pos += 1;
                Ok(Pred::Ne(Box::new(left), Box::new(self.parse_primary()?)))
            }
            _ => Ok(left),
        }
    }

    fn parse_primary(&mut self) -> Result<Pred> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Pred::Number(n)),
            Some(Token::Literal(s)) => Ok(Pred::Literal(s)),
            Some(Token::Dot) => Ok(Pred::ContextString),
            Some(Token::At) => match self.next() {
                Some(Token::Name(name)) => Ok(Pred::Attribute(name.to_lowercase())),
                _ => Err(self.error("expected an attribute name after '@'")),
            },
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                let (function, arity) = Function::lookup(&name)
                    .ok_or_else(|| self.error(format!("unsupported function '{}()'", name)))?;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    args.push(self.parse_or()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.pos += 1;
                        args.push(self.parse_or()?);
                    }
                }
                self.expect(Token::RParen)?;
                if !arity.contains(&args.len()) {
                    return Err(self.error(format!("wrong number of arguments to '{}()'", name)));
                }
                Ok(Pred::Call(function, args))
            }
            Some(t) => Err(self.error(format!("unexpected {:?} in predicate", t))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

// ===== EVALUATION =====

impl Step {
    fn apply(&self, doc: &Document, context: &[NodeId], order: &[usize]) -> Vec<NodeId> {
        let mut out = Vec::new();
        for node in context {
            let mut candidates: Vec<NodeId> = self
                .axis_nodes(doc, *node)
                .into_iter()
                .filter(|n| self.test.matches(doc, *n))
                .collect();
            for pred in &self.predicates {
                candidates = filter_by(pred, doc, candidates);
            }
            out.extend(candidates);
        }
        out.sort_by_key(|n| order[n.index()]);
        out.dedup();
        out
    }

    fn axis_nodes(&self, doc: &Document, node: NodeId) -> Vec<NodeId> {
        match self.axis {
            Axis::Child => doc.children(node).to_vec(),
            Axis::Descendant => doc.descendants(node),
            Axis::DescendantOrSelf => {
                let mut nodes = vec![node];
                nodes.extend(doc.descendants(node));
                nodes
            }
            Axis::SelfAxis => vec![node],
            Axis::Parent => doc.parent(node).into_iter().collect(),
        }
    }
}

impl NodeTest {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            NodeTest::Name(name) => doc.tag(node) == Some(name.as_str()),
            NodeTest::AnyElement => doc.is_element(node),
            NodeTest::AnyNode => true,
            NodeTest::Text => matches!(doc.get(node).map(|n| &n.data), Some(NodeData::Text(_))),
        }
    }
}

fn filter_by(pred: &Pred, doc: &Document, nodes: Vec<NodeId>) -> Vec<NodeId> {
    let size = nodes.len();
    nodes
        .into_iter()
        .enumerate()
        .filter(|(i, node)| {
            let ctx = Context {
                doc,
                node: *node,
                position: i + 1,
                size,
            };
            match pred.eval(&ctx) {
                Value::Number(n) => n == (i + 1) as f64,
                other => other.truthy(),
            }
        })
        .map(|(_, node)| node)
        .collect()
}

struct Context<'a> {
    doc: &'a Document,
    node: NodeId,
    position: usize,
    size: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    // attribute lookups behave like node-sets of zero or one node
    Attr(Option<String>),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Attr(a) => a.is_some(),
        }
    }

    fn string(&self) -> String {
        match self {
            Value::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Value::Number(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Attr(a) => a.clone().unwrap_or_default(),
        }
    }

    fn number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            other => other.string().trim().parse().unwrap_or(f64::NAN),
        }
    }
}

fn compare(left: &Value, right: &Value) -> Option<bool> {
    if matches!(left, Value::Attr(None)) || matches!(right, Value::Attr(None)) {
        return None;
    }
    let equal = match (left, right) {
        (Value::Bool(_), _) | (_, Value::Bool(_)) => left.truthy() == right.truthy(),
        (Value::Number(_), _) | (_, Value::Number(_)) => left.number() == right.number(),
        _ => left.string() == right.string(),
    };
    Some(equal)
}

impl Pred {
    fn eval(&self, ctx: &Context) -> Value {
        match self {
            Pred::Or(a, b) => Value::Bool(a.eval(ctx).truthy() || b.eval(ctx).truthy()),
            Pred::And(a, b) => Value::Bool(a.eval(ctx).truthy() && b.eval(ctx).truthy()),
            Pred::Eq(a, b) => Value::Bool(compare(&a.eval(ctx), &b.eval(ctx)) == Some(true)),
            Pred::Ne(a, b) => Value::Bool(compare(&a.eval(ctx), &b.eval(ctx)) == Some(false)),
            Pred::Number(n) => Value::Number(*n),
            Pred::Literal(s) => Value::Str(s.clone()),
            Pred::Attribute(name) => Value::Attr(
                ctx.doc
                    .element(ctx.node)
                    .and_then(|el| el.attributes.get(name))
                    .map(str::to_string),
            ),
            Pred::ContextString => Value::Str(ctx.doc.text_content(ctx.node)),
            Pred::Call(function, args) => call(*function, args, ctx),
        }
    }
}

fn call(function: Function, args: &[Pred], ctx: &Context) -> Value {
    let arg = |i: usize| args.get(i).map(|a| a.eval(ctx).string());
    match function {
        Function::Contains => {
            Value::Bool(arg(0).unwrap_or_default().contains(&arg(1).unwrap_or_default()))
        }
        Function::StartsWith => {
            Value::Bool(arg(0).unwrap_or_default().starts_with(&arg(1).unwrap_or_default()))
        }
        Function::Position => Value::Number(ctx.position as f64),
        Function::Last => Value::Number(ctx.size as f64),
        Function::Not => Value::Bool(!args.first().map(|a| a.eval(ctx).truthy()).unwrap_or(false)),
        Function::NormalizeSpace => {
            let text = arg(0).unwrap_or_else(|| ctx.doc.text_content(ctx.node));
            Value::Str(text.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        Function::String => Value::Str(arg(0).unwrap_or_else(|| ctx.doc.text_content(ctx.node))),
        Function::Text => Value::Str(
            ctx.doc
                .children(ctx.node)
                .iter()
                .filter_map(|c| match ctx.doc.get(*c).map(|n| &n.data) {
                    Some(NodeData::Text(t)) => Some(t.as_str()),
                    _ => None,
                })
                .collect(),
        ),
    }
}
