//! CSS selector engine
//!
//! Enough of Selectors Level 3 to answer `querySelectorAll` counts for the
//! locators the hunter produces and the ones people usually paste back in:
//! type and universal selectors, `#id`, `.class`, attribute selectors, selector
//! lists, descendant and child combinators. Pseudo-classes and sibling
//! combinators are rejected, as is any malformed identifier.

use super::document::{Document, ElementData, NodeId};
use crate::error::{HunterError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(Vec<ComplexSelector>);

#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    compounds: Vec<Compound>,
    // combinators[i] sits between compounds[i] and compounds[i + 1]
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeSelector>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttributeSelector {
    name: String,
    test: Option<(AttrOp, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AttrOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
    DashMatch,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self> {
        Parser::new(input).parse_list()
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.0.iter().any(|complex| complex.matches(doc, node))
    }
}

/// All elements matching `selector`, in document order
pub fn query_selector_all(doc: &Document, selector: &str) -> Result<Vec<NodeId>> {
    let list = SelectorList::parse(selector)?;
    Ok(doc
        .elements()
        .into_iter()
        .filter(|n| list.matches(doc, *n))
        .collect())
}

/// Number of elements matching `selector`
pub fn count(doc: &Document, selector: &str) -> Result<usize> {
    query_selector_all(doc, selector).map(|nodes| nodes.len())
}

impl ComplexSelector {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.match_from(self.compounds.len() - 1, doc, node)
    }

    fn match_from(&self, idx: usize, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        if !self.compounds[idx].matches(el) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => doc
                .parent_element(node)
                .map(|p| self.match_from(idx - 1, doc, p))
                .unwrap_or(false),
            Combinator::Descendant => doc.ancestors(node).any(|a| self.match_from(idx - 1, doc, a)),
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches(&self, el: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if *tag != el.tag {
                return false;
            }
        }
        if !self.ids.iter().all(|id| el.attributes.get("id") == Some(id.as_str())) {
            return false;
        }
        if !self.classes.iter().all(|c| el.classes().any(|t| t == c)) {
            return false;
        }
        self.attributes.iter().all(|a| a.matches(el))
    }
}

impl AttributeSelector {
    fn matches(&self, el: &ElementData) -> bool {
        let Some(actual) = el.attributes.get(&self.name) else {
            return false;
        };
        let Some((op, expected)) = &self.test else {
            return true;
        };
        let expected = expected.as_str();
        match op {
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => !expected.is_empty() && actual.split_whitespace().any(|t| t == expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
            AttrOp::DashMatch => actual == expected || actual.starts_with(&format!("{}-", expected)),
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> HunterError {
        HunterError::selector(self.source, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<SelectorList> {
        let mut list = Vec::new();
        loop {
            self.skip_whitespace();
            list.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.bump() {
                None => break,
                Some(',') => continue,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(SelectorList(list))
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some('+') | Some('~') => {
                    return Err(self.error("sibling combinators are not supported"))
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        let mut universal = false;
        if self.eat('*') {
            universal = true;
        } else if self.peek().is_some_and(|c| is_name_start(c) || c == '-' || c == '\\') {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(':') => return Err(self.error("pseudo-classes are not supported")),
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        if self.eat(']') {
            return Ok(AttributeSelector { name, test: None });
        }

        let op = match self.bump() {
            Some('=') => AttrOp::Equals,
            Some(c @ ('~' | '^' | '$' | '*' | '|')) => {
                if !self.eat('=') {
                    return Err(self.error("expected '=' in attribute selector"));
                }
                match c {
                    '~' => AttrOp::Includes,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    _ => AttrOp::DashMatch,
                }
            }
            _ => return Err(self.error("malformed attribute selector")),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_string(q)?
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        if !self.eat(']') {
            return Err(self.error("expected ']'"));
        }
        Ok(AttributeSelector {
            name,
            test: Some((op, value)),
        })
    }

    fn parse_string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.parse_escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        let mut out = String::new();
        if self.eat('-') {
            out.push('-');
            if self.eat('-') {
                out.push('-');
            }
        }
        match self.peek() {
            Some('\\') => {
                self.pos += 1;
                out.push(self.parse_escape()?);
            }
            Some(c) if is_name_start(c) => {
                self.pos += 1;
                out.push(c);
            }
            Some(c) if c.is_ascii_digit() => {
                return Err(self.error("identifier cannot start with a digit"))
            }
            _ if out == "--" => return Ok(out),
            _ => return Err(self.error("expected an identifier")),
        }
        loop {
            match self.peek() {
                Some('\\') => {
                    self.pos += 1;
                    out.push(self.parse_escape()?);
                }
                Some(c) if is_name_char(c) => {
                    self.pos += 1;
                    out.push(c);
                }
                _ => return Ok(out),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char> {
        let mut hex = String::new();
        while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            hex.push(self.bump().unwrap_or_default());
        }
        if hex.is_empty() {
            return self.bump().ok_or_else(|| self.error("dangling escape"));
        }
        if self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid escape"))
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}
