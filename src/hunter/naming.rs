//! Automation-friendly element names
//!
//! Names look like `NAV_LOGIN_LINK` or `SEARCH_INPUT`: an upper-case seed
//! derived from the element, an optional page-context prefix and a suffix for
//! the element's role.

use super::tables::NamingTables;
use crate::dom::{Document, ElementData, NodeId};

pub struct NameGenerator<'a> {
    tables: &'a NamingTables,
}

impl<'a> NameGenerator<'a> {
    pub fn new(tables: &'a NamingTables) -> Self {
        Self { tables }
    }

    /// Name for `node`; `counter` is incremented exactly once per call
    pub fn generate(&self, doc: &Document, node: NodeId, counter: &mut u32) -> String {
        let current = *counter;
        *counter += 1;

        let Some(el) = doc.element(node) else {
            return format!("NODE_{}", current);
        };

        let seed = self
            .seed_candidates(doc, node, el)
            .into_iter()
            .map(|raw| self.normalize_seed(&raw))
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}_{}", el.tag.to_uppercase(), current));

        let context = self.context_prefix(doc, node);
        let suffix = self.type_suffix(doc, node, el, current);

        let assembled = match context {
            Some(ctx) if !seed.contains(ctx.as_str()) => format!("{}_{}{}", ctx, seed, suffix),
            _ => format!("{}{}", seed, suffix),
        };
        collapse_underscores(&assembled)
    }

    fn seed_candidates(&self, doc: &Document, node: NodeId, el: &ElementData) -> Vec<String> {
        let mut seeds = Vec::new();
        if let Some(id) = el.id() {
            seeds.push(replace_non_alphanumeric(id));
        }
        if let Some(name) = el.name_attr() {
            seeds.push(replace_non_alphanumeric(name));
        }
        let text = doc.visible_text(node);
        if !text.is_empty() {
            let normalized = normalize_text(&text);
            seeds.push(normalized.chars().take(self.tables.text_seed_len).collect());
        }
        seeds
    }

    /// Transliterate, translate domain words, split camelCase and letter/digit
    /// runs, then upper-case.
    fn normalize_seed(&self, raw: &str) -> String {
        let ascii = self.transliterate(raw);
        let translated = ascii
            .split('_')
            .map(|word| self.tables.canonical_word(word).unwrap_or(word).to_string())
            .collect::<Vec<_>>()
            .join("_");
        collapse_underscores(&segment(&translated).to_uppercase())
    }

    fn transliterate(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            if let Some(rep) = self.tables.transliterate_char(c) {
                out.push_str(rep);
            } else if c.is_ascii_alphanumeric() || c == '_' {
                out.push(c);
            }
        }
        out
    }

    /// First context keyword found on the element's own classes, then on
    /// ancestors nearest first.
    fn context_prefix(&self, doc: &Document, node: NodeId) -> Option<String> {
        let levels = std::iter::once(node).chain(doc.ancestors(node).take(self.tables.context_depth));
        for level in levels {
            let Some(el) = doc.element(level) else { continue };
            for rule in &self.tables.contexts {
                if el.has_class_containing(&rule.keyword) {
                    return Some(rule.context.clone());
                }
            }
        }
        None
    }

    fn type_suffix(&self, doc: &Document, node: NodeId, el: &ElementData, current: u32) -> String {
        let input_type = el.input_type();
        let suffix = match el.tag.as_str() {
            "button" => "_BUTTON",
            "input" if matches!(input_type.as_deref(), Some("submit") | Some("button")) => "_BUTTON",
            "input" => "_INPUT",
            "a" => "_LINK",
            "img" => "_IMAGE",
            "select" => "_SELECT",
            "textarea" => "_TEXTAREA",
            _ => return self.list_suffix(doc, node, el, current),
        };
        suffix.to_string()
    }

    fn list_suffix(&self, doc: &Document, node: NodeId, el: &ElementData, current: u32) -> String {
        let container = doc.ancestors(node).find(|a| self.is_list_container(doc, *a));
        if el.tag != "li" && container.is_none() {
            return "_ELEMENT".to_string();
        }

        let index = container
            .filter(|c| doc.parent(node) == Some(*c))
            .and_then(|c| doc.element_children(c).position(|child| child == node))
            .map(|p| p as u32 + 1)
            .unwrap_or(current);
        format!("_LIST_{}", index)
    }

    fn is_list_container(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        el.tag == "ul"
            || el.tag == "ol"
            || self
                .tables
                .list_class_hints
                .iter()
                .any(|hint| el.has_class_containing(hint))
    }
}

fn replace_non_alphanumeric(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn is_extended_latin(c: char) -> bool {
    matches!(c, '\u{00C0}'..='\u{024F}') && c != '\u{00D7}' && c != '\u{00F7}'
}

/// Keep letters, digits and whitespace; whitespace runs become one `_`
fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || is_extended_latin(*c) || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// `_` between lower→upper and letter↔digit transitions
fn segment(word: &str) -> String {
    let mut out = String::with_capacity(word.len() + 8);
    let mut prev: Option<char> = None;
    for c in word.chars() {
        if let Some(p) = prev {
            let camel = p.is_ascii_lowercase() && c.is_ascii_uppercase();
            let digit_edge = (p.is_ascii_alphabetic() && c.is_ascii_digit())
                || (p.is_ascii_digit() && c.is_ascii_alphabetic());
            if camel || digit_edge {
                out.push('_');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn collapse_underscores(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_of(doc: &Document, node: NodeId, counter: &mut u32) -> String {
        let tables = NamingTables::default();
        NameGenerator::new(&tables).generate(doc, node, counter)
    }

    #[test]
    fn test_segment_and_collapse() {
        assert_eq!(segment("loginButton2x"), "login_Button_2_x");
        assert_eq!(collapse_underscores("__A__B_"), "A_B");
        assert_eq!(normalize_text("  Sepete   Ekle! "), "Sepete_Ekle");
    }

    #[test]
    fn test_id_seed_with_button_suffix() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let button = doc.append_element(body, ElementData::new("button").with_id("submit-btn"));

        let mut counter = 1;
        assert_eq!(name_of(&doc, button, &mut counter), "SUBMIT_BTN_BUTTON");
        assert_eq!(counter, 2);
    }

    #[test]
    fn test_turkish_text_is_transliterated_and_translated() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let link = doc.append_element(body, ElementData::new("a"));
        doc.append_text(link, "Giriş");
        let cart = doc.append_element(body, ElementData::new("button"));
        doc.append_text(cart, "Sepete Ekle");

        let mut counter = 1;
        assert_eq!(name_of(&doc, link, &mut counter), "LOGIN_LINK");
        assert_eq!(name_of(&doc, cart, &mut counter), "CART_ADD_BUTTON");
    }

    #[test]
    fn test_context_prefix_from_ancestor() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let nav = doc.append_element(body, ElementData::new("nav").with_class("main-nav"));
        let link = doc.append_element(nav, ElementData::new("a").with_id("account"));

        let mut counter = 1;
        assert_eq!(name_of(&doc, link, &mut counter), "NAV_ACCOUNT_LINK");
    }

    #[test]
    fn test_context_not_repeated_when_seed_contains_it() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let form = doc.append_element(body, ElementData::new("div").with_class("search-box"));
        let input = doc.append_element(form, ElementData::new("input").with_attr("name", "search"));

        let mut counter = 1;
        assert_eq!(name_of(&doc, input, &mut counter), "SEARCH_INPUT");
    }

    #[test]
    fn test_list_items_use_sibling_position() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let list = doc.append_element(body, ElementData::new("ul"));
        doc.append_element(list, ElementData::new("li"));
        let second = doc.append_element(list, ElementData::new("li"));

        let mut counter = 7;
        assert_eq!(name_of(&doc, second, &mut counter), "LI_7_LIST_2");
        assert_eq!(counter, 8);
    }

    #[test]
    fn test_fallback_seed_uses_tag_and_counter() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let div = doc.append_element(body, ElementData::new("div"));
        let arrow = doc.append_element(body, ElementData::new("span"));
        doc.append_text(arrow, "→");

        let mut counter = 3;
        assert_eq!(name_of(&doc, div, &mut counter), "DIV_3_ELEMENT");
        assert_eq!(name_of(&doc, arrow, &mut counter), "SPAN_4_ELEMENT");
    }

    #[test]
    fn test_submit_input_is_button() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let input = doc.append_element(
            body,
            ElementData::new("input").with_attr("type", "Submit").with_value("Gönder"),
        );

        let mut counter = 1;
        assert_eq!(name_of(&doc, input, &mut counter), "SUBMIT_BUTTON");
    }
}
