//! Keyword tables used by the name generator
//!
//! All tables are plain data so a deployment can override them from the JSON
//! config file without touching code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One keyword → context rule. Rules are tried in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextKeyword {
    /// Substring looked for in class names (case-insensitive)
    pub keyword: String,
    /// Prefix emitted when the keyword matches
    pub context: String,
}

impl ContextKeyword {
    fn new(keyword: &str, context: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            context: context.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingTables {
    /// Extended-Latin character → ASCII replacement
    pub transliteration: BTreeMap<String, String>,

    /// Lower-case domain word → canonical upper-case token
    pub words: BTreeMap<String, String>,

    /// Class keyword → context prefix, in priority order
    pub contexts: Vec<ContextKeyword>,

    /// Class substrings marking a list-like container
    pub list_class_hints: Vec<String>,

    /// Characters of normalized text kept as a name seed
    pub text_seed_len: usize,

    /// Ancestor levels scanned for a context prefix
    pub context_depth: usize,
}

impl Default for NamingTables {
    fn default() -> Self {
        Self {
            transliteration: default_transliteration(),
            words: default_words(),
            contexts: default_contexts(),
            list_class_hints: vec!["list".to_string(), "item".to_string()],
            text_seed_len: 20,
            context_depth: 3,
        }
    }
}

impl NamingTables {
    /// ASCII replacement for `c`, if the table has one
    pub fn transliterate_char(&self, c: char) -> Option<&str> {
        let mut buf = [0u8; 4];
        self.transliteration
            .get(c.encode_utf8(&mut buf) as &str)
            .map(String::as_str)
    }

    /// Canonical token for a domain word, matched case-insensitively
    pub fn canonical_word(&self, word: &str) -> Option<&str> {
        self.words.get(&word.to_lowercase()).map(String::as_str)
    }
}

fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_transliteration() -> BTreeMap<String, String> {
    pairs(&[
        // Turkish
        ("ç", "c"),
        ("Ç", "C"),
        ("ğ", "g"),
        ("Ğ", "G"),
        ("ı", "i"),
        ("İ", "I"),
        ("ö", "o"),
        ("Ö", "O"),
        ("ş", "s"),
        ("Ş", "S"),
        ("ü", "u"),
        ("Ü", "U"),
        // circumflexed loanword spellings
        ("â", "a"),
        ("Â", "A"),
        ("î", "i"),
        ("Î", "I"),
        ("û", "u"),
        ("Û", "U"),
        // common western European letters
        ("á", "a"),
        ("à", "a"),
        ("ä", "a"),
        ("é", "e"),
        ("É", "E"),
        ("è", "e"),
        ("ê", "e"),
        ("ë", "e"),
        ("í", "i"),
        ("ó", "o"),
        ("ú", "u"),
        ("ñ", "n"),
        ("ß", "ss"),
    ])
}

fn default_words() -> BTreeMap<String, String> {
    pairs(&[
        ("hesap", "ACCOUNT"),
        ("hesabim", "MY_ACCOUNT"),
        ("giris", "LOGIN"),
        ("signin", "LOGIN"),
        ("cikis", "LOGOUT"),
        ("uye", "MEMBER"),
        ("kayit", "REGISTER"),
        ("sepet", "CART"),
        ("sepetim", "CART"),
        ("sepete", "CART"),
        ("basket", "CART"),
        ("ekle", "ADD"),
        ("ara", "SEARCH"),
        ("arama", "SEARCH"),
        ("kategori", "CATEGORY"),
        ("kategoriler", "CATEGORIES"),
        ("favori", "FAVORITE"),
        ("favoriler", "FAVORITES"),
        ("favourite", "FAVORITE"),
        ("wishlist", "FAVORITE"),
        ("fiyat", "PRICE"),
        ("indirim", "DISCOUNT"),
        ("urun", "PRODUCT"),
        ("urunler", "PRODUCTS"),
        ("siparis", "ORDER"),
        ("siparislerim", "MY_ORDERS"),
        ("odeme", "PAYMENT"),
        ("kampanya", "CAMPAIGN"),
        ("kampanyalar", "CAMPAIGNS"),
        ("adres", "ADDRESS"),
        ("sifre", "PASSWORD"),
        ("eposta", "EMAIL"),
        ("telefon", "PHONE"),
        ("gonder", "SUBMIT"),
        ("kaydet", "SAVE"),
        ("iptal", "CANCEL"),
        ("sil", "DELETE"),
        ("duzenle", "EDIT"),
        ("devam", "CONTINUE"),
        ("geri", "BACK"),
        ("ileri", "NEXT"),
        ("kapat", "CLOSE"),
        ("tamam", "OK"),
        ("filtre", "FILTER"),
        ("sirala", "SORT"),
        ("yorum", "REVIEW"),
        ("yorumlar", "REVIEWS"),
        ("anasayfa", "HOME"),
        ("yardim", "HELP"),
        ("iletisim", "CONTACT"),
        ("magaza", "STORE"),
        ("kargo", "SHIPPING"),
        ("ucretsiz", "FREE"),
        ("yeni", "NEW"),
        ("detay", "DETAIL"),
        ("incele", "VIEW"),
    ])
}

fn default_contexts() -> Vec<ContextKeyword> {
    [
        ("nav", "NAV"),
        ("menu", "MENU"),
        ("header", "HEADER"),
        ("footer", "FOOTER"),
        ("sidebar", "SIDEBAR"),
        ("breadcrumb", "BREADCRUMB"),
        ("modal", "MODAL"),
        ("popup", "POPUP"),
        ("dialog", "DIALOG"),
        ("card", "CARD"),
        ("product", "PRODUCT"),
        ("basket", "CART"),
        ("cart", "CART"),
        ("checkout", "CHECKOUT"),
        ("search", "SEARCH"),
        ("filter", "FILTER"),
        ("login", "LOGIN"),
        ("form", "FORM"),
        ("banner", "BANNER"),
        ("slider", "SLIDER"),
        ("carousel", "CAROUSEL"),
        ("tabs", "TAB"),
        ("pagination", "PAGINATION"),
    ]
    .iter()
    .map(|(k, c)| ContextKeyword::new(k, c))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_cover_turkish_letters() {
        let tables = NamingTables::default();
        for c in "çğıöşüÇĞİÖŞÜ".chars() {
            assert!(tables.transliterate_char(c).is_some(), "missing {}", c);
        }
        assert_eq!(tables.transliterate_char('a'), None);
    }

    #[test]
    fn test_canonical_word_is_case_insensitive() {
        let tables = NamingTables::default();
        assert_eq!(tables.canonical_word("SEPET"), Some("CART"));
        assert_eq!(tables.canonical_word("Giris"), Some("LOGIN"));
        assert_eq!(tables.canonical_word("karar"), None);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let tables: NamingTables =
            serde_json::from_str(r#"{"contexts": [{"keyword": "hero", "context": "HERO"}]}"#).unwrap();
        assert_eq!(tables.contexts.len(), 1);
        assert_eq!(tables.text_seed_len, 20);
        assert!(!tables.words.is_empty());
    }
}
