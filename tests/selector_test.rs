//! Tests for selector synthesis and uniqueness counting
//!
//! Tests cover:
//! - Priority ladder over a realistic page
//! - XPath fallback always resolving back to its element
//! - Product-image ordinals
//! - Locators that cannot be evaluated counting as zero


use element_hunter::dom::{css, xpath, Document, ElementData};
use element_hunter::hunter::{evaluate_counts, synthesize, xpath_fallback, SelectorConfig, SelectorType};
use fixtures::shop_page;

#[test]
fn test_every_xpath_resolves_to_its_element() {
    let page = shop_page();
    let doc = &page.doc;

    for node in doc.elements() {
        let path = xpath_fallback(doc, node);
        let matches = xpath::evaluate(doc, &path).unwrap();
        assert_eq!(matches, vec![node], "{} did not resolve uniquely", path);
    }
    println!("✅ {} element XPaths resolve back to their element", doc.elements().len());
}

#[test]
fn test_custom_element_xpaths_resolve() {
    let mut doc = Document::with_body();
    let body = doc.body().expect("body");
    let host = doc.append_element(body, ElementData::new("my-el.v2"));
    let inner = doc.append_element(host, ElementData::new("x-"));
    let twin = doc.append_element(host, ElementData::new("x-"));
    let dotted = doc.append_element(twin, ElementData::new("a.b-c_d"));

    for node in [host, inner, twin, dotted] {
        let path = xpath_fallback(&doc, node);
        assert_eq!(xpath::evaluate(&doc, &path).unwrap(), vec![node], "{} did not resolve", path);
    }
    assert_eq!(xpath_fallback(&doc, dotted), "/html/body/my-el.v2/x-[2]/a.b-c_d");
    println!("✅ Custom element names survive the XPath round trip");
}

#[test]
fn test_primary_selectors_on_shop_page() {
    let page = shop_page();
    let config = SelectorConfig::default();
    let doc = &page.doc;

    let button = synthesize(doc, page.submit_button, &config);
    assert_eq!(button.selector, "#submit-btn");
    assert_eq!(button.selector_type, SelectorType::Id);

    let input = synthesize(doc, page.search_input, &config);
    assert_eq!(input.selector, "[name=\"q\"]");
    assert_eq!(input.selector_type, SelectorType::Name);

    let link = synthesize(doc, page.login_link, &config);
    assert_eq!(link.selector, ".nav-link");
    assert_eq!(link.selector_type, SelectorType::ClassName);
    assert_eq!(link.xpath, "/html/body/header/nav/a[1]");

    let promo = synthesize(doc, page.promo, &config);
    assert_eq!(promo.selector_type, SelectorType::Xpath);
    assert_eq!(promo.selector, "/html/body/section");
    println!("✅ Priority ladder picks id, name, class and XPath as expected");
}

#[test]
fn test_product_images_get_ordinal_xpath() {
    let page = shop_page();
    let doc = &page.doc;
    let config = SelectorConfig::default();

    for (i, image) in page.images.iter().enumerate() {
        let s = synthesize(doc, *image, &config);
        assert_eq!(s.selector_type, SelectorType::Xpath);
        assert_eq!(
            s.selector,
            format!("/descendant::img[contains(@class, \"productCard__img\")][{}]", i + 1)
        );
        assert_eq!(xpath::evaluate(doc, &s.selector).unwrap(), vec![*image]);

        let counts = evaluate_counts(doc, *image, &s);
        assert_eq!(counts.css_selector, 0);
        assert_eq!(counts.class_name, 3);
        assert_eq!(counts.xpath, 1);
    }
    println!("✅ Product images are addressed by ordinal");
}

#[test]
fn test_counts_reflect_live_document() {
    let page = shop_page();
    let doc = &page.doc;
    let config = SelectorConfig::default();

    let link = synthesize(doc, page.login_link, &config);
    let counts = evaluate_counts(doc, page.login_link, &link);
    assert_eq!(counts.id, 0);
    assert_eq!(counts.class_name, 2);
    assert_eq!(counts.css_selector, 2);
    assert_eq!(counts.xpath, 1);

    for node in doc.elements() {
        let s = synthesize(doc, node, &config);
        let counts = evaluate_counts(doc, node, &s);
        if s.selector_type != SelectorType::Xpath {
            assert_eq!(counts.css_selector, css::count(doc, &s.selector).unwrap());
            assert!(counts.css_selector >= 1, "{} should match its own element", s.selector);
        }
        assert!(counts.xpath >= 1);
    }
    println!("✅ Counts agree with direct queries");
}

#[test]
fn test_unparseable_selectors_count_zero() {
    let mut doc = Document::with_body();
    let body = doc.body().unwrap();
    let odd = doc.append_element(body, ElementData::new("div").with_id("9lives").with_class("a:b"));
    let weird_name = doc.append_element(body, ElementData::new("input").with_attr("name", "x\"y"));

    let config = SelectorConfig::default();
    let s = synthesize(&doc, odd, &config);
    let counts = evaluate_counts(&doc, odd, &s);
    assert_eq!(counts.id, 0);
    assert_eq!(counts.css_selector, 0);
    assert_eq!(counts.xpath, 1);

    let s = synthesize(&doc, weird_name, &config);
    assert_eq!(s.selector, "[name=\"x\"y\"]");
    assert_eq!(evaluate_counts(&doc, weird_name, &s).css_selector, 0);
    println!("✅ Invalid locators count as zero instead of failing");
}
