//! Tests for element name generation on a realistic page


use element_hunter::hunter::{ContextKeyword, NameGenerator, NamingTables};
use fixtures::shop_page;

#[test]
fn test_names_on_shop_page() {
    let page = shop_page();
    let tables = NamingTables::default();
    let names = NameGenerator::new(&tables);
    let doc = &page.doc;
    let mut counter = 1;

    assert_eq!(names.generate(doc, page.login_link, &mut counter), "NAV_LOGIN_LINK");
    assert_eq!(names.generate(doc, page.cart_link, &mut counter), "NAV_CART_LINK");
    assert_eq!(names.generate(doc, page.search_input, &mut counter), "SEARCH_Q_INPUT");
    assert_eq!(
        names.generate(doc, page.submit_button, &mut counter),
        "SEARCH_SUBMIT_BTN_BUTTON"
    );
    assert_eq!(names.generate(doc, page.titles[1], &mut counter), "CARD_PRODUCT_2_LINK");
    assert_eq!(names.generate(doc, page.images[0], &mut counter), "CARD_IMG_6_IMAGE");
    assert_eq!(counter, 7);
    println!("✅ Names combine context, seed and role");
}

#[test]
fn test_long_text_seed_is_cut() {
    let page = shop_page();
    let tables = NamingTables::default();
    let mut counter = 1;

    let name = NameGenerator::new(&tables).generate(&page.doc, page.promo, &mut counter);
    assert_eq!(name, "HAFTANIN_FIRSATLARI_ELEMENT");
    println!("✅ Text seed: {}", name);
}

#[test]
fn test_list_items_are_numbered_by_position() {
    let page = shop_page();
    let tables = NamingTables::default();
    let names = NameGenerator::new(&tables);
    let mut counter = 40;

    let third = names.generate(&page.doc, page.items[2], &mut counter);
    assert!(third.ends_with("_LIST_3"), "{}", third);

    // nested inside the list but not a direct child: numbered by counter
    let cover = names.generate(&page.doc, page.covers[0], &mut counter);
    assert!(cover.ends_with("_LIST_41"), "{}", cover);
    println!("✅ List suffixes: {} / {}", third, cover);
}

#[test]
fn test_same_input_same_name() {
    let page = shop_page();
    let tables = NamingTables::default();
    let names = NameGenerator::new(&tables);

    for node in page.doc.elements() {
        let mut a = 5;
        let mut b = 5;
        assert_eq!(names.generate(&page.doc, node, &mut a), names.generate(&page.doc, node, &mut b));
        assert_eq!(a, 6);

        let name = names.generate(&page.doc, node, &mut a);
        assert!(!name.is_empty());
        assert!(!name.starts_with('_') && !name.ends_with('_') && !name.contains("__"), "{}", name);
        assert!(
            name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'),
            "{}",
            name
        );
    }
    println!("✅ Names are deterministic and well-formed");
}

#[test]
fn test_custom_context_table() {
    let page = shop_page();
    let tables = NamingTables {
        contexts: vec![ContextKeyword {
            keyword: "header".to_string(),
            context: "TOP".to_string(),
        }],
        ..Default::default()
    };
    let mut counter = 1;

    let name = NameGenerator::new(&tables).generate(&page.doc, page.login_link, &mut counter);
    assert_eq!(name, "TOP_LOGIN_LINK");
}
