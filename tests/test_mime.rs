use staticd::http::mime::ContentTypeRegistry;

#[test]
fn test_default_whitelist() {
    let registry = ContentTypeRegistry::new();

    assert_eq!(registry.lookup(".html"), Some("text/html"));
    assert_eq!(registry.lookup(".css"), Some("text/css"));
    assert_eq!(registry.lookup(".js"), Some("application/javascript"));
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_unknown_extensions_are_absent() {
    let registry = ContentTypeRegistry::new();

    assert_eq!(registry.lookup(".json"), None);
    assert_eq!(registry.lookup(".htm"), None);
    assert_eq!(registry.lookup(""), None);
    assert_eq!(registry.lookup("."), None);
}

#[test]
fn test_lookup_ignores_case() {
    let registry = ContentTypeRegistry::new();

    assert_eq!(registry.lookup(".HTML"), Some("text/html"));
    assert_eq!(registry.lookup(".Css"), Some("text/css"));
}

#[test]
fn test_with_adds_normalized_entry() {
    let registry = ContentTypeRegistry::new().with("SVG", "image/svg+xml");

    assert_eq!(registry.lookup(".svg"), Some("image/svg+xml"));
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_extend_from_config_map() {
    let mut extra = std::collections::BTreeMap::new();
    extra.insert(".png".to_string(), "image/png".to_string());
    extra.insert(".css".to_string(), "text/css; charset=utf-8".to_string());

    let mut registry = ContentTypeRegistry::default();
    registry.extend(&extra);

    assert_eq!(registry.lookup(".png"), Some("image/png"));
    assert_eq!(registry.lookup(".css"), Some("text/css; charset=utf-8"));
}
