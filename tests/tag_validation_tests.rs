use pulse_metrics::{
    merge_tags, validate_tags, MetricError, MetricOptions, Registry, TagError, TagPolicy, Tags,
};

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn default_policy_limits() {
    let policy = TagPolicy::default();
    assert_eq!(policy.max_keys, 10);
    assert_eq!(policy.max_key_length, 100);
    assert_eq!(policy.max_value_length, 200);
    assert_eq!(policy.max_cardinality, 1000);
    assert!(policy.disallowed_keys.is_empty());
}

#[test]
fn accepts_tags_within_limits() {
    let set = tags(&[("service", "api"), ("region", "us-east-1")]);
    assert!(validate_tags(&set, &TagPolicy::default()).is_ok());
    assert!(validate_tags(&Tags::new(), &TagPolicy::default()).is_ok());
}

#[test]
fn rejects_too_many_keys() {
    let policy = TagPolicy {
        max_keys: 2,
        ..TagPolicy::default()
    };
    let set = tags(&[("a", "1"), ("b", "2"), ("c", "3")]);

    let err = validate_tags(&set, &policy).unwrap_err();
    assert_eq!(err, TagError::TooManyKeys { count: 3, max: 2 });
}

#[test]
fn rejects_long_key_and_value() {
    let policy = TagPolicy {
        max_key_length: 4,
        max_value_length: 4,
        ..TagPolicy::default()
    };

    let err = validate_tags(&tags(&[("toolong", "v")]), &policy).unwrap_err();
    assert!(matches!(err, TagError::KeyTooLong { max: 4, .. }));

    let err = validate_tags(&tags(&[("k", "toolong")]), &policy).unwrap_err();
    assert!(matches!(err, TagError::ValueTooLong { max: 4, .. }));
}

#[test]
fn rejects_empty_and_disallowed_keys() {
    let err = validate_tags(&tags(&[("", "v")]), &TagPolicy::default()).unwrap_err();
    assert_eq!(err, TagError::EmptyKey);

    let policy = TagPolicy {
        disallowed_keys: vec!["host".into()],
        ..TagPolicy::default()
    };
    let err = validate_tags(&tags(&[("host", "web-1")]), &policy).unwrap_err();
    assert_eq!(err, TagError::DisallowedKey { key: "host".into() });
}

#[test]
fn boundary_lengths_are_accepted() {
    let policy = TagPolicy {
        max_key_length: 3,
        max_value_length: 3,
        ..TagPolicy::default()
    };
    assert!(validate_tags(&tags(&[("abc", "xyz")]), &policy).is_ok());
}

#[test]
fn registry_surfaces_tag_violations_at_creation() {
    let policy = TagPolicy {
        max_keys: 1,
        ..TagPolicy::default()
    };
    let registry = Registry::new(policy, std::time::Duration::ZERO);

    let opts = MetricOptions::new("requests_total")
        .with_tag("a", "1")
        .with_tag("b", "2");
    let err = registry.counter(opts).unwrap_err();
    assert!(matches!(err, MetricError::InvalidTags(_)));

    // Nothing was registered by the failed call.
    assert!(registry.is_empty());
}

#[test]
fn merge_is_copy_on_write() {
    let base = tags(&[("service", "api"), ("region", "us")]);
    let overlay = tags(&[("region", "eu"), ("zone", "b")]);

    let merged = merge_tags(&base, &overlay);
    assert_eq!(merged.len(), 3);
    assert_eq!(merged["region"], "eu");
    assert_eq!(merged["service"], "api");
    assert_eq!(merged["zone"], "b");

    // Inputs are untouched.
    assert_eq!(base["region"], "us");
    assert_eq!(overlay.len(), 2);
}

#[test]
fn merge_of_empty_sets_is_empty_but_usable() {
    let merged = merge_tags(&Tags::new(), &Tags::new());
    assert!(merged.is_empty());

    let mut extended = merged;
    extended.insert("k".into(), "v".into());
    assert_eq!(extended.len(), 1);
}
