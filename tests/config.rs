use fvbox::config::{CacheConfig, DifferenceMethod, FvConfig, LinearizerConfig};
use fvbox::FvError;

#[test]
fn partial_document_keeps_defaults() {
    let cfg: FvConfig = serde_json::from_str(
        r#"{ "linearizer": { "difference": "forward" }, "cache": { "enable_thermodynamic_hints": true } }"#,
    )
    .unwrap();
    assert_eq!(cfg.linearizer.difference, DifferenceMethod::Forward);
    assert_eq!(cfg.linearizer.base_epsilon, LinearizerConfig::default().base_epsilon);
    assert!(cfg.cache.enable_intensive_quantity_cache);
    assert!(cfg.cache.enable_thermodynamic_hints);
    assert!(!cfg.context.require_center_gradients);
    cfg.validate().unwrap();
}

#[test]
fn empty_document_is_the_default() {
    let cfg: FvConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, FvConfig::default());
}

#[test]
fn round_trips_through_json() {
    let cfg = FvConfig {
        cache: CacheConfig {
            enable_intensive_quantity_cache: false,
            enable_thermodynamic_hints: false,
        },
        linearizer: LinearizerConfig {
            base_epsilon: 1e-6,
            difference: DifferenceMethod::Backward,
        },
        ..Default::default()
    };
    let text = serde_json::to_string(&cfg).unwrap();
    assert!(text.contains("\"backward\""));
    let back: FvConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn unknown_difference_method_is_rejected() {
    let parsed = serde_json::from_str::<FvConfig>(r#"{ "linearizer": { "difference": "upwind" } }"#);
    assert!(parsed.is_err());
}

#[test]
fn negative_epsilon_fails_validation() {
    let cfg: FvConfig = serde_json::from_str(r#"{ "linearizer": { "base_epsilon": -1e-8 } }"#).unwrap();
    assert!(matches!(cfg.validate(), Err(FvError::InvalidConfig(msg)) if msg.contains("base_epsilon")));
}
