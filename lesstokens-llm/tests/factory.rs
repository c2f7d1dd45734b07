use lesstokens_core::ErrorKind;
use lesstokens_llm::{create_provider, LlmProvider, Provider, ProviderKind, ProviderOptions};

#[test]
fn factory_builds_every_supported_backend() {
    let options = ProviderOptions::default();
    for (name, kind) in [
        ("openai", ProviderKind::OpenAi),
        ("anthropic", ProviderKind::Anthropic),
        ("google", ProviderKind::Google),
        ("deepseek", ProviderKind::DeepSeek),
    ] {
        let provider = create_provider(name, &options).expect("provider");
        assert_eq!(provider.kind(), kind);
        assert_eq!(provider.name(), name);
    }
}

#[test]
fn factory_matches_names_case_insensitively() {
    let provider = create_provider("OpenAI", &ProviderOptions::default()).expect("provider");
    assert!(matches!(provider, Provider::OpenAi(_)));

    let provider = create_provider(" DeepSeek ", &ProviderOptions::default()).expect("provider");
    assert_eq!(provider.kind(), ProviderKind::DeepSeek);
}

#[test]
fn factory_rejects_unknown_provider_listing_supported_set() {
    let err = create_provider("mistral", &ProviderOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidProvider);
    assert_eq!(
        err.message(),
        "Provider 'mistral' is not supported. Supported providers: openai, anthropic, google, deepseek"
    );
}

#[test]
fn provider_kind_round_trips_through_display() {
    for kind in ProviderKind::ALL {
        let parsed: ProviderKind = kind.to_string().parse().expect("parse");
        assert_eq!(parsed, kind);
    }
}
