/// Integration tests with mocked external APIs
/// Exercises the discovery, generation and export workflows without hitting
/// real services.
use axum::extract::{Path, State};
use axum::Json;
use rust_outreach_api::config::Config;
use rust_outreach_api::discovery::TargetDiscovery;
use rust_outreach_api::generator::{EmailGenerationRequest, EmailGenerator};
use rust_outreach_api::handlers::{self, AppState};
use rust_outreach_api::hunter::HunterClient;
use rust_outreach_api::models::{
    AnalyzeCompetitorsRequest, CampaignIdRequest, CampaignUpdate, CreateCampaignRequest,
    ExtractMetricsRequest, GenerateEmailsRequest,
};
use rust_outreach_api::openai::OpenAiClient;
use rust_outreach_api::store::InMemoryStore;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create a test config pointing at mock servers
fn create_test_config(openai_base_url: String, hunter_base_url: String) -> Config {
    Config {
        port: 3000,
        openai_api_key: Some("test_openai_key".to_string()),
        openai_base_url,
        hunter_api_key: Some("test_hunter_key".to_string()),
        hunter_base_url,
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn campaign_request(email_count: &str) -> CreateCampaignRequest {
    CreateCampaignRequest {
        business_name: "BizAI Tools".to_string(),
        business_description: "A SaaS platform that automates outreach".to_string(),
        target_audience: Some("startup founders".to_string()),
        email_count: email_count.to_string(),
        user_full_name: Some("Jane Doe".to_string()),
        user_position: Some("Head of Growth".to_string()),
    }
}

fn state_with_openai(server: &MockServer) -> Arc<AppState> {
    let config = create_test_config(server.uri(), "https://api.hunter.io".to_string());
    let openai_client =
        OpenAiClient::new(config.openai_base_url.clone(), "test_openai_key".to_string()).unwrap();
    Arc::new(AppState {
        store: Arc::new(InMemoryStore::new()),
        config,
        openai_client: Some(openai_client),
        // No hunter client: discovery uses the static fallback list
        hunter_client: None,
    })
}

const TEMPLATE_RESPONSE: &str =
    "SUBJECT: Quick note\nINITIAL: Hello body\nFOLLOWUP1: Ping\nFOLLOWUP2: Last ping";

// ---- generative client ----

#[tokio::test]
async fn test_generate_template_parses_sections_and_appends_signature() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(TEMPLATE_RESPONSE)))
        .mount(&mock_server)
        .await;

    let openai = OpenAiClient::new(mock_server.uri(), "test_key".to_string()).unwrap();
    let generator = EmailGenerator::new(openai);

    let email = generator
        .generate_template(&EmailGenerationRequest {
            business_name: "BizAI".to_string(),
            business_description: "automation".to_string(),
            target_audience: None,
            target: None,
            sender_name: Some("Jane Doe".to_string()),
            sender_position: Some("CEO".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(email.subject, "Quick note");
    assert!(email.body.starts_with("Hello body"));
    assert!(email.body.ends_with("Best,\nJane Doe\nCEO"));
    assert!(email.follow_up1.ends_with("Best,\nJane Doe\nCEO"));
}

#[tokio::test]
async fn test_generate_leads_normalizes_messy_json() {
    let mock_server = MockServer::start().await;

    let content = "Here you go:\n```json\n[\
        {\"first_name\":\"Ada\",\"last_name\":\"Lovelace\",\"company\":\"Engines\",\"domain\":\"engines.com\"},\
        {\"firstName\":\"Grace\",\"lastName\":\"Hopper\",\"company\":\"Navy Labs\",\"position\":\"Admiral\"},\
        ]\n```";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(&mock_server)
        .await;

    let openai = OpenAiClient::new(mock_server.uri(), "test_key".to_string()).unwrap();
    let generator = EmailGenerator::new(openai);

    let leads = generator
        .generate_leads("automation tools", Some("founders"), 3, 5)
        .await;

    assert_eq!(leads.len(), 2);
    assert_eq!(leads[0].first_name, "Ada");
    assert_eq!(leads[0].domain.as_deref(), Some("engines.com"));
    assert_eq!(leads[1].first_name, "Grace");
    assert_eq!(leads[1].title.as_deref(), Some("Admiral"));
}

#[tokio::test]
async fn test_metrics_extraction_uses_single_strict_retry() {
    let mock_server = MockServer::start().await;

    // The retry carries the stricter system instruction
    let metrics_json = r#"[{"name":"Competitor A","price_range":"$199-$999","stock_price":{"estimate":123.45,"confidence":40,"source":"model_estimate"},"notes":"estimated"}]"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("and nothing else"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(metrics_json)))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    // The initial request gets an unparseable answer
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "I cannot produce structured output right now, sorry.",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let openai = OpenAiClient::new(mock_server.uri(), "test_key".to_string()).unwrap();
    let generator = EmailGenerator::new(openai);

    let metrics = generator
        .extract_competitor_metrics(&["Competitor A is strong".to_string()])
        .await;

    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].name, "Competitor A");
    assert_eq!(metrics[0].price_range.as_deref(), Some("$199-$999"));
    let stock = metrics[0].stock_price.as_ref().unwrap();
    assert_eq!(stock.estimate, Some(123.45));
    assert_eq!(stock.confidence, Some(40.0));
}

#[tokio::test]
async fn test_openai_error_yields_empty_collections() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let openai = OpenAiClient::new(mock_server.uri(), "test_key".to_string()).unwrap();
    let generator = EmailGenerator::new(openai);

    assert!(generator.generate_leads("desc", None, 3, 5).await.is_empty());
    assert!(generator
        .extract_competitor_metrics(&["analysis".to_string()])
        .await
        .is_empty());
    assert!(generator
        .find_competitor_analysis("fintech", "Us", "us.com", "Them")
        .await
        .is_empty());
}

// ---- contact resolution ----

#[tokio::test]
async fn test_hunter_email_finder_success() {
    let mock_server = MockServer::start().await;

    let payload = serde_json::json!({
        "data": {
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@engines.com",
            "position": "Countess",
            "linkedin_url": "https://linkedin.com/in/ada",
            "score": 95,
            "verification": { "status": "valid" }
        }
    });
    Mock::given(method("GET"))
        .and(path("/v2/email-finder"))
        .and(query_param("domain", "engines.com"))
        .and(query_param("first_name", "Ada"))
        .and(query_param("api_key", "test_hunter_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&payload))
        .mount(&mock_server)
        .await;

    let hunter = HunterClient::new(mock_server.uri(), "test_hunter_key".to_string()).unwrap();
    let contact = hunter
        .find_email("engines.com", "Ada", "Lovelace")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(contact.email, "ada@engines.com");
    assert_eq!(contact.position.as_deref(), Some("Countess"));
    assert_eq!(contact.score, Some(95.0));
}

#[tokio::test]
async fn test_hunter_non_ok_drops_candidate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/email-finder"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&mock_server)
        .await;

    let hunter = HunterClient::new(mock_server.uri(), "test_key".to_string()).unwrap();
    let result = hunter.find_email("x.com", "A", "B").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_hunter_payload_without_email_drops_candidate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/email-finder"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "data": { "first_name": "A" } })),
        )
        .mount(&mock_server)
        .await;

    let hunter = HunterClient::new(mock_server.uri(), "test_key".to_string()).unwrap();
    let result = hunter.find_email("x.com", "A", "B").await.unwrap();
    assert!(result.is_none());
}

// ---- discovery pipeline ----

#[tokio::test]
async fn test_combined_discovery_resolves_and_tags_provenance() {
    let openai_server = MockServer::start().await;
    let hunter_server = MockServer::start().await;

    let leads = r#"[{"first_name":"Ada","last_name":"Lovelace","company":"Engines","domain":"engines.com"},{"first_name":"Grace","last_name":"Hopper","company":"Navy Labs"}]"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(leads)))
        .mount(&openai_server)
        .await;

    // Ada resolves; Grace (derived domain navylabs.com) has no verified email
    Mock::given(method("GET"))
        .and(path("/v2/email-finder"))
        .and(query_param("domain", "engines.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "email": "ada@engines.com", "first_name": "Ada", "last_name": "Lovelace", "score": 90 }
        })))
        .mount(&hunter_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/email-finder"))
        .and(query_param("domain", "navylabs.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": {} })))
        .mount(&hunter_server)
        .await;

    let openai = OpenAiClient::new(openai_server.uri(), "k".to_string()).unwrap();
    let hunter = HunterClient::new(hunter_server.uri(), "k".to_string()).unwrap();
    let discovery = TargetDiscovery::new(Some(EmailGenerator::new(openai)), Some(hunter));

    let targets = discovery
        .find_targets("automation tools", Some("founders"), "unrecognized")
        .await;

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name, "Ada Lovelace");
    assert_eq!(targets[0].email.as_deref(), Some("ada@engines.com"));
    let provenance = targets[0].personalization_data.as_ref().unwrap();
    assert_eq!(provenance["source"], "hunter");
    assert_eq!(provenance["score"], 90.0);
}

#[tokio::test]
async fn test_discovery_falls_back_when_resolver_unavailable() {
    // No clients configured at all: static list, tagged as fallback
    let discovery = TargetDiscovery::new(None, None);
    let targets = discovery
        .find_targets("a SaaS platform", Some("founders"), "small")
        .await;

    assert_eq!(targets.len(), 8);
    for target in &targets {
        let provenance = target.personalization_data.as_ref().unwrap();
        assert_eq!(provenance["source"], "fallback");
        assert_eq!(provenance["companyType"], "SaaS");
        assert!(target.email.is_some());
    }
}

#[tokio::test]
async fn test_discovery_falls_back_when_lead_generation_errors() {
    let openai_server = MockServer::start().await;
    let hunter_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&openai_server)
        .await;

    let openai = OpenAiClient::new(openai_server.uri(), "bad".to_string()).unwrap();
    let hunter = HunterClient::new(hunter_server.uri(), "k".to_string()).unwrap();
    let discovery = TargetDiscovery::new(Some(EmailGenerator::new(openai)), Some(hunter));

    let targets = discovery.find_targets("cheese shop", None, "other").await;

    // Auth errors are swallowed and the fallback list is used, capped at
    // the unrecognized bucket's max of 5
    assert_eq!(targets.len(), 5);
    assert_eq!(
        targets[0].personalization_data.as_ref().unwrap()["source"],
        "fallback"
    );
}

// ---- campaign pipeline (settle-all semantics) ----

#[tokio::test]
async fn test_generate_campaign_keeps_partial_successes() {
    let mock_server = MockServer::start().await;

    // Three of the eight fallback targets fail generation
    for name in ["Sarah Johnson", "Mike Chen", "Emily Davis"] {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains(name))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .with_priority(1)
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(TEMPLATE_RESPONSE)))
        .mount(&mock_server)
        .await;

    let state = state_with_openai(&mock_server);
    let response = handlers::generate_campaign(State(state.clone()), Json(campaign_request("small")))
        .await
        .unwrap();

    let body = response.0;
    assert_eq!(body["success"], true);
    assert_eq!(body["campaign"]["status"], "completed");
    assert_eq!(body["campaign"]["targets"].as_array().unwrap().len(), 8);
    // 5 surviving targets x 3 templates each
    let templates = body["campaign"]["templates"].as_array().unwrap();
    assert_eq!(templates.len(), 15);
    for template in templates {
        assert!(template["targetId"].is_string());
    }
}

#[tokio::test]
async fn test_generate_campaign_generic_fallback_when_all_targets_fail() {
    let mock_server = MockServer::start().await;

    // Personalized generations fail, the generic one succeeds
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Personalize the emails for this recipient"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(TEMPLATE_RESPONSE)))
        .mount(&mock_server)
        .await;

    let state = state_with_openai(&mock_server);
    let response = handlers::generate_campaign(State(state.clone()), Json(campaign_request("small")))
        .await
        .unwrap();

    let body = response.0;
    assert_eq!(body["campaign"]["status"], "completed");
    // Exactly one generic triple, not bound to any target
    let templates = body["campaign"]["templates"].as_array().unwrap();
    assert_eq!(templates.len(), 3);
    for template in templates {
        assert!(template.get("targetId").is_none() || template["targetId"].is_null());
    }
}

#[tokio::test]
async fn test_generate_campaign_fails_with_retry_message_when_service_down() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&mock_server)
        .await;

    let state = state_with_openai(&mock_server);
    let result =
        handlers::generate_campaign(State(state.clone()), Json(campaign_request("small"))).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_generate_campaign_rejects_invalid_bucket() {
    let mock_server = MockServer::start().await;
    let state = state_with_openai(&mock_server);

    let result =
        handlers::generate_campaign(State(state), Json(campaign_request("gigantic"))).await;
    assert!(result.is_err());
}

// ---- campaign CRUD, single-shot generation, export ----

#[tokio::test]
async fn test_campaign_create_get_update_roundtrip() {
    let mock_server = MockServer::start().await;
    let state = state_with_openai(&mock_server);

    let created = handlers::create_campaign(State(state.clone()), Json(campaign_request("medium")))
        .await
        .unwrap()
        .0;
    assert_eq!(created["success"], true);
    assert_eq!(created["campaign"]["status"], "created");
    let id: Uuid = serde_json::from_value(created["campaign"]["id"].clone()).unwrap();

    let updated = handlers::update_campaign(
        State(state.clone()),
        Path(id),
        Json(CampaignUpdate {
            target_audience: Some("CTOs".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(updated["campaign"]["targetAudience"], "CTOs");

    let fetched = handlers::get_campaign(State(state.clone()), Path(id))
        .await
        .unwrap()
        .0;
    assert_eq!(fetched["campaign"]["targetAudience"], "CTOs");
    assert_eq!(fetched["campaign"]["templates"].as_array().unwrap().len(), 0);

    let missing = handlers::get_campaign(State(state), Path(Uuid::new_v4())).await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn test_generate_emails_reverts_campaign_on_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&mock_server)
        .await;

    let state = state_with_openai(&mock_server);
    let created = handlers::create_campaign(State(state.clone()), Json(campaign_request("small")))
        .await
        .unwrap()
        .0;
    let id: Uuid = serde_json::from_value(created["campaign"]["id"].clone()).unwrap();

    let result = handlers::generate_emails(
        State(state.clone()),
        Json(GenerateEmailsRequest {
            campaign_id: id,
            target_info: None,
            user_full_name: None,
            user_position: None,
        }),
    )
    .await;
    assert!(result.is_err());

    // Status rolled back to created, not stuck in generating
    let fetched = handlers::get_campaign(State(state), Path(id)).await.unwrap().0;
    assert_eq!(fetched["campaign"]["status"], "created");
}

#[tokio::test]
async fn test_generate_emails_and_export_csv() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "SUBJECT: Offer for Acme, Inc\nINITIAL: Hello\nFOLLOWUP1: One\nFOLLOWUP2: Two",
        )))
        .mount(&mock_server)
        .await;

    let state = state_with_openai(&mock_server);

    let created = handlers::create_campaign(State(state.clone()), Json(campaign_request("small")))
        .await
        .unwrap()
        .0;
    let id: Uuid = serde_json::from_value(created["campaign"]["id"].clone()).unwrap();

    // Export before anything is generated: 404
    let empty_export = handlers::export_csv(
        State(state.clone()),
        Json(CampaignIdRequest { campaign_id: id }),
    )
    .await;
    assert!(empty_export.is_err());

    // Discover targets, then generate the template set
    handlers::find_targets(
        State(state.clone()),
        Json(CampaignIdRequest { campaign_id: id }),
    )
    .await
    .unwrap();

    let generated = handlers::generate_emails(
        State(state.clone()),
        Json(GenerateEmailsRequest {
            campaign_id: id,
            target_info: None,
            user_full_name: None,
            user_position: None,
        }),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(generated["success"], true);
    assert_eq!(generated["templates"].as_array().unwrap().len(), 3);

    let fetched = handlers::get_campaign(State(state.clone()), Path(id))
        .await
        .unwrap()
        .0;
    assert_eq!(fetched["campaign"]["status"], "completed");

    let response = handlers::export_csv(
        State(state.clone()),
        Json(CampaignIdRequest { campaign_id: id }),
    )
    .await
    .unwrap();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Name,Email,Company,Title,LinkedIn,Subject,Email Body,Follow-up 1,Follow-up 2"
    );
    // The subject contains a comma, so it must be quoted
    assert!(csv.contains("\"Offer for Acme, Inc\""));
}

// ---- competitor endpoints ----

#[tokio::test]
async fn test_competitor_analysis_flow() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "Competitor Name: Alpha\nStrengths: speed\n\nCompetitor Name: Beta\nStrengths: price",
        )))
        .mount(&mock_server)
        .await;

    let state = state_with_openai(&mock_server);
    let body = handlers::analyze_competitors(
        State(state),
        Json(AnalyzeCompetitorsRequest {
            business_industry: "fintech".to_string(),
            company_name: Some("Us Inc".to_string()),
            company_website: Some("us.example".to_string()),
            competitors: Some("Gamma".to_string()),
        }),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(body["success"], true);
    assert_eq!(body["analyses"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_competitor_endpoints_validate_input() {
    let mock_server = MockServer::start().await;
    let state = state_with_openai(&mock_server);

    let missing_industry = handlers::analyze_competitors(
        State(state.clone()),
        Json(AnalyzeCompetitorsRequest {
            business_industry: "  ".to_string(),
            company_name: None,
            company_website: None,
            competitors: None,
        }),
    )
    .await;
    assert!(missing_industry.is_err());

    let missing_analyses = handlers::extract_metrics(
        State(state),
        Json(ExtractMetricsRequest { analyses: None }),
    )
    .await;
    assert!(missing_analyses.is_err());
}
