use crate::config::Config;
use crate::discovery::TargetDiscovery;
use crate::errors::{AppError, ResultExt};
use crate::export;
use crate::generator::{EmailGenerationRequest, EmailGenerator, TargetDetails};
use crate::hunter::HunterClient;
use crate::models::*;
use crate::openai::OpenAiClient;
use crate::store::OutreachStore;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Campaign/template/target storage behind the store seam.
    pub store: Arc<dyn OutreachStore>,
    /// Application configuration.
    pub config: Config,
    /// Generative text service client (absent without OPENAI_API_KEY).
    pub openai_client: Option<OpenAiClient>,
    /// Email-discovery service client (absent without HUNTER_API_KEY).
    pub hunter_client: Option<HunterClient>,
}

impl AppState {
    fn generator(&self) -> Option<EmailGenerator> {
        self.openai_client.clone().map(EmailGenerator::new)
    }

    fn discovery(&self) -> TargetDiscovery {
        TargetDiscovery::new(self.generator(), self.hunter_client.clone())
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-outreach-api",
            "version": "0.1.0"
        })),
    )
}

fn validate_campaign_input(request: &CreateCampaignRequest) -> Result<(), AppError> {
    if request.business_name.trim().is_empty() || request.business_description.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Business name and description are required".to_string(),
        ));
    }
    if !VALID_EMAIL_COUNTS.contains(&request.email_count.as_str()) {
        return Err(AppError::BadRequest(
            "Valid email count range is required".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/v1/campaigns
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /campaigns - business: {}", request.business_name);
    validate_campaign_input(&request)?;

    let campaign = state.store.create_campaign(request).await;

    Ok(Json(json!({
        "success": true,
        "campaign": campaign,
        "message": "Campaign created successfully"
    })))
}

/// GET /api/v1/campaigns/:id
///
/// Returns the campaign together with its saved templates and targets.
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("GET /campaigns/{}", id);

    let campaign = state
        .store
        .get_campaign(id)
        .await
        .ok_or_else(|| AppError::NotFound("Campaign not found".to_string()))?;

    let view = CampaignView {
        campaign,
        templates: state.store.get_templates(id).await,
        targets: state.store.get_targets(id).await,
    };

    Ok(Json(json!({
        "success": true,
        "campaign": view
    })))
}

/// PUT /api/v1/campaigns/:id
pub async fn update_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<CampaignUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("PUT /campaigns/{}", id);

    let campaign = state
        .store
        .update_campaign(id, update)
        .await
        .ok_or_else(|| AppError::NotFound("Campaign not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "campaign": campaign
    })))
}

/// POST /api/v1/campaigns/generate
///
/// The full pipeline: create campaign, discover targets, generate a
/// personalized template set per target, fall back to a single generic set
/// when every target fails. Any unrecoverable failure reverts the campaign
/// to `created` so the caller can retry.
pub async fn generate_campaign(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!(
        "POST /campaigns/generate - business: {}",
        request.business_name
    );
    validate_campaign_input(&request)?;

    let campaign = state.store.create_campaign(request).await;
    set_status(&state, campaign.id, CampaignStatus::Generating).await;

    match run_generation(&state, &campaign).await {
        Ok((targets, templates)) => {
            let completed = set_status(&state, campaign.id, CampaignStatus::Completed)
                .await
                .unwrap_or(campaign);

            let message = format!(
                "Generated personalized emails for {} targets (templates saved: {})",
                targets.len(),
                templates.len()
            );
            let view = CampaignView {
                campaign: completed,
                templates,
                targets,
            };

            Ok(Json(json!({
                "success": true,
                "campaign": view,
                "message": message
            })))
        }
        Err(e) => {
            tracing::error!("Generation error for campaign {}: {}", campaign.id, e);
            set_status(&state, campaign.id, CampaignStatus::Created).await;
            Err(AppError::InternalError(
                "Failed to generate campaign. Please try again.".to_string(),
            ))
        }
    }
}

/// Status transitions never fail the request; a vanished campaign is simply
/// left as-is.
async fn set_status(
    state: &Arc<AppState>,
    id: Uuid,
    status: CampaignStatus,
) -> Option<Campaign> {
    state
        .store
        .update_campaign(
            id,
            CampaignUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
}

/// Discovery + fan-out template generation for one campaign.
async fn run_generation(
    state: &Arc<AppState>,
    campaign: &Campaign,
) -> Result<(Vec<Target>, Vec<EmailTemplate>), AppError> {
    let new_targets = state
        .discovery()
        .find_targets(
            &campaign.business_description,
            campaign.target_audience.as_deref(),
            &campaign.email_count,
        )
        .await;
    let saved_targets = state.store.save_targets(campaign.id, new_targets).await;
    tracing::info!(
        "Discovered {} targets for campaign {}",
        saved_targets.len(),
        campaign.id
    );

    let generator = state.generator().ok_or_else(|| {
        AppError::InternalError("Generative service is not configured".to_string())
    })?;

    // Fan out one generation task per target; settle all, keep successes.
    let mut handles = Vec::with_capacity(saved_targets.len());
    for target in &saved_targets {
        let generator = generator.clone();
        let request = EmailGenerationRequest {
            business_name: campaign.business_name.clone(),
            business_description: campaign.business_description.clone(),
            target_audience: campaign.target_audience.clone(),
            target: Some(TargetDetails {
                name: target.name.clone(),
                company: target.company.clone(),
                title: target.title.clone(),
            }),
            sender_name: campaign.user_full_name.clone(),
            sender_position: campaign.user_position.clone(),
        };
        let target_id = target.id;

        handles.push(tokio::spawn(async move {
            match generator.generate_template(&request).await {
                Ok(email) => Some(templates_for_email(email, Some(target_id))),
                Err(e) => {
                    tracing::error!("Failed to generate templates for target {}: {}", target_id, e);
                    None
                }
            }
        }));
    }

    let mut to_save: Vec<NewTemplate> = Vec::new();
    for handle in handles {
        // A panicked task counts as a failed generation, nothing more
        if let Ok(Some(templates)) = handle.await {
            to_save.extend(templates);
        }
    }

    // If nothing was generated at all, fall back to one generic set
    if to_save.is_empty() {
        tracing::warn!(
            "No personalized templates generated for campaign {}, generating generic set",
            campaign.id
        );
        let generic = generator
            .generate_template(&EmailGenerationRequest {
                business_name: campaign.business_name.clone(),
                business_description: campaign.business_description.clone(),
                target_audience: campaign.target_audience.clone(),
                target: None,
                sender_name: campaign.user_full_name.clone(),
                sender_position: campaign.user_position.clone(),
            })
            .await
            .context("generic template fallback")?;
        to_save = templates_for_email(generic, None);
    }

    let saved_templates = state.store.save_templates(campaign.id, to_save).await;
    Ok((saved_targets, saved_templates))
}

/// Expands one generated email set into the stored triple: initial plus the
/// two follow-ups with derived subjects.
fn templates_for_email(email: GeneratedEmail, target_id: Option<Uuid>) -> Vec<NewTemplate> {
    vec![
        NewTemplate {
            template_type: TemplateType::Initial,
            subject: email.subject.clone(),
            body: email.body,
            target_id,
        },
        NewTemplate {
            template_type: TemplateType::Followup1,
            subject: format!("Re: {}", email.subject),
            body: email.follow_up1,
            target_id,
        },
        NewTemplate {
            template_type: TemplateType::Followup2,
            subject: format!("Final follow-up: {}", email.subject),
            body: email.follow_up2,
            target_id,
        },
    ]
}

/// POST /api/v1/emails/generate
///
/// Single-shot template synthesis for an existing campaign, optionally
/// personalized with explicit target info.
pub async fn generate_emails(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateEmailsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /emails/generate - campaign: {}", request.campaign_id);

    let campaign = state
        .store
        .get_campaign(request.campaign_id)
        .await
        .ok_or_else(|| AppError::NotFound("Campaign not found".to_string()))?;

    set_status(&state, campaign.id, CampaignStatus::Generating).await;

    let target_id = request.target_info.as_ref().and_then(|t| t.target_id);
    let generation_request = EmailGenerationRequest {
        business_name: campaign.business_name.clone(),
        business_description: campaign.business_description.clone(),
        target_audience: campaign.target_audience.clone(),
        target: request.target_info.map(|t| TargetDetails {
            name: t.name,
            company: t.company,
            title: t.title,
        }),
        // Prefer sender info from the request, fall back to stored values
        sender_name: request.user_full_name.or_else(|| campaign.user_full_name.clone()),
        sender_position: request.user_position.or_else(|| campaign.user_position.clone()),
    };

    let generated = match state.generator() {
        Some(generator) => generator.generate_template(&generation_request).await,
        None => Err(AppError::InternalError(
            "Generative service is not configured".to_string(),
        )),
    };

    match generated {
        Ok(email) => {
            let templates = state
                .store
                .save_templates(campaign.id, templates_for_email(email, target_id))
                .await;
            set_status(&state, campaign.id, CampaignStatus::Completed).await;

            Ok(Json(json!({
                "success": true,
                "templates": templates,
                "message": "Email templates generated successfully"
            })))
        }
        Err(e) => {
            tracing::error!("AI generation error for campaign {}: {}", campaign.id, e);
            set_status(&state, campaign.id, CampaignStatus::Created).await;
            Err(AppError::InternalError(
                "Failed to generate email templates. Please try again.".to_string(),
            ))
        }
    }
}

/// POST /api/v1/targets/find
pub async fn find_targets(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CampaignIdRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!(
        "POST /targets/find - campaign: {}, combined discovery: {}",
        request.campaign_id,
        state.config.combined_discovery_enabled()
    );

    let campaign = state
        .store
        .get_campaign(request.campaign_id)
        .await
        .ok_or_else(|| AppError::NotFound("Campaign not found".to_string()))?;

    let targets = state
        .discovery()
        .find_targets(
            &campaign.business_description,
            campaign.target_audience.as_deref(),
            &campaign.email_count,
        )
        .await;
    let saved = state.store.save_targets(campaign.id, targets).await;

    let sources: Vec<&str> = saved
        .iter()
        .filter_map(|t| {
            t.personalization_data
                .as_ref()
                .and_then(|d| d.get("source"))
                .and_then(|s| s.as_str())
        })
        .collect();
    tracing::debug!("Saved target sources: {:?}", sources);

    let message = format!("Found {} potential targets", saved.len());
    Ok(Json(json!({
        "success": true,
        "targets": saved,
        "message": message
    })))
}

/// POST /api/v1/export/csv
///
/// Streams the campaign as a CSV attachment.
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CampaignIdRequest>,
) -> Result<Response, AppError> {
    tracing::info!("POST /export/csv - campaign: {}", request.campaign_id);

    let campaign = state
        .store
        .get_campaign(request.campaign_id)
        .await
        .ok_or_else(|| AppError::NotFound("Campaign not found".to_string()))?;

    let templates = state.store.get_templates(campaign.id).await;
    let targets = state.store.get_targets(campaign.id).await;

    if templates.is_empty() || targets.is_empty() {
        return Err(AppError::NotFound(
            "No templates or targets found for this campaign".to_string(),
        ));
    }

    let csv = export::campaign_to_csv(&targets, &templates);
    let disposition = format!(
        "attachment; filename=\"cold-email-campaign-{}.csv\"",
        campaign.id
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// POST /api/v1/competitors/analyze
pub async fn analyze_competitors(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeCompetitorsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.business_industry.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Business industry is required".to_string(),
        ));
    }

    let analyses = match state.generator() {
        Some(generator) => {
            generator
                .find_competitor_analysis(
                    &request.business_industry,
                    request.company_name.as_deref().unwrap_or(""),
                    request.company_website.as_deref().unwrap_or(""),
                    request.competitors.as_deref().unwrap_or(""),
                )
                .await
        }
        None => {
            tracing::warn!("Competitor analysis requested without a generative service configured");
            Vec::new()
        }
    };

    Ok(Json(json!({
        "success": true,
        "analyses": analyses
    })))
}

/// POST /api/v1/competitors/metrics
pub async fn extract_metrics(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExtractMetricsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let analyses = request
        .analyses
        .ok_or_else(|| AppError::BadRequest("Analyses array is required".to_string()))?;

    let metrics = match state.generator() {
        Some(generator) => generator.extract_competitor_metrics(&analyses).await,
        None => {
            tracing::warn!("Metric extraction requested without a generative service configured");
            Vec::new()
        }
    };

    Ok(Json(json!({
        "success": true,
        "metrics": metrics
    })))
}
