use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============ Stored Entities ============

/// Lifecycle of a campaign. There is no failed state: a generation failure
/// reverts the campaign to `Created` so the caller can retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Created,
    Generating,
    Completed,
}

/// A cold-outreach campaign: the business being pitched plus optional sender
/// identity used for email signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub business_name: String,
    pub business_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    /// Requested lead volume bucket: small, medium, large or enterprise.
    pub email_count: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_position: Option<String>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Initial,
    Followup1,
    Followup2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub template_type: TemplateType,
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    Found,
    Validated,
    Invalid,
}

/// A prospect with a verified or fallback email and provenance metadata
/// describing where the contact came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    /// Free-form provenance: source tag, raw payload, confidence score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization_data: Option<Value>,
    pub status: TargetStatus,
    pub created_at: DateTime<Utc>,
}

// ============ Transient Pipeline Types ============

/// An unverified, generatively-produced contact guess. Produced by lead
/// generation, consumed by email resolution, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateLead {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub domain: Option<String>,
    pub title: Option<String>,
}

/// One synthesized email set: subject plus the initial body and two
/// follow-ups.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEmail {
    pub subject: String,
    pub body: String,
    pub follow_up1: String,
    pub follow_up2: String,
}

/// A target not yet persisted (no id / campaign binding yet).
#[derive(Debug, Clone)]
pub struct NewTarget {
    pub name: String,
    pub email: Option<String>,
    pub company: String,
    pub title: Option<String>,
    pub linkedin_url: Option<String>,
    pub personalization_data: Option<Value>,
}

/// A template not yet persisted.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub template_type: TemplateType,
    pub subject: String,
    pub body: String,
    pub target_id: Option<Uuid>,
}

// ============ Competitor Metrics ============

/// A single numeric estimate with extraction confidence (0-100) and a
/// source tag. The extraction prompt requires a low-confidence guess in
/// place of omission, but tolerate null estimates from the model anyway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricEstimate {
    pub estimate: Option<f64>,
    pub confidence: Option<f64>,
    pub source: Option<String>,
}

/// Numeric business metrics extracted from a free-text competitor analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorMetric {
    pub name: String,
    pub price_range: Option<String>,
    pub stock_price: Option<MetricEstimate>,
    pub annual_revenue_usd: Option<MetricEstimate>,
    pub estimated_market_share_percent: Option<MetricEstimate>,
    pub number_of_customers: Option<MetricEstimate>,
    pub net_worth_usd: Option<MetricEstimate>,
    pub exposure_score: Option<MetricEstimate>,
    pub notes: Option<String>,
}

// ============ Request Payloads ============

pub const VALID_EMAIL_COUNTS: [&str; 4] = ["small", "medium", "large", "enterprise"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub business_description: String,
    pub target_audience: Option<String>,
    #[serde(default)]
    pub email_count: String,
    pub user_full_name: Option<String>,
    pub user_position: Option<String>,
}

/// Partial campaign update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate {
    pub status: Option<CampaignStatus>,
    pub target_audience: Option<String>,
    pub user_full_name: Option<String>,
    pub user_position: Option<String>,
}

/// Explicit target info for single-shot template generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub name: String,
    pub company: String,
    pub title: Option<String>,
    pub target_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateEmailsRequest {
    pub campaign_id: Uuid,
    pub target_info: Option<TargetInfo>,
    pub user_full_name: Option<String>,
    pub user_position: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignIdRequest {
    pub campaign_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeCompetitorsRequest {
    #[serde(default)]
    pub business_industry: String,
    pub company_name: Option<String>,
    pub company_website: Option<String>,
    pub competitors: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractMetricsRequest {
    pub analyses: Option<Vec<String>>,
}

// ============ Response Views ============

/// Campaign enriched with its saved templates and targets, as returned by
/// the read and generate endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignView {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub templates: Vec<EmailTemplate>,
    pub targets: Vec<Target>,
}
