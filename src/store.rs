use crate::models::{
    Campaign, CampaignStatus, CampaignUpdate, CreateCampaignRequest, EmailTemplate, NewTarget,
    NewTemplate, Target, TargetStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Storage capability set for campaigns, templates and targets. Handlers
/// depend only on this trait so the in-memory backing can be swapped for a
/// real persistence layer without changing call sites.
#[async_trait]
pub trait OutreachStore: Send + Sync {
    async fn create_campaign(&self, request: CreateCampaignRequest) -> Campaign;
    async fn get_campaign(&self, id: Uuid) -> Option<Campaign>;
    async fn update_campaign(&self, id: Uuid, update: CampaignUpdate) -> Option<Campaign>;

    /// Replaces the campaign's template set.
    async fn save_templates(&self, campaign_id: Uuid, templates: Vec<NewTemplate>)
        -> Vec<EmailTemplate>;
    async fn get_templates(&self, campaign_id: Uuid) -> Vec<EmailTemplate>;

    /// Replaces the campaign's target set. Targets are stored as `found`.
    async fn save_targets(&self, campaign_id: Uuid, targets: Vec<NewTarget>) -> Vec<Target>;
    async fn get_targets(&self, campaign_id: Uuid) -> Vec<Target>;
}

/// Demo-grade in-memory store: keyed maps guarded by `RwLock`, no
/// persistence and no invariants beyond generated-id uniqueness.
#[derive(Default)]
pub struct InMemoryStore {
    campaigns: RwLock<HashMap<Uuid, Campaign>>,
    templates: RwLock<HashMap<Uuid, Vec<EmailTemplate>>>,
    targets: RwLock<HashMap<Uuid, Vec<Target>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutreachStore for InMemoryStore {
    async fn create_campaign(&self, request: CreateCampaignRequest) -> Campaign {
        let campaign = Campaign {
            id: Uuid::new_v4(),
            business_name: request.business_name,
            business_description: request.business_description,
            target_audience: request.target_audience,
            email_count: request.email_count,
            user_full_name: request.user_full_name,
            user_position: request.user_position,
            status: CampaignStatus::Created,
            created_at: Utc::now(),
        };

        self.campaigns
            .write()
            .await
            .insert(campaign.id, campaign.clone());
        campaign
    }

    async fn get_campaign(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.read().await.get(&id).cloned()
    }

    async fn update_campaign(&self, id: Uuid, update: CampaignUpdate) -> Option<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns.get_mut(&id)?;

        if let Some(status) = update.status {
            campaign.status = status;
        }
        if let Some(audience) = update.target_audience {
            campaign.target_audience = Some(audience);
        }
        if let Some(name) = update.user_full_name {
            campaign.user_full_name = Some(name);
        }
        if let Some(position) = update.user_position {
            campaign.user_position = Some(position);
        }

        Some(campaign.clone())
    }

    async fn save_templates(
        &self,
        campaign_id: Uuid,
        templates: Vec<NewTemplate>,
    ) -> Vec<EmailTemplate> {
        let saved: Vec<EmailTemplate> = templates
            .into_iter()
            .map(|t| EmailTemplate {
                id: Uuid::new_v4(),
                campaign_id,
                template_type: t.template_type,
                subject: t.subject,
                body: t.body,
                target_id: t.target_id,
                created_at: Utc::now(),
            })
            .collect();

        self.templates
            .write()
            .await
            .insert(campaign_id, saved.clone());
        saved
    }

    async fn get_templates(&self, campaign_id: Uuid) -> Vec<EmailTemplate> {
        self.templates
            .read()
            .await
            .get(&campaign_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn save_targets(&self, campaign_id: Uuid, targets: Vec<NewTarget>) -> Vec<Target> {
        let saved: Vec<Target> = targets
            .into_iter()
            .map(|t| Target {
                id: Uuid::new_v4(),
                campaign_id,
                name: t.name,
                email: t.email,
                company: t.company,
                title: t.title,
                linkedin_url: t.linkedin_url,
                personalization_data: t.personalization_data,
                status: TargetStatus::Found,
                created_at: Utc::now(),
            })
            .collect();

        self.targets.write().await.insert(campaign_id, saved.clone());
        saved
    }

    async fn get_targets(&self, campaign_id: Uuid) -> Vec<Target> {
        self.targets
            .read()
            .await
            .get(&campaign_id)
            .cloned()
            .unwrap_or_default()
    }
}
