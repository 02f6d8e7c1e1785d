use crate::generator::EmailGenerator;
use crate::hunter::{HunterClient, ResolvedContact};
use crate::models::{CandidateLead, NewTarget};
use rand::seq::SliceRandom;
use serde_json::json;
use std::time::Duration;

/// Fixed pacing between email-finder calls. The resolver runs sequentially
/// to stay under the discovery service's rate limits.
pub const INTER_REQUEST_DELAY: Duration = Duration::from_millis(250);

/// Maps an email-count bucket to the [min, max] lead range requested from
/// the generative service. Unrecognized buckets get a conservative range.
pub fn lead_range(bucket: &str) -> (usize, usize) {
    match bucket {
        "small" => (5, 10),
        "medium" => (10, 20),
        "large" => (20, 50),
        "enterprise" => (50, 100),
        _ => (3, 5),
    }
}

/// Demo fallback prospects used whenever the combined generative + resolver
/// path is unavailable or comes back empty.
const FALLBACK_TARGETS: [(&str, &str, &str, &str, &str); 8] = [
    (
        "Sarah Johnson",
        "sarah.johnson@techcorp.com",
        "TechCorp Solutions",
        "Customer Service Manager",
        "https://linkedin.com/in/sarah-johnson-csm",
    ),
    (
        "Mike Chen",
        "mike.chen@retailplus.com",
        "RetailPlus Inc",
        "Operations Director",
        "https://linkedin.com/in/mike-chen-ops",
    ),
    (
        "Emily Davis",
        "emily@davisconsulting.com",
        "Davis Consulting",
        "Founder & CEO",
        "https://linkedin.com/in/emily-davis-ceo",
    ),
    (
        "David Rodriguez",
        "david.rodriguez@startupx.com",
        "StartupX",
        "Head of Marketing",
        "https://linkedin.com/in/david-rodriguez-marketing",
    ),
    (
        "Lisa Wang",
        "lisa.wang@innovateco.com",
        "InnovateCo",
        "Business Development Manager",
        "https://linkedin.com/in/lisa-wang-bd",
    ),
    (
        "James Thompson",
        "james.thompson@growthlabs.com",
        "GrowthLabs",
        "VP of Sales",
        "https://linkedin.com/in/james-thompson-sales",
    ),
    (
        "Maria Garcia",
        "maria.garcia@scalestart.com",
        "ScaleStart",
        "Customer Success Director",
        "https://linkedin.com/in/maria-garcia-cs",
    ),
    (
        "Alex Kim",
        "alex.kim@nextgen.com",
        "NextGen Technologies",
        "Product Manager",
        "https://linkedin.com/in/alex-kim-pm",
    ),
];

/// Target discovery: generate candidate leads, resolve emails for each,
/// and fall back to the static prospect list when the combined path is
/// unavailable or yields nothing. The fallback has no failure mode.
pub struct TargetDiscovery {
    generator: Option<EmailGenerator>,
    hunter: Option<HunterClient>,
}

impl TargetDiscovery {
    pub fn new(generator: Option<EmailGenerator>, hunter: Option<HunterClient>) -> Self {
        Self { generator, hunter }
    }

    /// Finds prospects for a campaign. Errors in the combined path are
    /// swallowed and treated as "no results"; this function always returns.
    pub async fn find_targets(
        &self,
        business_description: &str,
        target_audience: Option<&str>,
        email_count: &str,
    ) -> Vec<NewTarget> {
        let (min, max) = lead_range(email_count);

        if let (Some(generator), Some(hunter)) = (&self.generator, &self.hunter) {
            let resolved = self
                .combined_search(generator, hunter, business_description, target_audience, min, max)
                .await;
            if !resolved.is_empty() {
                return resolved;
            }
            tracing::warn!("Combined discovery produced no results, using fallback targets");
        }

        self.fallback_targets(business_description, target_audience, max)
    }

    /// Generative + resolver path: candidate leads from the model, then a
    /// sequential email-finder pass with fixed pacing. Candidates without
    /// both names, and candidates the resolver can't verify, are dropped.
    async fn combined_search(
        &self,
        generator: &EmailGenerator,
        hunter: &HunterClient,
        business_description: &str,
        target_audience: Option<&str>,
        min: usize,
        max: usize,
    ) -> Vec<NewTarget> {
        let leads = generator
            .generate_leads(business_description, target_audience, min, max)
            .await;
        if leads.is_empty() {
            tracing::warn!("Lead generation returned no candidates");
            return Vec::new();
        }

        let mut results = Vec::new();
        for lead in leads.into_iter().take(max) {
            let first = lead.first_name.trim().to_string();
            let last = lead.last_name.trim().to_string();
            if first.is_empty() || last.is_empty() {
                continue;
            }

            let domain = derive_domain(&lead);
            match hunter.find_email(&domain, &first, &last).await {
                Ok(Some(contact)) => results.push(target_from_contact(contact, &lead)),
                Ok(None) => {
                    tracing::debug!("No verified email for {} {} @ {}", first, last, domain);
                }
                Err(e) => {
                    tracing::warn!("Hunter lookup failed for {} {}: {}", first, last, e);
                }
            }

            tokio::time::sleep(INTER_REQUEST_DELAY).await;
        }

        results
    }

    fn fallback_targets(
        &self,
        business_description: &str,
        target_audience: Option<&str>,
        max: usize,
    ) -> Vec<NewTarget> {
        let company_types = extract_company_types(business_description);

        let mut targets: Vec<NewTarget> = FALLBACK_TARGETS
            .iter()
            .map(|(name, email, company, title, linkedin)| NewTarget {
                name: name.to_string(),
                email: Some(email.to_string()),
                company: company.to_string(),
                title: Some(title.to_string()),
                linkedin_url: Some(linkedin.to_string()),
                personalization_data: Some(json!({
                    "source": "fallback",
                    "companyType": company_types[0],
                    "targetAudience": target_audience.unwrap_or("General"),
                    "industry": industry_for(company),
                })),
            })
            .take(max)
            .collect();

        targets.shuffle(&mut rand::thread_rng());
        targets
    }
}

fn target_from_contact(contact: ResolvedContact, lead: &CandidateLead) -> NewTarget {
    let first = contact
        .first_name
        .clone()
        .unwrap_or_else(|| lead.first_name.clone());
    let last = contact
        .last_name
        .clone()
        .unwrap_or_else(|| lead.last_name.clone());

    NewTarget {
        name: format!("{} {}", first, last).trim().to_string(),
        email: Some(contact.email.clone()),
        company: contact
            .company
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| lead.company.clone()),
        title: contact.position.clone().or_else(|| lead.title.clone()),
        linkedin_url: contact.linkedin_url.clone(),
        personalization_data: Some(json!({
            "source": "hunter",
            "score": contact.score,
            "verification": contact.verification,
            "raw": contact.raw,
        })),
    }
}

/// Prefers the lead's own domain; otherwise derives one from the company
/// name (lowercased, alphanumerics only, `.com`).
fn derive_domain(lead: &CandidateLead) -> String {
    if let Some(ref domain) = lead.domain {
        if !domain.is_empty() {
            return domain.clone();
        }
    }
    if lead.company.is_empty() {
        return String::new();
    }
    let slug: String = lead
        .company
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    format!("{}.com", slug)
}

/// Keyword sniff over the business description, used to tag fallback
/// targets with a plausible company type.
fn extract_company_types(description: &str) -> Vec<&'static str> {
    let keywords = description.to_lowercase();
    let mut types = Vec::new();

    if keywords.contains("saas") || keywords.contains("software") {
        types.extend(["SaaS", "Software", "Technology"]);
    }
    if keywords.contains("ecommerce") || keywords.contains("retail") {
        types.extend(["E-commerce", "Retail"]);
    }
    if keywords.contains("consulting") || keywords.contains("service") {
        types.extend(["Consulting", "Services"]);
    }
    if keywords.contains("startup") || keywords.contains("small business") {
        types.extend(["Startup", "Small Business"]);
    }

    if types.is_empty() {
        types.extend(["Business", "Company"]);
    }
    types
}

fn industry_for(company: &str) -> &'static str {
    let company = company.to_lowercase();
    if company.contains("tech") || company.contains("software") {
        "Technology"
    } else if company.contains("retail") || company.contains("commerce") {
        "Retail"
    } else if company.contains("consulting") || company.contains("services") {
        "Consulting"
    } else if company.contains("startup") || company.contains("growth") {
        "Startup"
    } else {
        "Business"
    }
}
