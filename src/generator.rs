use crate::errors::AppError;
use crate::extract;
use crate::models::{CandidateLead, CompetitorMetric, GeneratedEmail};
use crate::openai::OpenAiClient;
use crate::sections;
use serde_json::Value;

const SYSTEM_EMAIL_WRITER: &str = "You are an expert cold email writer. Generate personalized, \
    professional cold emails that get responses. Focus on value proposition and clear \
    call-to-action. Make sure emails contain a brief description of what the business does and \
    their purpose, then how the business could help the target with their issues. Keep a formal \
    and professional tone but also make it personal and engaging. Use proper grammar and \
    spelling. Aim for 3-4 sentences with a very engaging and eye catching subject line.";

const SYSTEM_LEAD_RESEARCHER: &str = "You are a research assistant that returns machine-readable \
    JSON arrays of people and companies.";

const SYSTEM_MARKET_ANALYST: &str = "You are an expert market analyst. Provide concise and \
    relevant competitor information.";

const SYSTEM_JSON_EXTRACTOR: &str =
    "You are a JSON extraction assistant. Return only valid JSON arrays.";

const SYSTEM_JSON_EXTRACTOR_STRICT: &str =
    "You are a JSON extraction assistant. Return only a single valid JSON array and nothing else.";

/// The prospect a template is personalized for.
#[derive(Debug, Clone)]
pub struct TargetDetails {
    pub name: String,
    pub company: String,
    pub title: Option<String>,
}

/// Everything template synthesis needs: the business pitch, the optional
/// target, and the optional sender identity for the signature.
#[derive(Debug, Clone)]
pub struct EmailGenerationRequest {
    pub business_name: String,
    pub business_description: String,
    pub target_audience: Option<String>,
    pub target: Option<TargetDetails>,
    pub sender_name: Option<String>,
    pub sender_position: Option<String>,
}

/// All generative-service workflows: email drafting, lead guessing,
/// competitor analysis and metric extraction.
#[derive(Clone)]
pub struct EmailGenerator {
    openai: OpenAiClient,
}

impl EmailGenerator {
    pub fn new(openai: OpenAiClient) -> Self {
        Self { openai }
    }

    /// Generates one subject line plus three email bodies for a target (or
    /// a generic set when no target is given), appending the sender
    /// signature where the model didn't already include it.
    pub async fn generate_template(
        &self,
        request: &EmailGenerationRequest,
    ) -> Result<GeneratedEmail, AppError> {
        let prompt = build_email_prompt(request);

        let response = self
            .openai
            .chat_completion(SYSTEM_EMAIL_WRITER, &prompt, 1000, 0.7)
            .await?;

        let mut email = sections::parse_email_sections(&response);
        append_signature(
            &mut email,
            request.sender_name.as_deref(),
            request.sender_position.as_deref(),
        );

        Ok(email)
    }

    /// Asks the model for between `min` and `max` plausible contacts as a
    /// JSON array. Failure at any stage yields an empty list, never an
    /// error.
    pub async fn generate_leads(
        &self,
        business_description: &str,
        target_audience: Option<&str>,
        min: usize,
        max: usize,
    ) -> Vec<CandidateLead> {
        let prompt = format!(
            "Find between {min} and {max} people (first_name, last_name, company, domain, \
             title) who would be good targets for the following business description and put \
             it in a JSON Array. Include the company domain when known. Respond with only \
             valid JSON.\n\n\
             Business description: {business_description}\n\
             Target audience: {}\n\n\
             Example output:\n\
             [\n  \
             {{\"first_name\":\"Alexis\",\"last_name\":\"Ohanian\",\"company\":\"Reddit\",\
             \"domain\":\"reddit.com\",\"title\":\"Cofounder\"}},\n  ...\n]\n",
            target_audience.unwrap_or("General")
        );

        let items = self
            .extract_array_with_retry(SYSTEM_LEAD_RESEARCHER, &prompt, 800, 800, 0.2)
            .await;

        items
            .into_iter()
            .take(max)
            .filter_map(|v| lead_from_value(&v))
            .collect()
    }

    /// Two-step competitor analysis: discover two additional competitors,
    /// then produce one structured text analysis per competitor. Either
    /// step failing yields an empty list.
    pub async fn find_competitor_analysis(
        &self,
        business_industry: &str,
        company_name: &str,
        company_website: &str,
        known_competitors: &str,
    ) -> Vec<String> {
        let mut competitors = known_competitors.to_string();

        let discovery_prompt = format!(
            "I am currently working in the {business_industry} industry. \
             My company name is {company_name} and our website is {company_website}. \
             Here are some of our known competitors: {competitors}. \
             Could you please find 2 additional competitors in the same industry \
             that we should be aware of?"
        );

        match self
            .openai
            .chat_completion(SYSTEM_MARKET_ANALYST, &discovery_prompt, 500, 0.7)
            .await
        {
            Ok(response) => {
                for line in response.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    competitors.push(',');
                    competitors.push_str(line);
                }
            }
            Err(e) => {
                tracing::error!("Error finding competitors: {}", e);
                return Vec::new();
            }
        }

        let analysis_prompt = format!(
            "I am currently working in the {business_industry} industry.\n\
             My company name is {company_name} and our website is {company_website}.\n\
             Here are some of our known competitors: {competitors}.\n\
             Could you please provide a brief analysis of each competitor, focusing on their \
             strengths, weaknesses, market position, and any unique selling points they may \
             have? Also please state how the statistics of every competitor compares to our \
             company. MAKE SURE TO INCLUDE NUMBERS AND STATISTICS WHERE POSSIBLE AND COMPARE \
             TO OUR COMPANY.\n\
             Please format the analysis as follows:\n\
             Competitor Name:\n\
             Strengths:\n\
             Weaknesses:\n\
             Market Position:\n\
             Unique Selling Points:\n\
             Comparison to Our Company:\n\
             Improvement Areas for Our Company:\n\
             RESPOND WITH ONLY THE RAW ANALYSIS WITHOUT ANY INTRODUCTION OR CONCLUSION.\n"
        );

        match self
            .openai
            .chat_completion(SYSTEM_MARKET_ANALYST, &analysis_prompt, 1500, 0.7)
            .await
        {
            Ok(response) => response
                .split("\n\n")
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect(),
            Err(e) => {
                tracing::error!("Error generating competitor analysis: {}", e);
                Vec::new()
            }
        }
    }

    /// Extracts numeric business metrics from free-text competitor analyses
    /// as typed records. Objects that fail to deserialize are dropped.
    pub async fn extract_competitor_metrics(&self, analyses: &[String]) -> Vec<CompetitorMetric> {
        let prompt = build_metrics_prompt(analyses);

        let items = self
            .extract_array_with_retry(SYSTEM_JSON_EXTRACTOR, &prompt, 1000, 1500, 0.0)
            .await;

        items
            .into_iter()
            .filter_map(|v| serde_json::from_value::<CompetitorMetric>(v).ok())
            .collect()
    }

    /// Shared recovery orchestration: run the cheap parse strategies on the
    /// first response; if they fail, spend the single allowed retry request
    /// with stricter instructions, then fall through to delimiter balancing
    /// and object salvage over whichever text is available.
    async fn extract_array_with_retry(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
        retry_max_tokens: u32,
        temperature: f64,
    ) -> Vec<Value> {
        let first = match self
            .openai
            .chat_completion(system, prompt, max_tokens, temperature)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Completion request failed: {}", e);
                return Vec::new();
            }
        };
        let preview: String = first.chars().take(2000).collect();
        tracing::debug!("Raw completion (first 2000 chars): {}", preview);

        if let Some(items) =
            extract::parse_direct(&first).or_else(|| extract::parse_array_span(&first))
        {
            return items;
        }

        tracing::warn!("Initial parse failed, retrying extraction once to recover full JSON");
        let retry = match self
            .openai
            .chat_completion(SYSTEM_JSON_EXTRACTOR_STRICT, prompt, retry_max_tokens, temperature)
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!("Retry extraction failed: {}", e);
                None
            }
        };

        if let Some(ref retry_text) = retry {
            if let Some(items) =
                extract::parse_direct(retry_text).or_else(|| extract::parse_array_span(retry_text))
            {
                return items;
            }
        }

        let candidates: Vec<&String> = std::iter::once(&first).chain(retry.iter()).collect();

        for text in &candidates {
            if let Some(items) = extract::balance_and_parse(text) {
                tracing::debug!("Recovered JSON by balancing braces/brackets");
                return items;
            }
        }

        for text in &candidates {
            if let Some(items) = extract::salvage_objects(text) {
                tracing::debug!("Recovered by extracting individual objects, count={}", items.len());
                return items;
            }
        }

        tracing::error!("All JSON recovery strategies failed, returning empty result");
        Vec::new()
    }
}

fn build_email_prompt(request: &EmailGenerationRequest) -> String {
    let mut prompt = format!(
        "Write a cold outreach email campaign for the following business.\n\n\
         Business name: {}\n\
         Business description: {}\n\
         Target audience: {}\n",
        request.business_name,
        request.business_description,
        request.target_audience.as_deref().unwrap_or("General"),
    );

    if let Some(ref target) = request.target {
        prompt.push_str(&format!(
            "\nPersonalize the emails for this recipient:\n\
             Name: {}\n\
             Company: {}\n",
            target.name, target.company
        ));
        if let Some(ref title) = target.title {
            prompt.push_str(&format!("Title: {}\n", title));
        }
    }

    prompt.push_str(
        "\nWrite an initial cold email plus two follow-up emails.\n\
         Respond in exactly this format:\n\
         SUBJECT: <subject line>\n\
         INITIAL: <initial email body>\n\
         FOLLOWUP1: <first follow-up body>\n\
         FOLLOWUP2: <second follow-up body>\n",
    );

    prompt
}

fn build_metrics_prompt(analyses: &[String]) -> String {
    format!(
        "You are a careful data extraction assistant. Given the competitor analyses below, \
         produce a JSON array of objects, one per competitor, extracting numeric business \
         metrics where possible. For each competitor return the following fields:\n\n\
         - name: string (company name)\n\
         - price_range: string | null (e.g. \"$199-$999\")\n\
         - stock_price: {{ estimate: number | null, confidence: number (0-100), source: string | null }} | null\n\
         - annual_revenue_usd: {{ estimate: number | null, confidence: number (0-100), source: string | null }} | null\n\
         - estimated_market_share_percent: {{ estimate: number | null, confidence: number (0-100), source: string | null }} | null\n\
         - number_of_customers: {{ estimate: number | null, confidence: number (0-100), source: string | null }} | null\n\
         - net_worth_usd: {{ estimate: number | null, confidence: number (0-100), source: string | null }} | null\n\
         - exposure_score: {{ estimate: number | null, confidence: number (0-100), source: string | null }} | null\n\
         - notes: string | null\n\n\
         Guidelines:\n\
         - Provide numeric averages\n\
         - For each numeric field include a confidence integer between 0 and 100 (0 = no \
         confidence / not estimated, 100 = high confidence).\n\
         - Never use null for a metric; give a conservative estimate and a low confidence \
         value instead.\n\
         - Reply with only valid JSON (no surrounding commentary).\n\n\
         Analyses:\n{}\n\n\
         Example output:\n\
         [\n  {{\n    \
         \"name\": \"Competitor A\",\n    \
         \"price_range\": \"$199-$999\",\n    \
         \"stock_price\": {{ \"estimate\": 123.45, \"confidence\": 40, \"source\": \"model_estimate\" }},\n    \
         \"annual_revenue_usd\": {{ \"estimate\": 5000000000, \"confidence\": 30, \"source\": \"model_estimate\" }},\n    \
         \"estimated_market_share_percent\": {{ \"estimate\": 12.3, \"confidence\": 25, \"source\": \"analysis_text\" }},\n    \
         \"number_of_customers\": {{ \"estimate\": 1000000, \"confidence\": 20, \"source\": \"model_estimate\" }},\n    \
         \"net_worth_usd\": {{ \"estimate\": 20000000000, \"confidence\": 20, \"source\": \"model_estimate\" }},\n    \
         \"exposure_score\": {{ \"estimate\": 85, \"confidence\": 50, \"source\": \"analysis_text\" }},\n    \
         \"notes\": \"Estimated from description\"\n  }}\n]\n",
        analyses.join("\n\n")
    )
}

/// Appends `\n\nBest,\n{name}\n{position}` to each body unless the model
/// already mentioned the sender in that body.
fn append_signature(email: &mut GeneratedEmail, name: Option<&str>, position: Option<&str>) {
    let parts: Vec<&str> = [name, position].into_iter().flatten().collect();
    if parts.is_empty() {
        return;
    }
    let signature = format!("\n\nBest,\n{}", parts.join("\n"));

    let ensure = |text: &mut String| {
        let mentions_sender = name.is_some_and(|n| text.contains(n))
            || position.is_some_and(|p| text.contains(p));
        if !mentions_sender {
            text.push_str(&signature);
        }
    };

    ensure(&mut email.body);
    ensure(&mut email.follow_up1);
    ensure(&mut email.follow_up2);
}

/// Normalizes one model-emitted object into a candidate lead, tolerating
/// the key spellings the model tends to improvise.
fn lead_from_value(value: &Value) -> Option<CandidateLead> {
    if !value.is_object() {
        return None;
    }

    let text_field = |keys: &[&str]| -> String {
        keys.iter()
            .filter_map(|k| value.get(*k).and_then(|v| v.as_str()))
            .find(|s| !s.is_empty())
            .unwrap_or("")
            .to_string()
    };
    let optional_field = |keys: &[&str]| -> Option<String> {
        let s = text_field(keys);
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    };

    Some(CandidateLead {
        first_name: text_field(&["first_name", "firstName", "first"]),
        last_name: text_field(&["last_name", "lastName", "last"]),
        company: text_field(&["company", "organization", "companyName"]),
        domain: optional_field(&["domain", "company_domain", "website"]),
        title: optional_field(&["title", "position", "job"]),
    })
}
