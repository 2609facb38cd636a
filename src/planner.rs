use crate::config::Config;
use crate::llm::{generate_with_retry, strip_code_blocks, GenerationOptions, LlmClient};
use crate::model::{BuildRequest, ScriptSectionInfo};
use crate::normalize::normalize_lengths;
use crate::style::{coerce_style, refine_styles};
use anyhow::{Context, Result};
use serde::Deserialize;

const MAX_TALKING_POINTS: usize = 5;

/// Coarse per-section outline as drafted by the generator. Lives only
/// inside the planning phase; materialized into `ScriptSectionInfo` at
/// the end of it.
#[derive(Debug, Clone)]
pub struct SectionPlan {
    pub index: u32,
    pub length_s: u32,
    pub title: String,
    pub talking_points: Vec<String>,
    pub style_hint: String,
    pub web_search: bool,
}

impl SectionPlan {
    /// The single full-duration section used when the generator returns
    /// nothing usable.
    pub fn fallback(total: u32) -> Self {
        Self {
            index: 1,
            length_s: total,
            title: "Main".to_string(),
            talking_points: vec![],
            style_hint: "explanatory".to_string(),
            web_search: false,
        }
    }
}

#[derive(Deserialize, Default)]
struct PlanResponse {
    #[serde(default)]
    sections: Vec<PlanWire>,
}

#[derive(Deserialize)]
struct PlanWire {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    length_s: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    talking_points: Vec<String>,
    #[serde(default)]
    presentation_style: String,
    #[serde(default)]
    web_search: bool,
}

/// Plans the script outline: one generation pass, then deterministic
/// repair (length normalization, style resolution) into validated
/// section metadata. Never yields an empty outline.
pub async fn plan_sections(
    llm: &dyn LlmClient,
    config: &Config,
    request: &BuildRequest,
) -> Result<Vec<ScriptSectionInfo>> {
    let total = request.desired_length_s;

    let (min_sections, max_sections) = if request.desired_num_of_sections > 0 {
        (
            request.desired_num_of_sections,
            request.desired_num_of_sections,
        )
    } else if request.is_short_form() {
        (1, 3)
    } else {
        (5, 9)
    };

    let style_options: Vec<&str> = request
        .preferred_styles
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(|s| s.as_str())
        .collect();

    let system = "You are an expert video script outliner.\n\
        Decide how many sections to use and plan each one thoughtfully.\n\
        For shorts (<=60s), prefer 1-3 sections (Hook -> Value -> CTA). \
        For long-form, prefer 5-9 sections (Intro, Points, Outro).\n\
        Pick a presentation_style for each section (choose from the allowed \
        list if provided). If a section relies on current events, statistics, \
        dates, or prices, mark web_search=true.\n\
        Return strict JSON: { \"sections\": [ { \"index\": 1, \"length_s\": 0, \
        \"title\": \"...\", \"talking_points\": [\"...\"], \
        \"presentation_style\": \"...\", \"web_search\": false } ] }";

    let user = format!(
        "Idea: {}\n\
        Niche: {}\n\
        Audience: {}\n\
        Tone: {}\n\
        Language: {}\n\
        Platform: {}\n\
        Target total length (s): {}\n\
        Desired section count range: {}..{}\n\
        Allowed presentation styles (optional): {:?}\n\
        For each section return: index, length_s, title, talking_points (2-5), \
        presentation_style, web_search (bool).",
        request.idea,
        request.niche,
        request.audience,
        request.tone,
        request.language,
        request.platform,
        total,
        min_sections,
        max_sections,
        style_options,
    );

    let options = GenerationOptions::from_builder(&config.builder);
    let raw = generate_with_retry(llm, &config.llm, system, &user, &options)
        .await
        .context("Section planning call failed")?;

    let clean = strip_code_blocks(&raw);
    let parsed: PlanResponse = serde_json::from_str(&clean).unwrap_or_else(|e| {
        log::warn!("Plan response was not valid JSON ({}); using fallback outline", e);
        PlanResponse::default()
    });

    let mut plans: Vec<SectionPlan> = parsed
        .sections
        .into_iter()
        .map(|wire| {
            let mut talking_points: Vec<String> = wire
                .talking_points
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            talking_points.truncate(MAX_TALKING_POINTS);
            SectionPlan {
                index: wire.index,
                length_s: wire.length_s,
                title: wire.title,
                talking_points,
                style_hint: wire.presentation_style,
                web_search: wire.web_search,
            }
        })
        .collect();

    if plans.is_empty() {
        log::warn!("Planner returned zero sections; falling back to a single Main section");
        plans.push(SectionPlan::fallback(total));
    }

    normalize_lengths(&mut plans, total);

    // One source of truth per request: the caller's allow-list pins styles
    // via coercion; without one the batch refinement pass decides.
    let styles = match request.preferred_styles.as_deref() {
        Some(allowed) => plans
            .iter()
            .map(|p| coerce_style(&p.style_hint, Some(allowed)))
            .collect(),
        None => refine_styles(llm, config, &plans).await,
    };

    let infos = plans
        .into_iter()
        .zip(styles)
        .map(|(plan, style)| ScriptSectionInfo {
            index: plan.index,
            length_s: plan.length_s,
            title: plan.title,
            talking_points: plan.talking_points,
            presentation_style: style,
            web_search: plan.web_search,
            participants: request.characters.clone(),
        })
        .collect();

    Ok(infos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuilderConfig, LlmConfig};
    use crate::model::{Character, PresentationStyle};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct MockLlmClient {
        responses: Mutex<Vec<String>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockLlmClient {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
                call_count: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn generate(&self, _: &str, _: &str, _: &GenerationOptions) -> Result<String> {
            *self.call_count.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(anyhow!("mock exhausted"));
            }
            Ok(responses.remove(0))
        }
    }

    fn test_config() -> Config {
        Config {
            llm: LlmConfig {
                provider: "mock".to_string(),
                retry_count: 0,
                retry_delay_seconds: 0,
                gemini: None,
                ollama: None,
                openai: None,
            },
            builder: BuilderConfig::default(),
        }
    }

    fn request(styles: Option<Vec<PresentationStyle>>) -> BuildRequest {
        BuildRequest {
            channel_name: "TechBytes".to_string(),
            idea: "History of the transistor".to_string(),
            description: String::new(),
            niche: "tech".to_string(),
            tone: "curious".to_string(),
            platform: "shorts".to_string(),
            desired_num_of_sections: 0,
            desired_length_s: 90,
            language: "English".to_string(),
            audience: "general".to_string(),
            preferred_styles: styles,
            web_search: false,
            characters: vec![Character::new("Host")],
        }
    }

    #[tokio::test]
    async fn plan_normalizes_lengths_and_coerces_styles() {
        let plan_json = r#"{"sections": [
            {"index": 1, "length_s": 20, "title": "Hook", "talking_points": ["grab attention"], "presentation_style": "narrative", "web_search": false},
            {"index": 2, "length_s": 30, "title": "Value", "talking_points": ["the invention"], "presentation_style": "freeform", "web_search": true},
            {"index": 3, "length_s": 20, "title": "CTA", "talking_points": ["subscribe"], "presentation_style": "news", "web_search": false}
        ]}"#;
        let llm = MockLlmClient::new(vec![plan_json]);
        let req = request(Some(vec![
            PresentationStyle::Narrative,
            PresentationStyle::News,
        ]));

        let infos = plan_sections(&llm, &test_config(), &req).await.unwrap();

        assert_eq!(infos.len(), 3);
        let total: u32 = infos.iter().map(|i| i.length_s).sum();
        assert_eq!(total, 90);
        assert!(infos.iter().all(|i| i.length_s >= 1));
        let indices: Vec<u32> = infos.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);

        // allow-list coercion: matched, fallback-to-first, matched
        assert_eq!(infos[0].presentation_style, PresentationStyle::Narrative);
        assert_eq!(infos[1].presentation_style, PresentationStyle::Narrative);
        assert_eq!(infos[2].presentation_style, PresentationStyle::News);

        assert!(infos[1].web_search);
        assert_eq!(infos[0].participants, req.characters);
        // allow-list present: no second (refinement) call was spent
        assert_eq!(*llm.call_count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_plan_falls_back_to_single_main_section() {
        let llm = MockLlmClient::new(vec![r#"{"sections": []}"#, r#"{"styles": ["news"]}"#]);
        let req = request(None);

        let infos = plan_sections(&llm, &test_config(), &req).await.unwrap();

        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].title, "Main");
        assert_eq!(infos[0].length_s, 90);
        assert_eq!(infos[0].index, 1);
        assert_eq!(infos[0].presentation_style, PresentationStyle::News);
    }

    #[tokio::test]
    async fn garbage_plan_response_still_yields_an_outline() {
        // Unparseable plan JSON, then a failing refinement call: both
        // repaired locally.
        let llm = MockLlmClient::new(vec!["not json at all"]);
        let req = request(None);

        let infos = plan_sections(&llm, &test_config(), &req).await.unwrap();

        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].length_s, 90);
        assert_eq!(infos[0].presentation_style, PresentationStyle::Explanatory);
    }

    #[tokio::test]
    async fn fenced_json_and_excess_talking_points_are_repaired() {
        let plan_json = "```json\n{\"sections\": [{\"index\": 1, \"length_s\": 90, \
            \"title\": \"Main\", \"talking_points\": [\"a\",\"b\",\"c\",\"d\",\"e\",\"f\",\"g\"], \
            \"presentation_style\": \"listicle\", \"web_search\": false}]}\n```";
        let llm = MockLlmClient::new(vec![plan_json, r#"{"styles": ["listicle"]}"#]);
        let req = request(None);

        let infos = plan_sections(&llm, &test_config(), &req).await.unwrap();

        assert_eq!(infos[0].talking_points.len(), 5);
        assert_eq!(infos[0].presentation_style, PresentationStyle::Listicle);
    }
}
