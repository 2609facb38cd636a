use crate::composer::compose_sections;
use crate::config::Config;
use crate::llm::LlmClient;
use crate::model::{BuildRequest, Script, ScriptMetadata};
use crate::planner::plan_sections;
use anyhow::{Context, Result};

/// Drives the whole pipeline: one planning pass, then one composition
/// pass per section, then assembly into the final artifact. The caller
/// owns the client and its lifecycle; the builder only borrows config
/// and holds the boxed client it was given.
pub struct ScriptBuilder {
    config: Config,
    llm: Box<dyn LlmClient>,
    show_progress: bool,
}

impl ScriptBuilder {
    pub fn new(config: Config, llm: Box<dyn LlmClient>) -> Self {
        Self {
            config,
            llm,
            show_progress: false,
        }
    }

    /// Enables the terminal progress bar during composition. Off by
    /// default so library callers stay silent.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub async fn build(&self, request: &BuildRequest) -> Result<Script> {
        request.validate().context("Invalid build request")?;

        let metadata = ScriptMetadata::from_request(request);

        log::info!(
            "Planning sections for \"{}\" ({}s on {})",
            request.idea,
            request.desired_length_s,
            request.platform
        );
        let infos = plan_sections(self.llm.as_ref(), &self.config, request).await?;
        log::info!("Planned {} sections; composing", infos.len());

        let sections = compose_sections(
            self.llm.as_ref(),
            &self.config,
            request,
            infos,
            self.show_progress,
        )
        .await?;

        Ok(Script {
            metadata,
            sections,
            characters: request.characters.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuilderConfig, LlmConfig};
    use crate::llm::GenerationOptions;
    use crate::model::{Character, PresentationStyle};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Routes on prompt content: the outliner prompt gets the plan, the
    /// style prompt gets styles, everything else gets a section draft.
    #[derive(Debug)]
    struct MockLlmClient {
        plan: String,
        styles: String,
        draft_for: fn(&str) -> String,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn generate(
            &self,
            system: &str,
            user: &str,
            _: &GenerationOptions,
        ) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push(user.to_string());
            if system.contains("outliner") {
                Ok(self.plan.clone())
            } else if system.contains("presentation style") {
                Ok(self.styles.clone())
            } else {
                Ok((self.draft_for)(user))
            }
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

    fn shorts_request(characters: Vec<Character>) -> BuildRequest {
        BuildRequest {
            channel_name: "TechBytes".to_string(),
            idea: "History of the transistor".to_string(),
            description: "A quick tour".to_string(),
            niche: "tech".to_string(),
            tone: "curious".to_string(),
            platform: "shorts".to_string(),
            desired_num_of_sections: 0,
            desired_length_s: 90,
            language: "English".to_string(),
            audience: "general".to_string(),
            preferred_styles: None,
            web_search: false,
            characters,
        }
    }

    #[tokio::test]
    async fn end_to_end_shorts_script_with_one_host() {
        let llm = MockLlmClient {
            plan: r#"{"sections": [
                {"index": 1, "length_s": 25, "title": "Hook", "talking_points": ["tease"], "presentation_style": "narrative", "web_search": false},
                {"index": 2, "length_s": 40, "title": "Value", "talking_points": ["the story"], "presentation_style": "explanatory", "web_search": false},
                {"index": 3, "length_s": 20, "title": "CTA", "talking_points": ["subscribe"], "presentation_style": "explanatory", "web_search": false}
            ]}"#
            .to_string(),
            styles: r#"{"styles": ["narrative", "explanatory", "explanatory"]}"#.to_string(),
            draft_for: |_| r#"{"lines": [{"speaker": "Host", "text": "One line."}]}"#.to_string(),
            calls: Mutex::new(vec![]),
        };

        let builder = ScriptBuilder::new(test_config(), Box::new(llm));
        let request = shorts_request(vec![Character::new("Host")]);
        let script = builder.build(&request).await.unwrap();

        assert_eq!(script.sections.len(), 3);
        let total: u32 = script.sections.iter().map(|s| s.info.length_s).sum();
        assert_eq!(total, 90);
        assert!(script.sections.iter().all(|s| s.info.length_s >= 1));
        for section in &script.sections {
            assert!(!section.voice_lines.is_empty());
            assert!(section
                .voice_lines
                .iter()
                .all(|l| l.character == "Host"));
            assert_eq!(section.script_text, "One line.");
        }
        assert_eq!(script.metadata.title, "History of the transistor");
        assert_eq!(script.metadata.target_length_s, 90);
        assert_eq!(script.characters, request.characters);
    }

    #[tokio::test]
    async fn end_to_end_two_characters_round_robin_when_drafts_are_unlabeled() {
        let llm = MockLlmClient {
            plan: r#"{"sections": [
                {"index": 1, "length_s": 90, "title": "Main", "talking_points": [], "presentation_style": "debate", "web_search": false}
            ]}"#
            .to_string(),
            styles: r#"{"styles": ["debate"]}"#.to_string(),
            draft_for: |_| r#"{"narration": "Hello there. How are you? I'm fine."}"#.to_string(),
            calls: Mutex::new(vec![]),
        };

        let builder = ScriptBuilder::new(test_config(), Box::new(llm));
        let request =
            shorts_request(vec![Character::new("Host"), Character::new("Guest")]);
        let script = builder.build(&request).await.unwrap();

        let lines = &script.sections[0].voice_lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].character, "Host");
        assert_eq!(lines[1].character, "Guest");
        assert_eq!(lines[2].character, "Host");
    }

    #[tokio::test]
    async fn script_artifact_round_trips_through_json() {
        let llm = MockLlmClient {
            plan: r#"{"sections": [
                {"index": 1, "length_s": 90, "title": "Main", "talking_points": ["one point"], "presentation_style": "narrative", "web_search": true}
            ]}"#
            .to_string(),
            styles: r#"{"styles": ["narrative"]}"#.to_string(),
            draft_for: |_| r#"{"lines": [{"speaker": "Host", "text": "Hello."}]}"#.to_string(),
            calls: Mutex::new(vec![]),
        };

        let builder = ScriptBuilder::new(test_config(), Box::new(llm));
        let request = shorts_request(vec![Character::new("Host")]);
        let script = builder.build(&request).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(&path, serde_json::to_string_pretty(&script).unwrap()).unwrap();

        let loaded: Script =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.sections.len(), 1);
        assert_eq!(
            loaded.sections[0].info.presentation_style,
            PresentationStyle::Narrative
        );
        assert!(loaded.sections[0].info.web_search);
        assert_eq!(loaded.sections[0].script_text, "Hello.");
        assert_eq!(loaded.metadata.call_to_action, "Like & subscribe for more!");
        assert!(!loaded.sections[0].generation_failed);
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_any_generation_call() {
        let llm = MockLlmClient {
            plan: String::new(),
            styles: String::new(),
            draft_for: |_| String::new(),
            calls: Mutex::new(vec![]),
        };

        let builder = ScriptBuilder::new(test_config(), Box::new(llm));
        let mut request = shorts_request(vec![Character::new("Host")]);
        request.desired_length_s = 5;

        let err = builder.build(&request).await.unwrap_err();
        assert!(format!("{err:#}").contains("Invalid build request"));
    }
}
