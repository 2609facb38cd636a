use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A speaking character. Name is the join key between the request cast,
/// section participants and generated speaker labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CharacterInput")]
pub struct Character {
    pub name: String,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Request YAML accepts either a bare name or a `{ name: ... }` mapping.
#[derive(Deserialize)]
#[serde(untagged)]
enum CharacterInput {
    Name(String),
    Full { name: String },
}

impl From<CharacterInput> for Character {
    fn from(input: CharacterInput) -> Self {
        match input {
            CharacterInput::Name(name) => Character { name },
            CharacterInput::Full { name } => Character { name },
        }
    }
}

/// How a section is delivered. Closed set; free-text generator output
/// never reaches fields of this type without going through `parse` or
/// the style resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationStyle {
    Narrative,
    #[default]
    Explanatory,
    Listicle,
    Debate,
    Interview,
    News,
}

impl PresentationStyle {
    pub const ALL: [PresentationStyle; 6] = [
        PresentationStyle::Narrative,
        PresentationStyle::Explanatory,
        PresentationStyle::Listicle,
        PresentationStyle::Debate,
        PresentationStyle::Interview,
        PresentationStyle::News,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationStyle::Narrative => "narrative",
            PresentationStyle::Explanatory => "explanatory",
            PresentationStyle::Listicle => "listicle",
            PresentationStyle::Debate => "debate",
            PresentationStyle::Interview => "interview",
            PresentationStyle::News => "news",
        }
    }

    /// Case-insensitive match against the full enum, `Explanatory` when
    /// nothing matches.
    pub fn parse(s: &str) -> PresentationStyle {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .unwrap_or_default()
    }
}

impl fmt::Display for PresentationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The input brief. Read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    pub channel_name: String,
    pub idea: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub niche: String,
    #[serde(default)]
    pub tone: String,
    pub platform: String,
    /// 0 means the planner decides.
    #[serde(default)]
    pub desired_num_of_sections: u32,
    /// Total video length in seconds, must exceed 10.
    pub desired_length_s: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Optional allow-list of styles the planner may pick from.
    #[serde(default)]
    pub preferred_styles: Option<Vec<PresentationStyle>>,
    /// Request-level web-search flag, carried into the metadata for
    /// downstream consumers. Per-section grants come from the planner.
    #[serde(default)]
    pub web_search: bool,
    pub characters: Vec<Character>,
}

fn default_language() -> String {
    "English".to_string()
}

fn default_audience() -> String {
    "general".to_string()
}

impl BuildRequest {
    pub fn validate(&self) -> Result<()> {
        if self.desired_length_s <= 10 {
            bail!(
                "desired_length_s must be greater than 10 seconds, got {}",
                self.desired_length_s
            );
        }
        if self.characters.is_empty() {
            bail!("at least one character is required");
        }
        let mut seen = HashSet::new();
        for c in &self.characters {
            let name = c.name.trim();
            if name.is_empty() {
                bail!("character names must not be empty");
            }
            if !seen.insert(name) {
                bail!("duplicate character name: {}", name);
            }
        }
        if let Some(styles) = &self.preferred_styles {
            if styles.is_empty() {
                bail!("preferred_styles must not be an empty list; omit it instead");
            }
        }
        Ok(())
    }

    /// Short-form pacing applies on short platforms or anything at 60s and under.
    pub fn is_short_form(&self) -> bool {
        matches!(
            self.platform.to_lowercase().as_str(),
            "shorts" | "tiktok" | "reels"
        ) || self.desired_length_s <= 60
    }
}

/// Validated, final section metadata produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSectionInfo {
    /// 1-based position; contiguous across a script.
    pub index: u32,
    pub length_s: u32,
    pub title: String,
    pub talking_points: Vec<String>,
    pub presentation_style: PresentationStyle,
    /// When set, the composition pass for this section runs with web
    /// search granted so claims can be grounded in current information.
    pub web_search: bool,
    pub participants: Vec<Character>,
}

/// One spoken utterance. `character` always names a member of the cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceLine {
    pub character: String,
    pub text: String,
}

/// One timed unit of the script. `script_text` is derived from the voice
/// lines, never authored separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSection {
    pub info: ScriptSectionInfo,
    pub script_text: String,
    pub voice_lines: Vec<VoiceLine>,
    /// Set when composition exhausted retries and the build ran with
    /// allow_partial; such a section carries no content.
    #[serde(default)]
    pub generation_failed: bool,
}

impl ScriptSection {
    /// Builds a section from assembled lines, deriving the flat narration
    /// as their space-joined concatenation.
    pub fn from_lines(info: ScriptSectionInfo, voice_lines: Vec<VoiceLine>) -> Self {
        let script_text = voice_lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            info,
            script_text,
            voice_lines,
            generation_failed: false,
        }
    }

    pub fn failed(info: ScriptSectionInfo) -> Self {
        Self {
            info,
            script_text: String::new(),
            voice_lines: Vec::new(),
            generation_failed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptMetadata {
    pub channel_name: String,
    pub title: String,
    pub description: String,
    pub niche: String,
    pub tone: String,
    pub platform: String,
    pub desired_num_of_sections: u32,
    pub target_length_s: u32,
    pub primary_audience: String,
    pub language: String,
    #[serde(default)]
    pub intro: Option<String>,
    #[serde(default = "default_cta")]
    pub call_to_action: String,
    #[serde(default)]
    pub web_search: bool,
    pub characters: Vec<Character>,
}

fn default_cta() -> String {
    "Like & subscribe for more!".to_string()
}

impl ScriptMetadata {
    pub fn from_request(request: &BuildRequest) -> Self {
        Self {
            channel_name: request.channel_name.clone(),
            title: request.idea.clone(),
            description: request.description.clone(),
            niche: request.niche.clone(),
            tone: request.tone.clone(),
            platform: request.platform.clone(),
            desired_num_of_sections: request.desired_num_of_sections,
            target_length_s: request.desired_length_s,
            primary_audience: request.audience.clone(),
            language: request.language.clone(),
            intro: None,
            call_to_action: default_cta(),
            web_search: request.web_search,
            characters: request.characters.clone(),
        }
    }
}

/// The full artifact. Built once by the pipeline, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub metadata: ScriptMetadata,
    pub sections: Vec<ScriptSection>,
    pub characters: Vec<Character>,
}
