use crate::config::Config;
use crate::llm::{generate_with_retry, strip_code_blocks, GenerationOptions, LlmClient};
use crate::model::PresentationStyle;
use crate::planner::SectionPlan;
use serde::Deserialize;

/// Maps a free-text style hint onto the closed enum. With an allow-list the
/// result is always a member of that list: case-insensitive exact match,
/// else its first entry. Without one, anything unmatched is the default.
/// Free text never leaks into a `PresentationStyle` field.
pub fn coerce_style(
    hint: &str,
    allowed: Option<&[PresentationStyle]>,
) -> PresentationStyle {
    match allowed {
        Some(list) if !list.is_empty() => {
            let hint = hint.trim();
            list.iter()
                .copied()
                .find(|s| s.as_str().eq_ignore_ascii_case(hint))
                .unwrap_or(list[0])
        }
        _ => PresentationStyle::default(),
    }
}

#[derive(Deserialize, Default)]
struct StyleResponse {
    #[serde(default)]
    styles: Vec<String>,
}

/// Batch refinement pass: asks the generator to pick one style per section
/// from the full enum, given each section's hint, title, length and talking
/// points. This call never fails the pipeline: a failed or unparseable
/// response degrades to per-hint parsing, and a misaligned list is padded
/// with the default style or truncated.
pub async fn refine_styles(
    llm: &dyn LlmClient,
    config: &Config,
    plans: &[SectionPlan],
) -> Vec<PresentationStyle> {
    if plans.is_empty() {
        return Vec::new();
    }

    let allowed = PresentationStyle::ALL
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let brief = plans
        .iter()
        .map(|p| {
            format!(
                "{}. \"{}\" ({}s) hint: \"{}\" points: {:?}",
                p.index, p.title, p.length_s, p.style_hint, p.talking_points
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let system = format!(
        "You assign a presentation style to each section of a video outline.\n\
        Allowed styles: {}.\n\
        Return strict JSON: {{ \"styles\": [\"...\"] }} with exactly one \
        style per section, in section order.",
        allowed
    );
    let user = format!("Sections:\n{}", brief);

    let options = GenerationOptions::from_builder(&config.builder);
    let styles = match generate_with_retry(llm, &config.llm, &system, &user, &options).await {
        Ok(raw) => {
            let clean = strip_code_blocks(&raw);
            let parsed: StyleResponse = serde_json::from_str(&clean).unwrap_or_else(|e| {
                log::warn!("Style refinement returned unparseable JSON ({}); using hints", e);
                StyleResponse::default()
            });
            parsed
                .styles
                .iter()
                .map(|s| PresentationStyle::parse(s))
                .collect()
        }
        Err(e) => {
            log::warn!("Style refinement call failed ({:#}); using hints", e);
            plans
                .iter()
                .map(|p| PresentationStyle::parse(&p.style_hint))
                .collect()
        }
    };

    align_styles(styles, plans.len())
}

/// Pads with the default style or truncates so the list matches the
/// section count. Misalignment is repaired silently, never raised.
fn align_styles(mut styles: Vec<PresentationStyle>, count: usize) -> Vec<PresentationStyle> {
    if styles.len() != count {
        log::debug!(
            "Refined style list has {} entries for {} sections; realigning",
            styles.len(),
            count
        );
    }
    styles.truncate(count);
    while styles.len() < count {
        styles.push(PresentationStyle::default());
    }
    styles
}
