use crate::config::Config;
use crate::lines::{assemble_voice_lines, LineDraft};
use crate::llm::{generate_with_retry, strip_code_blocks, GenerationOptions, LlmClient};
use crate::model::{BuildRequest, ScriptSection, ScriptSectionInfo};
use anyhow::{Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

const MIN_WORD_BUDGET: u32 = 20;

#[derive(Deserialize, Default)]
struct DraftResponse {
    #[serde(default)]
    narration: String,
    #[serde(default)]
    lines: Vec<LineWire>,
}

#[derive(Deserialize)]
struct LineWire {
    #[serde(default)]
    speaker: Option<String>,
    #[serde(default)]
    text: String,
}

/// Soft target for a section's spoken length. Short-form pacing runs
/// denser than long-form; very short sections still get enough words to
/// say something.
pub fn word_budget(length_s: u32, short_form: bool) -> u32 {
    let words_per_second = if short_form { 2.0 } else { 2.6 };
    let budget = (length_s as f32 * words_per_second).round() as u32;
    budget.max(MIN_WORD_BUDGET)
}

/// A terminal progress bar when requested, a no-op sink otherwise.
/// Library callers and tests stay silent; the binary asks for the bar.
fn progress_bar(count: u64, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(count);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Composes every section concurrently, bounded by the configured cap.
/// Sections have no data dependency on each other; each task owns its own
/// draft buffers. One section's exhausted-retry failure aborts the build,
/// or (with allow_partial) yields that section marked failed while the
/// others complete.
pub async fn compose_sections(
    llm: &dyn LlmClient,
    config: &Config,
    request: &BuildRequest,
    infos: Vec<ScriptSectionInfo>,
    show_progress: bool,
) -> Result<Vec<ScriptSection>> {
    let count = infos.len();
    let pb = progress_bar(count as u64, show_progress)?;

    let results: Vec<(usize, ScriptSectionInfo, Result<ScriptSection>)> =
        futures_util::stream::iter(infos.into_iter().enumerate())
            .map(|(i, info)| {
                let pb = pb.clone();
                async move {
                    let fallback_info = info.clone();
                    let result = compose_section(llm, config, request, info).await;
                    pb.inc(1);
                    (i, fallback_info, result)
                }
            })
            .buffer_unordered(config.builder.max_concurrency.max(1))
            .collect()
            .await;

    pb.finish_and_clear();

    let mut sections: Vec<Option<ScriptSection>> = (0..count).map(|_| None).collect();
    for (i, info, result) in results {
        match result {
            Ok(section) => sections[i] = Some(section),
            Err(e) if config.builder.allow_partial => {
                log::warn!("Section {} failed, keeping it marked as failed: {e:#}", i + 1);
                sections[i] = Some(ScriptSection::failed(info));
            }
            Err(e) => {
                return Err(e.context(format!("Composing section {} failed", i + 1)));
            }
        }
    }

    Ok(sections.into_iter().flatten().collect())
}

/// One generation pass for one section, followed by deterministic line
/// assembly and narration derivation.
async fn compose_section(
    llm: &dyn LlmClient,
    config: &Config,
    request: &BuildRequest,
    info: ScriptSectionInfo,
) -> Result<ScriptSection> {
    let speakers: Vec<&str> = info.participants.iter().map(|c| c.name.as_str()).collect();
    let budget = word_budget(info.length_s, request.is_short_form());

    let system = "You are an elite video scriptwriter. Write tight, engaging \
        narration for one section of a script.\n\
        Keep the pace natural; avoid filler.\n\
        Every line's \"speaker\" MUST be one of the provided speaker names.\n\
        Return strict JSON: { \"narration\": \"...\", \"lines\": \
        [ { \"speaker\": \"...\", \"text\": \"...\" } ] }";

    let user = format!(
        "Language: {}\n\
        Niche: {}\n\
        Tone: {}\n\
        Audience: {}\n\
        Platform: {}\n\
        Speakers: {:?}\n\
        Section {} of the script: \"{}\"\n\
        Presentation style: {}\n\
        Section length: {}s (aim for roughly {} words)\n\
        Talking points: {:?}\n\n\
        Produce the ordered spoken lines for this section. If there is a \
        single speaker, lines[] may be omitted in favor of narration.",
        request.language,
        request.niche,
        request.tone,
        request.audience,
        request.platform,
        speakers,
        info.index,
        info.title,
        info.presentation_style,
        info.length_s,
        budget,
        info.talking_points,
    );

    let options =
        GenerationOptions::from_builder(&config.builder).with_web_search(info.web_search);
    let raw = generate_with_retry(llm, &config.llm, system, &user, &options)
        .await
        .with_context(|| format!("Draft call for section {} failed", info.index))?;

    let clean = strip_code_blocks(&raw);
    let parsed: DraftResponse = serde_json::from_str(&clean).unwrap_or_else(|e| {
        log::warn!(
            "Section {} draft was not valid JSON ({}); composing from nothing",
            info.index,
            e
        );
        DraftResponse::default()
    });

    let drafts: Vec<LineDraft> = parsed
        .lines
        .into_iter()
        .map(|wire| LineDraft {
            speaker: wire.speaker,
            text: wire.text,
        })
        .collect();

    let voice_lines = assemble_voice_lines(&info.participants, &parsed.narration, &drafts);
    if voice_lines.is_empty() {
        log::warn!("Section {} came back with no usable content", info.index);
    }

    Ok(ScriptSection::from_lines(info, voice_lines))
}
