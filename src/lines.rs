use crate::model::{Character, VoiceLine};
use std::collections::HashMap;

/// One speaker-labeled line as drafted by the generator, before the
/// speaker name has been checked against the cast.
#[derive(Debug, Clone)]
pub struct LineDraft {
    pub speaker: Option<String>,
    pub text: String,
}

/// Turns narration and/or drafted lines into an ordered list of voice
/// lines whose speaker is always a member of `cast`.
///
/// Per draft line: exact trimmed-name match against the cast, then the
/// sole cast member if there is only one, then the first cast member.
/// Lines are never dropped for an unknown label.
///
/// With no usable drafts: a sole speaker takes the whole narration as one
/// line; multiple speakers get the narration sentence-split and assigned
/// round-robin in cast order. Returns an empty list only when both the
/// narration and the drafts are empty.
pub fn assemble_voice_lines(
    cast: &[Character],
    narration: &str,
    drafts: &[LineDraft],
) -> Vec<VoiceLine> {
    if cast.is_empty() {
        return Vec::new();
    }

    let by_name: HashMap<&str, &Character> =
        cast.iter().map(|c| (c.name.as_str(), c)).collect();
    let solo = if cast.len() == 1 { Some(&cast[0]) } else { None };

    let usable: Vec<&LineDraft> = drafts
        .iter()
        .filter(|d| !d.text.trim().is_empty())
        .collect();

    if !usable.is_empty() {
        return usable
            .iter()
            .map(|draft| {
                let label = draft.speaker.as_deref().unwrap_or("").trim();
                let character = by_name
                    .get(label)
                    .copied()
                    .or(solo)
                    .unwrap_or(&cast[0]);
                VoiceLine {
                    character: character.name.clone(),
                    text: draft.text.trim().to_string(),
                }
            })
            .collect();
    }

    let narration = narration.trim();
    if narration.is_empty() {
        return Vec::new();
    }

    if let Some(solo) = solo {
        return vec![VoiceLine {
            character: solo.name.clone(),
            text: narration.to_string(),
        }];
    }

    let segments = split_sentences(narration);
    if segments.is_empty() {
        return vec![VoiceLine {
            character: cast[0].name.clone(),
            text: narration.to_string(),
        }];
    }

    segments
        .into_iter()
        .enumerate()
        .map(|(i, text)| VoiceLine {
            character: cast[i % cast.len()].name.clone(),
            text,
        })
        .collect()
}

/// Splits on sentence terminators, keeping the terminator with its
/// sentence. A trailing fragment without one gets a period appended.
fn split_sentences(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() && trimmed != "." && trimmed != "!" && trimmed != "?" {
                segments.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        segments.push(format!("{}.", tail));
    }
    segments
}
