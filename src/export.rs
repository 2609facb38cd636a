use crate::model::Script;

/// Only the spoken lines, in chronological order, one per line. Suitable
/// for writing straight to a .txt file.
pub fn export_plain_text(script: &Script) -> String {
    let mut out_lines = Vec::new();
    for section in &script.sections {
        for line in &section.voice_lines {
            let text = line.text.trim();
            if !text.is_empty() {
                out_lines.push(text.to_string());
            }
        }
    }
    out_lines.join("\n")
}

/// Speaker-tagged blocks: `[Name]` on its own line, then the line text,
/// blank line between blocks.
pub fn export_with_speakers(script: &Script) -> String {
    let mut blocks = Vec::new();
    for section in &script.sections {
        for line in &section.voice_lines {
            let text = line.text.trim();
            if text.is_empty() {
                continue;
            }
            let name = line.character.trim();
            if name.is_empty() {
                blocks.push(text.to_string());
            } else {
                blocks.push(format!("[{}]\n{}", name, text));
            }
        }
    }
    blocks.join("\n\n")
}

/// Lines grouped by character while preserving the original order via
/// indices. Groups are ordered by first appearance; inside each group,
/// lines stay chronological. Every line carries a global number and a
/// (section, line) pair so the full script can be reconstructed:
///
/// ```text
/// [Host]
/// 0001 (S1:L1) Hello!
/// 0004 (S2:L2) Another line...
/// ```
pub fn export_grouped_by_character(script: &Script) -> String {
    // name -> [(global, section, line, text)], insertion-ordered
    let mut groups: Vec<(String, Vec<(usize, usize, usize, String)>)> = Vec::new();
    let mut global_idx = 1;

    for (sec_idx, section) in script.sections.iter().enumerate() {
        for (line_idx, line) in section.voice_lines.iter().enumerate() {
            let text = line.text.trim();
            if text.is_empty() {
                continue;
            }
            let name = match line.character.trim() {
                "" => "Unknown",
                name => name,
            };
            let entry = (global_idx, sec_idx + 1, line_idx + 1, text.to_string());
            match groups.iter_mut().find(|(n, _)| n == name) {
                Some((_, lines)) => lines.push(entry),
                None => groups.push((name.to_string(), vec![entry])),
            }
            global_idx += 1;
        }
    }

    let mut chunks = Vec::new();
    for (name, lines) in groups {
        chunks.push(format!("[{}]", name));
        for (gidx, sidx, lidx, text) in lines {
            chunks.push(format!("{:04} (S{}:L{}) {}", gidx, sidx, lidx, text));
        }
        chunks.push(String::new());
    }
    chunks.join("\n").trim_end().to_string()
}
