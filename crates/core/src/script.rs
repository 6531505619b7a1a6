//! Script segmentation and the fallback script template.
//!
//! A generated script is split into scene descriptions at explicit
//! `Scene N` markers (plain, markdown heading or bold). Scripts without
//! markers are split at blank lines, or at single newlines when the script
//! is one paragraph. A `Title:` line, when present, becomes the episode
//! title, and screenplay lines of the form `NAME: line` become dialogue.

use std::sync::LazyLock;

use regex::Regex;

use crate::episode::DialogueLine;

/// `Scene N` at the start of a line, optionally behind `#` or `**`.
static SCENE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:[*_]{1,2}[ \t]*)?scene[ \t]+\d+\b")
        .expect("valid regex")
});

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:[*_]{1,2}[ \t]*)?title[*_]*[ \t]*:[ \t]*(.+)$")
        .expect("valid regex")
});

/// Upper-case speaker name, optional parenthetical, colon, line.
static DIALOGUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][A-Z0-9 .'\-]*?)[ \t]*(?:\([^)]*\))?[ \t]*:[ \t]*(.+)$")
        .expect("valid regex")
});

static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));

/// Label used when the script does not carry its own title.
pub fn default_title(prompt: &str) -> String {
    format!("AI Film: {prompt}")
}

/// Deterministic three-scene script used when the text provider fails.
pub fn fallback_script(prompt: &str) -> String {
    format!(
        "Title: AI Film: {prompt}\n\
         \n\
         Scene 1: An establishing shot introduces the world of {prompt}.\n\
         Scene 2: The story of {prompt} builds to its turning point.\n\
         Scene 3: A closing moment brings {prompt} to a quiet resolution."
    )
}

/// Text of one scene before media generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneText {
    pub description: String,
    pub dialogue: Option<Vec<DialogueLine>>,
}

/// Result of segmenting a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDraft {
    pub title: Option<String>,
    pub scenes: Vec<SceneText>,
}

/// Split a generated script into its title and ordered scenes.
///
/// Empty segments are discarded, so a script with no usable content yields
/// an empty `scenes` list; callers decide what to fall back to.
pub fn segment_script(text: &str) -> ScriptDraft {
    let text = text.replace("\r\n", "\n");

    let title = TITLE_RE
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| clean_line(m.as_str()).trim_matches('"').trim().to_string())
        .filter(|t| !t.is_empty());
    let body = TITLE_RE.replace(&text, "");

    let segments = if SCENE_MARKER_RE.is_match(&body) {
        split_at_markers(&body)
    } else {
        split_at_newlines(&body)
    };

    let scenes = segments
        .into_iter()
        .filter_map(|segment| build_scene(&segment))
        .collect();

    ScriptDraft { title, scenes }
}

/// Text between consecutive markers. Text before the first marker is a
/// preamble and is not a scene.
fn split_at_markers(body: &str) -> Vec<String> {
    let markers: Vec<_> = SCENE_MARKER_RE.find_iter(body).collect();
    markers
        .iter()
        .enumerate()
        .map(|(i, marker)| {
            let end = markers.get(i + 1).map_or(body.len(), |next| next.start());
            body[marker.end()..end]
                .trim_start_matches(|c: char| {
                    c.is_whitespace()
                        || matches!(c, ':' | '.' | ')' | '-' | '*' | '_' | '\u{2013}' | '\u{2014}')
                })
                .to_string()
        })
        .collect()
}

fn split_at_newlines(body: &str) -> Vec<String> {
    let paragraphs: Vec<&str> = PARAGRAPH_BREAK_RE
        .split(body)
        .filter(|p| !p.trim().is_empty())
        .collect();
    if paragraphs.len() > 1 {
        paragraphs.into_iter().map(str::to_string).collect()
    } else {
        body.lines().map(str::to_string).collect()
    }
}

fn build_scene(segment: &str) -> Option<SceneText> {
    let mut narrative = Vec::new();
    let mut dialogue = Vec::new();

    for line in segment.lines().map(clean_line).filter(|l| !l.is_empty()) {
        match DIALOGUE_RE.captures(line) {
            Some(caps) => dialogue.push(DialogueLine {
                character: caps[1].trim().to_string(),
                line: caps[2].trim().to_string(),
            }),
            None => narrative.push(line),
        }
    }

    let description = if narrative.is_empty() {
        dialogue
            .iter()
            .map(|d| format!("{}: {}", d.character, d.line))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        narrative.join(" ")
    };

    if description.is_empty() {
        return None;
    }

    Some(SceneText {
        description,
        dialogue: (!dialogue.is_empty()).then_some(dialogue),
    })
}

/// Strip markdown decoration (`#`, `>`, `*`, `_`) around a line.
fn clean_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c == '#' || c == '>')
        .trim()
        .trim_matches(|c: char| c == '*' || c == '_')
        .trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
