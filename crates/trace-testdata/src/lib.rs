//! Loader for the editing trace format used by the replay test and the
//! benchmarks: a JSON object of the shape
//!
//! ```json
//! { "edits": [[10, 0, "a"], [4, 1], ...], "finalText": "..." }
//! ```
//!
//! where tag 0 is a single character insert and tag 1 a single character
//! delete, both at the given position.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawEdit {
    Triple(usize, u8, String),
    Pair(usize, u8),
}

#[derive(Debug, Clone, Deserialize)]
struct RawTrace {
    edits: Vec<RawEdit>,
    #[serde(rename = "finalText")]
    final_text: String,
}

#[derive(Debug, Clone)]
pub struct Edit {
    pub pos: usize,
    pub is_insert: bool,
    /// The inserted character. Empty for deletes.
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct EditingTrace {
    pub edits: Vec<Edit>,
    pub final_text: String,
}

pub fn load_editing_trace<P: AsRef<Path>>(path: P) -> EditingTrace {
    let file = File::open(path.as_ref()).unwrap();
    let reader = BufReader::new(file);
    let raw: RawTrace = serde_json::from_reader(reader).unwrap();

    let edits = raw
        .edits
        .into_iter()
        .map(|edit| {
            // Tag 0 is an insert carrying a character; tag 1 a delete, whose
            // rows usually (but not always) omit the character.
            let (pos, tag, content) = match edit {
                RawEdit::Triple(pos, tag, content) => (pos, tag, content),
                RawEdit::Pair(pos, tag) => (pos, tag, String::new()),
            };
            let is_insert = tag == 0;
            Edit { pos, is_insert, content: if is_insert { content } else { String::new() } }
        })
        .collect();

    EditingTrace { edits, final_text: raw.final_text }
}

/// Look for the trace file in the places a checkout might keep it. Returns
/// None when the data isn't vendored, so consumers can skip instead of fail.
pub fn find_editing_trace() -> Option<PathBuf> {
    let candidates = [
        "resources/editing-trace.json",
        "benchmark_data/editing-trace.json",
        "../resources/editing-trace.json",
    ];
    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}
