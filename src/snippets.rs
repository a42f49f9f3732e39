use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::warn;

use crate::config::Language;

static SNIPPET_DIR: Dir = include_dir!("src/snippets");

#[derive(Deserialize, Clone, Debug)]
struct SnippetFile {
    language: String,
    snippets: Vec<String>,
}

/// Code snippets bundled into the binary, grouped by language
#[derive(Clone, Debug)]
pub struct SnippetLibrary {
    files: Vec<(Language, Vec<String>)>,
}

impl SnippetLibrary {
    pub fn embedded() -> Self {
        let files = Language::ALL
            .into_iter()
            .map(|language| (language, read_snippets(language)))
            .collect();
        Self { files }
    }

    pub fn snippets(&self, language: Language) -> &[String] {
        self.files
            .iter()
            .find(|(l, _)| *l == language)
            .map(|(_, s)| s.as_slice())
            .unwrap_or(&[])
    }

    pub fn random(&self, language: Language) -> Option<&str> {
        self.snippets(language)
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }
}

impl Default for SnippetLibrary {
    fn default() -> Self {
        Self::embedded()
    }
}

fn read_snippets(language: Language) -> Vec<String> {
    let file_name = format!("{language}.json");
    let Some(contents) = SNIPPET_DIR
        .get_file(&file_name)
        .and_then(|f| f.contents_utf8())
    else {
        warn!(file = %file_name, "snippet file missing");
        return Vec::new();
    };

    match serde_json::from_str::<SnippetFile>(contents) {
        Ok(file) if file.language == language.to_string() => file.snippets,
        Ok(file) => {
            warn!(file = %file_name, found = %file.language, "snippet file has wrong language");
            Vec::new()
        }
        Err(e) => {
            warn!(file = %file_name, error = %e, "unable to parse snippet file");
            Vec::new()
        }
    }
}
