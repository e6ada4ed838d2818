//! Word lists and word normalization.
//!
//! A dictionary keeps its words in file order (the AI scans them in that
//! order, which makes its suggestions reproducible) plus a hash set for
//! membership checks.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// On-disk shape of a dictionary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryFile {
    pub title: String,
    pub description: String,
    pub words: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Dictionary {
    title: String,
    description: String,
    words: Vec<String>,
    lookup: HashSet<String>,
}

impl Dictionary {
    /// Build a dictionary. Words are normalized; duplicates keep their first position.
    pub fn new(title: impl Into<String>, description: impl Into<String>, words: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut lookup = HashSet::new();
        let mut ordered = Vec::new();
        for word in words {
            let word = normalize(word.as_ref()).to_lowercase();
            if word.is_empty() {
                continue;
            }
            if lookup.insert(word.clone()) {
                ordered.push(word);
            }
        }
        Self { title: title.into(), description: description.into(), words: ordered, lookup }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Membership check. Case and accents are ignored.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.lookup.contains(&normalize(word).to_lowercase())
    }
}

impl From<DictionaryFile> for Dictionary {
    fn from(file: DictionaryFile) -> Self {
        Self::new(file.title, file.description, file.words)
    }
}

impl From<&Dictionary> for DictionaryFile {
    fn from(dict: &Dictionary) -> Self {
        Self { title: dict.title.clone(), description: dict.description.clone(), words: dict.words.clone() }
    }
}

/// Strip accents from Latin letters, preserving case. Other characters pass through.
#[must_use]
pub fn normalize(word: &str) -> String {
    word.chars().map(strip_accent).collect()
}

fn strip_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'ç' => 'c',
        'Ç' => 'C',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' | 'Ÿ' => 'Y',
        other => other,
    }
}
