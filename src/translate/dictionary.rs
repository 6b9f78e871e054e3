//! Offline phrase dictionary used when the translation endpoint fails.

use std::collections::HashMap;

/// Static phrase pairs keyed by source language.
///
/// Lookups are exact matches on the trimmed, lower-cased input.
#[derive(Debug, Clone, Default)]
pub struct PhraseDictionary {
    by_source: HashMap<String, HashMap<String, String>>,
}

/// Agricultural phrases, English → Giriama.
const EN_GIR: [(&str, &str); 8] = [
    ("irrigation system", "mfumo wa kunyunyizia"),
    ("crop rotation", "kubadilisha mimea"),
    ("sustainable farming", "kilimo endelevu"),
    ("soil fertility", "rutuba ya udongo"),
    ("harvest season", "majira ya mavuno"),
    ("drought resistant seeds", "mbegu zinazostahimili ukame"),
    ("organic fertilizer", "mbolea ya asili"),
    ("pest management", "kudhibiti wadudu"),
];

impl PhraseDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in English/Giriama farming vocabulary, in both directions.
    pub fn builtin() -> Self {
        let mut dict = Self::new();
        for (en, gir) in EN_GIR {
            dict.insert("en", en, gir);
            dict.insert("gir", gir, en);
        }
        dict
    }

    pub fn insert(&mut self, source: &str, phrase: &str, translation: &str) {
        self.by_source
            .entry(source.to_ascii_lowercase())
            .or_default()
            .insert(normalise(phrase), translation.to_string());
    }

    /// Translation of `text` from `source`, if the phrase is known.
    pub fn lookup(&self, source: &str, text: &str) -> Option<&str> {
        self.by_source
            .get(&source.to_ascii_lowercase())?
            .get(&normalise(text))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_source.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalise(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}
