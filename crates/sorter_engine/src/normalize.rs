use std::collections::BTreeMap;

use sorter_core::MAX_TAGS;

/// Maps free-form oracle keywords onto a controlled vocabulary.
pub trait TagNormalizer: Send + Sync {
    fn normalize(&self, tags: &[String], category: &str) -> Vec<String>;
}

/// Per-category vocabulary with exact, alias, and fuzzy matching.
///
/// Categories without a vocabulary keep their tags verbatim (deduped and bounded).
#[derive(Debug, Clone, Default)]
pub struct VocabularyNormalizer {
    vocabulary: BTreeMap<String, Vec<String>>,
    aliases: BTreeMap<String, String>,
}

impl VocabularyNormalizer {
    pub fn new(
        vocabulary: BTreeMap<String, Vec<String>>,
        aliases: BTreeMap<String, String>,
    ) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(alias, canonical)| (alias.trim().to_lowercase(), canonical))
            .collect();
        Self {
            vocabulary,
            aliases,
        }
    }

    fn match_tag<'a>(&'a self, tag: &str, vocab: &'a [String]) -> Option<&'a str> {
        let lowered = tag.to_lowercase();

        if let Some(exact) = vocab.iter().find(|v| v.to_lowercase() == lowered) {
            return Some(exact.as_str());
        }

        if let Some(canonical) = self.aliases.get(&lowered) {
            if let Some(hit) = vocab.iter().find(|v| *v == canonical) {
                return Some(hit.as_str());
            }
        }

        // Fuzzy: one side contains the other; the longest entry is the most specific.
        vocab
            .iter()
            .filter(|v| {
                let v = v.to_lowercase();
                lowered.contains(&v) || v.contains(&lowered)
            })
            .max_by_key(|v| v.chars().count())
            .map(String::as_str)
    }
}

impl TagNormalizer for VocabularyNormalizer {
    fn normalize(&self, tags: &[String], category: &str) -> Vec<String> {
        let vocab = self.vocabulary.get(category).filter(|v| !v.is_empty());
        let mut out: Vec<String> = Vec::with_capacity(MAX_TAGS);
        for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            let mapped = match vocab {
                Some(vocab) => match self.match_tag(tag, vocab) {
                    Some(hit) => hit.to_string(),
                    None => continue,
                },
                None => self
                    .aliases
                    .get(&tag.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| tag.to_string()),
            };
            if !out.contains(&mapped) {
                out.push(mapped);
            }
            if out.len() == MAX_TAGS {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> VocabularyNormalizer {
        let vocabulary = BTreeMap::from([(
            "专业技术".to_string(),
            vec![
                "编程".to_string(),
                "机器学习".to_string(),
                "算法".to_string(),
                "Rust".to_string(),
            ],
        )]);
        let aliases = BTreeMap::from([
            ("ml".to_string(), "机器学习".to_string()),
            ("coding".to_string(), "编程".to_string()),
        ]);
        VocabularyNormalizer::new(vocabulary, aliases)
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn exact_alias_and_fuzzy_matches() {
        let out = normalizer().normalize(&tags(&["rust", "ML", "机器学习算法", "烹饪"]), "专业技术");
        assert_eq!(out, tags(&["Rust", "机器学习"]));
    }

    #[test]
    fn categories_without_vocabulary_keep_tags() {
        let out = normalizer().normalize(&tags(&["a", "coding", "a", " "]), "自然科学");
        assert_eq!(out, tags(&["a", "编程"]));
    }

    #[test]
    fn output_is_bounded() {
        let out = VocabularyNormalizer::default()
            .normalize(&tags(&["1", "2", "3", "4", "5", "6"]), "x");
        assert_eq!(out.len(), MAX_TAGS);
    }
}
