/// Fallback category for anything the oracle could not place.
pub const OTHER_CATEGORY: &str = "Other";

/// Upper bound on tags carried by a classification.
pub const MAX_TAGS: usize = 5;

/// The closed set of categories a classification may resolve to.
///
/// Order is preserved; it is the order presented to the oracle and the order
/// used when scanning free text for a category name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    names: Vec<String>,
}

impl CategorySet {
    /// Builds a set from configured names, dropping blanks, duplicates, and
    /// any explicit `Other` (which is always implied).
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into().trim().to_string();
            if name.is_empty() || name == OTHER_CATEGORY || out.contains(&name) {
                continue;
            }
            out.push(name);
        }
        Self { names: out }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Maps a candidate category onto the set; anything unknown becomes `Other`.
    pub fn resolve(&self, candidate: &str) -> String {
        let trimmed = candidate.trim();
        if self.contains(trimmed) {
            trimmed.to_string()
        } else {
            OTHER_CATEGORY.to_string()
        }
    }

    /// Returns the category whose name occurs earliest in `text`.
    ///
    /// Ties at the same offset go to the longer name.
    pub fn find_in_text(&self, text: &str) -> Option<&str> {
        self.names
            .iter()
            .filter_map(|name| text.find(name.as_str()).map(|pos| (pos, name)))
            .min_by(|(pa, a), (pb, b)| pa.cmp(pb).then(b.len().cmp(&a.len())))
            .map(|(_, name)| name.as_str())
    }

    /// All folder names a run may create: every category plus `Other`.
    pub fn folder_names(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(OTHER_CATEGORY))
    }
}

/// A well-typed classification: category from the closed set or `Other`,
/// and at most [`MAX_TAGS`] tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    category: String,
    tags: Vec<String>,
}

impl ClassificationResult {
    /// Validates `category` against `set` and bounds `tags`.
    pub fn new(set: &CategorySet, category: &str, tags: Vec<String>) -> Self {
        Self {
            category: set.resolve(category),
            tags: clean_tags(tags),
        }
    }

    /// The `Other/[]` result used whenever classification degrades.
    pub fn other() -> Self {
        Self {
            category: OTHER_CATEGORY.to_string(),
            tags: Vec::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(MAX_TAGS);
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}
