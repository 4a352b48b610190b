use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::manifest::Item;

fn dashed_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_]v?\d+(\.\d+)*$").expect("invalid version suffix regex"))
}

fn dotted_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\.\d+)+$").expect("invalid dotted version regex"))
}

/// Candidate id for a filename: extension and trailing version removed,
/// lowercased, spaces and hyphens turned into underscores.
///
/// `de-Base_v2.dict` becomes `de_base`, `colemak.3.1.json` becomes `colemak`.
pub fn derive_id(filename: &str, extension: &str) -> String {
    let stem = filename.strip_suffix(extension).unwrap_or(filename);
    let stem = dashed_version_regex().replace(stem, "");
    let stem = dotted_version_regex().replace(&stem, "");
    stem.to_lowercase().replace([' ', '-'], "_")
}

/// Display name fallback: `de_base` becomes `De Base`.
pub fn readable_name(id: &str) -> String {
    id.split('_').map(capitalize).collect::<Vec<_>>().join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Maps incoming filenames to stable ids against an immutable snapshot of the
/// previous manifest, handing out each id at most once per run.
pub struct IdResolver<'a> {
    extension: &'a str,
    items: &'a [Item],
    by_id: HashMap<&'a str, &'a Item>,
    id_by_filename: HashMap<&'a str, &'a str>,
    claimed: HashSet<String>,
}

impl<'a> IdResolver<'a> {
    pub fn new(extension: &'a str, items: &'a [Item]) -> Self {
        let mut by_id = HashMap::new();
        let mut id_by_filename = HashMap::new();
        for item in items {
            by_id.insert(item.id(), item);
            if let Some(filename) = item.filename() {
                id_by_filename.insert(filename, item.id());
            }
        }

        Self {
            extension,
            items,
            by_id,
            id_by_filename,
            claimed: HashSet::new(),
        }
    }

    /// Resolve and claim the id for `filename`.
    pub fn resolve(&mut self, filename: &str) -> String {
        let target = self.link(filename);
        let id = self.disambiguate(&target, filename);
        self.claimed.insert(id.clone());
        id
    }

    /// The previous manifest's item carrying `id`, if any.
    pub fn previous(&self, id: &str) -> Option<&'a Item> {
        self.by_id.get(id).copied()
    }

    /// Id the asset should carry before uniqueness is enforced.
    fn link(&self, filename: &str) -> String {
        let derived = derive_id(filename, self.extension);

        if self.by_id.contains_key(derived.as_str()) {
            return derived;
        }

        if let Some(id) = self.id_by_filename.get(filename) {
            return id.to_string();
        }

        // Renamed asset whose previous filename derives to the same id.
        let renamed_from =
            |item: &&Item| item.filename().is_some_and(|f| derive_id(f, self.extension) == derived);
        if let Some(item) = self.items.iter().find(renamed_from) {
            return item.id().to_string();
        }

        derived
    }

    /// Append `_1`, `_2`, ... while the id is taken in this run or belongs to
    /// a different asset in the previous manifest.
    fn disambiguate(&self, target: &str, filename: &str) -> String {
        let mut candidate = target.to_string();
        let mut counter = 1;
        while self.is_taken(&candidate, target, filename) {
            candidate = format!("{target}_{counter}");
            counter += 1;
        }
        candidate
    }

    fn is_taken(&self, candidate: &str, target: &str, filename: &str) -> bool {
        if self.claimed.contains(candidate) {
            return true;
        }
        if candidate == target {
            return false;
        }
        self.by_id
            .get(candidate)
            .is_some_and(|item| item.filename() != Some(filename))
    }
}
