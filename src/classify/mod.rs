//! Classification labels and the bridge to external detectors.
//!
//! Neural models are external collaborators: the indexer only knows the
//! [`Classifier`] and [`NsfwDetector`] traits and treats every call as a
//! fallible black box.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::txt;

pub const SOURCE_IMAGE: &str = "image";
pub const SOURCE_LOCATION: &str = "location";
pub const SOURCE_MANUAL: &str = "manual";
pub const SOURCE_META: &str = "meta";

/// A classification result. Uncertainty is 0-100 (lower is more confident),
/// priority ranks salience (negative values are de-emphasized).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub source: String,
    pub uncertainty: i32,
    pub priority: i32,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Label {
    pub fn new(name: &str, source: &str, uncertainty: i32, priority: i32) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            uncertainty,
            priority,
            categories: Vec::new(),
        }
    }

    /// Synthetic label derived from a reverse-geocoded location category.
    pub fn location(name: &str, uncertainty: i32, priority: i32) -> Self {
        Self::new(name, SOURCE_LOCATION, uncertainty, priority)
    }

    /// Keyword candidates contributed by this label.
    pub fn keywords(&self) -> Vec<String> {
        let mut words = txt::keywords(&self.name);
        for category in &self.categories {
            words.extend(txt::keywords(category));
        }
        words
    }
}

/// An ordered collection of labels.
#[derive(Debug, Clone, Default)]
pub struct Labels(pub Vec<Label>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: Label) {
        self.0.push(label);
    }

    pub fn extend(&mut self, labels: Labels) {
        self.0.extend(labels.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn first(&self) -> Option<&Label> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    /// Order by salience: priority descending, then uncertainty ascending.
    /// The sort is stable, so input order breaks remaining ties.
    pub fn sort(&mut self) {
        self.0
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.uncertainty.cmp(&b.uncertainty)));
    }

    pub fn keywords(&self) -> Vec<String> {
        self.0.iter().flat_map(|label| label.keywords()).collect()
    }

    /// Name to use for title synthesis. A usable location name wins over
    /// labels; otherwise the most salient confident label is chosen. Empty
    /// when neither qualifies.
    pub fn best_title<'a>(&'a self, location_name: &'a str) -> &'a str {
        if !location_name.is_empty() && location_name.chars().count() <= 25 {
            return location_name;
        }

        match self.first() {
            Some(label)
                if label.priority >= -1 && label.uncertainty <= 60 && !label.name.is_empty() =>
            {
                &label.name
            }
            _ => "",
        }
    }
}

/// Image classification model: returns labels for one image file.
pub trait Classifier: Send + Sync {
    fn file(&self, path: &Path) -> Result<Vec<Label>>;
}

/// Offensive-content detector.
pub trait NsfwDetector: Send + Sync {
    fn file(&self, path: &Path) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_stable_by_priority_then_uncertainty() {
        let mut labels = Labels(vec![
            Label::new("third", SOURCE_IMAGE, 50, -1),
            Label::new("second", SOURCE_IMAGE, 30, 0),
            Label::new("first", SOURCE_IMAGE, 10, 0),
            Label::new("tied", SOURCE_IMAGE, 10, 0),
        ]);
        labels.sort();

        let names: Vec<_> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["first", "tied", "second", "third"]);
    }

    #[test]
    fn test_best_title_prefers_location_name() {
        let labels = Labels(vec![Label::new("dog", SOURCE_IMAGE, 10, 0)]);
        assert_eq!(labels.best_title("Marienplatz"), "Marienplatz");

        // Without a usable location name the confident label wins.
        assert_eq!(labels.best_title(""), "dog");

        // Uncertain labels never make a title.
        let labels = Labels(vec![Label::new("dog", SOURCE_IMAGE, 90, 0)]);
        assert_eq!(labels.best_title(""), "");
    }

    #[test]
    fn test_label_keywords_include_categories() {
        let mut label = Label::new("Golden Retriever", SOURCE_IMAGE, 10, 0);
        label.categories.push("dog".to_string());
        label.categories.push("animal".to_string());
        assert_eq!(label.keywords(), vec!["golden", "retriever", "dog", "animal"]);
    }
}
