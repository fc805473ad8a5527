use std::{collections::BTreeMap, fmt::Debug};

use serde::{Deserialize, Serialize};

use crate::utils::classes::invert_map;

/// The training objective implied by a label type
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Objective {
    /// Binary logistic regression over a single output
    Logistic,

    /// Multinomial logistic regression (maximum entropy) with one output per class
    MaximumEntropy,
}

impl Objective {
    /// A human readable trainer name
    pub fn trainer_name(&self) -> &'static str {
        match self {
            Objective::Logistic => "logistic regression",
            Objective::MaximumEntropy => "maximum entropy",
        }
    }
}

/// A type that can be used as a classification target
pub trait Label: Clone + Debug + Ord + Send + Sync + 'static {
    /// The objective used to train a classifier for this label
    const OBJECTIVE: Objective;

    /// Parse a label from a raw column value
    fn parse(raw: &str) -> Result<Self, LabelError>;

    /// Assign numeric keys to the labels observed in a training partition
    fn fit_key_map<'a, I>(labels: I) -> KeyMap<Self>
    where
        I: IntoIterator<Item = &'a Self>;

    /// Render the label for console output
    fn display(&self) -> String;
}

impl Label for String {
    const OBJECTIVE: Objective = Objective::MaximumEntropy;

    fn parse(raw: &str) -> Result<Self, LabelError> {
        let value = raw.trim();

        if value.is_empty() {
            return Err(LabelError::Empty);
        }

        Ok(value.to_string())
    }

    /// Keys follow the order in which labels first appear
    fn fit_key_map<'a, I>(labels: I) -> KeyMap<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut keys = BTreeMap::new();

        for label in labels {
            let next = keys.len();
            keys.entry(label.clone()).or_insert(next);
        }

        KeyMap::new(keys)
    }

    fn display(&self) -> String {
        self.clone()
    }
}

impl Label for bool {
    const OBJECTIVE: Objective = Objective::Logistic;

    fn parse(raw: &str) -> Result<Self, LabelError> {
        match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            "" => Err(LabelError::Empty),
            other => Err(LabelError::NotBoolean(other.to_string())),
        }
    }

    /// Keys are fixed so the single logistic output always scores the positive class, but
    /// only observed values are mapped
    fn fit_key_map<'a, I>(labels: I) -> KeyMap<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let keys = labels
            .into_iter()
            .map(|label| (*label, usize::from(*label)))
            .collect();

        KeyMap::new(keys)
    }

    fn display(&self) -> String {
        let name = if *self { "Positive" } else { "Negative" };

        name.to_string()
    }
}

/// A fitted value-to-key mapping and its reverse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap<L: Ord> {
    keys: BTreeMap<L, usize>,
    values: BTreeMap<usize, L>,
}

impl<L: Label> KeyMap<L> {
    /// Build the mapping and its reverse
    pub fn new(keys: BTreeMap<L, usize>) -> Self {
        let values = invert_map(keys.clone());

        Self { keys, values }
    }

    /// Map a label to its key
    pub fn key(&self, label: &L) -> Option<usize> {
        self.keys.get(label).copied()
    }

    /// Map a key back to its label
    pub fn value(&self, key: usize) -> Option<&L> {
        self.values.get(&key)
    }

    /// The number of distinct labels
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no labels were observed
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The number of classifier outputs needed for this mapping
    pub fn n_outputs(&self) -> usize {
        match L::OBJECTIVE {
            Objective::Logistic => 1,
            Objective::MaximumEntropy => self.len(),
        }
    }

    /// Labels ordered by key
    pub fn labels(&self) -> impl Iterator<Item = &L> {
        self.values.values()
    }
}

/// Label Error
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LabelError {
    /// The label column was blank
    #[error("label is empty")]
    Empty,

    /// The value could not be read as a boolean
    #[error("{0:?} is not a boolean label")]
    NotBoolean(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_categorical_keys_follow_first_appearance() {
        let labels: Vec<String> = ["area-System.Net", "area-System.IO", "area-System.Net"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let map = String::fit_key_map(&labels);

        assert_eq!(map.len(), 2);
        assert_eq!(map.key(&"area-System.Net".to_string()), Some(0));
        assert_eq!(map.key(&"area-System.IO".to_string()), Some(1));
        assert_eq!(map.n_outputs(), 2);
    }

    #[test]
    fn test_key_round_trip() {
        let labels: Vec<String> = ["c", "a", "b", "a"].iter().map(|s| s.to_string()).collect();
        let map = String::fit_key_map(&labels);

        for label in &labels {
            let key = map.key(label).unwrap();
            assert_eq!(map.value(key), Some(label));
        }

        assert_eq!(map.value(3), None);
        assert_eq!(map.key(&"d".to_string()), None);
    }

    #[test]
    fn test_boolean_keys_are_fixed() {
        let map = bool::fit_key_map(&[true, false, true]);

        assert_eq!(map.key(&false), Some(0));
        assert_eq!(map.key(&true), Some(1));
        assert_eq!(map.n_outputs(), 1);

        let only_positive = bool::fit_key_map(&[true]);
        assert_eq!(only_positive.len(), 1);
        assert_eq!(only_positive.key(&true), Some(1));
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!(bool::parse("1"), Ok(true));
        assert_eq!(bool::parse(" False "), Ok(false));
        assert_eq!(
            bool::parse("maybe"),
            Err(LabelError::NotBoolean("maybe".to_string()))
        );
        assert_eq!(String::parse("  area-Meta "), Ok("area-Meta".to_string()));
        assert_eq!(String::parse("   "), Err(LabelError::Empty));
    }
}
