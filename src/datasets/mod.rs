use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use burn::data::dataset::{self, Dataset as _, InMemDataset};
use derive_new::new;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::pipelines::text_classification::{
    evaluation::Evaluate, Label, Pipeline, PipelineError,
};

/// Column schemas
pub mod schema;

/// Delimited text loading
pub mod loader;

/// GitHub issue area classification (multiclass)
pub mod github_issues;

/// Medical record page diagnosis detection (binary)
pub mod mark_diagnosis;

/// Restaurant review sentiment (binary)
pub mod sentiment;

pub use loader::{load_from_text_file, DatasetError};
pub use schema::{Schema, SchemaError, TextField};

/// The free-text fields of one row, in schema order
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
pub struct TextInput {
    /// Text values, one per text column
    pub fields: Vec<String>,
}

impl TextInput {
    /// The text at a field position
    pub fn field(&self, position: usize) -> Option<&str> {
        self.fields.get(position).map(String::as_str)
    }

    /// The number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the input carries no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<&str> for TextInput {
    fn from(text: &str) -> Self {
        Self::new(vec![text.to_string()])
    }
}

impl From<Vec<String>> for TextInput {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl Display for TextInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fields.join(" | "))
    }
}

/// A labeled row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct Example<L> {
    /// The row identifier, when the schema declares one
    pub id: Option<String>,

    /// The training target
    pub label: L,

    /// The text fields
    pub text: TextInput,
}

/// An in-memory dataset of labeled rows
pub struct TextDataset<L: Label> {
    dataset: InMemDataset<Example<L>>,
}

impl<L: Label> dataset::Dataset<Example<L>> for TextDataset<L> {
    fn get(&self, index: usize) -> Option<Example<L>> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl<L: Label> TextDataset<L> {
    /// Wrap already-loaded rows
    pub fn new(items: Vec<Example<L>>) -> Self {
        Self {
            dataset: InMemDataset::new(items),
        }
    }

    /// Iterate over rows in order
    pub fn examples(&self) -> impl Iterator<Item = Example<L>> + '_ {
        self.dataset.iter()
    }

    /// Split into disjoint train and test partitions.
    ///
    /// Row indices are shuffled with a seeded generator and the first `round(len * test_fraction)`
    /// shuffled rows form the test partition; both partitions keep the original row order.
    pub fn train_test_split(
        &self,
        test_fraction: f64,
        seed: u64,
    ) -> Result<TrainTestData<L>, DatasetError> {
        if !(0.0..=1.0).contains(&test_fraction) {
            return Err(DatasetError::TestFraction(test_fraction));
        }

        let total = self.len();
        let test_len = (total as f64 * test_fraction).round() as usize;

        let mut indices: Vec<usize> = (0..total).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));

        let mut in_test = vec![false; total];
        for &index in &indices[..test_len] {
            in_test[index] = true;
        }

        let (test, train): (Vec<_>, Vec<_>) = self
            .examples()
            .zip(in_test)
            .partition(|(_, is_test)| *is_test);

        let strip = |rows: Vec<(Example<L>, bool)>| -> Vec<Example<L>> {
            rows.into_iter().map(|(row, _)| row).collect()
        };

        Ok(TrainTestData {
            train: TextDataset::new(strip(train)),
            test: TextDataset::new(strip(test)),
        })
    }
}

/// A train partition and a held-out test partition
pub struct TrainTestData<L: Label> {
    /// Rows used for fitting
    pub train: TextDataset<L>,

    /// Rows used for evaluation
    pub test: TextDataset<L>,
}

/// Where a task's rows come from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// One file, split at load time
    Split {
        /// The dataset file
        path: PathBuf,

        /// Fraction of rows held out for testing
        test_fraction: f64,
    },

    /// Pre-split train and test files
    Separate {
        /// The training file
        train: PathBuf,

        /// The test file
        test: PathBuf,
    },
}

impl Source {
    /// Load and, if needed, split the rows
    pub fn load<L: Label>(&self, schema: &Schema, seed: u64) -> Result<TrainTestData<L>, DatasetError> {
        match self {
            Source::Split {
                path,
                test_fraction,
            } => load_from_text_file(path, schema)?.train_test_split(*test_fraction, seed),
            Source::Separate { train, test } => Ok(TrainTestData {
                train: load_from_text_file(train, schema)?,
                test: load_from_text_file(test, schema)?,
            }),
        }
    }
}

/// A classification task: the files, schema and pipeline declaration for one dataset
pub trait Task {
    /// The label type predicted by this task
    type Label: Label + Evaluate;

    /// The unique string token that identifies this task
    const NAME: &'static str;

    /// The column layout of the task's files
    fn schema(&self) -> Schema;

    /// The task's files, relative to a data directory
    fn source(&self, data_dir: &Path) -> Source;

    /// The featurization steps for this task
    fn pipeline(&self, schema: &Schema) -> Result<Pipeline<Self::Label>, PipelineError>;

    /// Ad hoc inputs to predict after training
    fn samples(&self) -> Vec<TextInput>;
}
