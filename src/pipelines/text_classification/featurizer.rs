use std::collections::{BTreeMap, HashMap, HashSet};

use unicode_segmentation::UnicodeSegmentation;

use crate::datasets::{schema::TextField, TextInput};

const START_OF_TEXT: char = '\u{2}';
const END_OF_TEXT: char = '\u{3}';

/// Options for turning free text into an n-gram count vector
#[derive(burn::config::Config, Debug, PartialEq)]
pub struct TextFeaturizerConfig {
    /// Lowercase text before extracting terms
    #[config(default = true)]
    pub lowercase: bool,

    /// Longest word n-gram to extract (0 disables word n-grams)
    #[config(default = 2)]
    pub word_ngram_length: usize,

    /// Character n-gram length (0 disables character n-grams)
    #[config(default = 3)]
    pub char_ngram_length: usize,

    /// Maximum number of terms kept in the vocabulary
    #[config(default = 16384)]
    pub max_terms: usize,

    /// Minimum number of training documents a term must appear in
    #[config(default = 1)]
    pub min_document_frequency: usize,
}

/// A sparse feature vector with strictly increasing indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    /// Non-zero positions
    pub indices: Vec<usize>,

    /// Values at those positions
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Write the vector into a dense row
    pub fn scatter_into(&self, row: &mut [f32]) {
        for (&index, &value) in self.indices.iter().zip(&self.values) {
            row[index] = value;
        }
    }

    /// Euclidean norm
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

/// A featurizer fitted on the training texts of one column
#[derive(Debug, Clone)]
pub struct TextFeaturizer {
    config: TextFeaturizerConfig,
    vocabulary: HashMap<String, usize>,
}

impl TextFeaturizer {
    /// Build the vocabulary from training documents
    pub fn fit<'a, I>(config: &TextFeaturizerConfig, documents: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for document in documents {
            let unique: HashSet<String> = terms(config, document).into_iter().collect();

            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let mut candidates: Vec<(String, usize)> = document_frequency
            .into_iter()
            .filter(|(_, count)| *count >= config.min_document_frequency)
            .collect();

        // Most frequent first, ties broken by the term itself
        candidates.sort_by(|(a, a_count), (b, b_count)| b_count.cmp(a_count).then(a.cmp(b)));
        candidates.truncate(config.max_terms);

        let mut kept: Vec<String> = candidates.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term, index))
            .collect();

        Self {
            config: config.clone(),
            vocabulary,
        }
    }

    /// The length of the vectors this featurizer produces
    pub fn dim(&self) -> usize {
        self.vocabulary.len()
    }

    /// Count known terms and L2-normalize the counts
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();

        for term in terms(&self.config, document) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let norm = counts.values().map(|c| c * c).sum::<f32>().sqrt();

        let (indices, values) = counts
            .into_iter()
            .map(|(index, count)| (index, if norm > 0.0 { count / norm } else { 0.0 }))
            .unzip();

        SparseVector { indices, values }
    }
}

/// Extract word n-gram and character n-gram terms from a document
fn terms(config: &TextFeaturizerConfig, document: &str) -> Vec<String> {
    let text = if config.lowercase {
        document.to_lowercase()
    } else {
        document.to_string()
    };

    let mut terms = Vec::new();

    let words: Vec<&str> = text.unicode_words().collect();
    for n in 1..=config.word_ngram_length {
        for gram in words.windows(n) {
            terms.push(format!("w:{}", gram.join("|")));
        }
    }

    if config.char_ngram_length > 0 {
        let normalized = words.join(" ");
        let chars: Vec<char> = std::iter::once(START_OF_TEXT)
            .chain(normalized.chars())
            .chain(std::iter::once(END_OF_TEXT))
            .collect();

        for gram in chars.windows(config.char_ngram_length) {
            terms.push(format!("c:{}", gram.iter().collect::<String>()));
        }
    }

    terms
}

/// Featurizers bound to text fields, concatenated into one feature vector
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    columns: Vec<(TextField, TextFeaturizer, usize)>,
    dim: usize,
}

impl FeatureSpace {
    /// Fit each featurizer on its field of the training inputs
    pub fn fit<'a, I>(steps: &[(TextField, TextFeaturizerConfig)], inputs: I) -> Self
    where
        I: IntoIterator<Item = &'a TextInput> + Clone,
    {
        let mut columns = Vec::with_capacity(steps.len());
        let mut offset = 0;

        for (field, config) in steps {
            let documents = inputs
                .clone()
                .into_iter()
                .map(|input| input.field(field.position).unwrap_or_default());

            let featurizer = TextFeaturizer::fit(config, documents);

            log::debug!("Featurized {} into {} terms", field, featurizer.dim());

            let dim = featurizer.dim();
            columns.push((field.clone(), featurizer, offset));
            offset += dim;
        }

        Self {
            columns,
            dim: offset,
        }
    }

    /// The length of the concatenated feature vector
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The number of text fields an input must carry
    pub fn n_fields(&self) -> usize {
        self.columns
            .iter()
            .map(|(field, _, _)| field.position + 1)
            .max()
            .unwrap_or(0)
    }

    /// Featurize every bound field and concatenate the results
    pub fn transform(&self, input: &TextInput) -> SparseVector {
        let mut features = SparseVector::default();

        for (field, featurizer, offset) in &self.columns {
            let column = featurizer.transform(input.field(field.position).unwrap_or_default());

            features
                .indices
                .extend(column.indices.into_iter().map(|i| i + offset));
            features.values.extend(column.values);
        }

        features
    }
}
