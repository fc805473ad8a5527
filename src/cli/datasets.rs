use std::fmt::Display;

use crate::datasets::{
    github_issues::GithubIssues, mark_diagnosis::MarkDiagnosis, sentiment::Sentiment, Task,
};

/// The Dataset enum
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Dataset {
    /// GitHub issue area classification
    GithubIssues,

    /// Medical record page diagnosis detection
    MarkDiagnosis,

    /// Restaurant review sentiment
    Sentiment,
}

impl Dataset {
    /// All available datasets
    pub const ALL: [Dataset; 3] = [
        Dataset::GithubIssues,
        Dataset::MarkDiagnosis,
        Dataset::Sentiment,
    ];

    /// Get the unique string token that identifies this dataset
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::GithubIssues => GithubIssues::NAME,
            Dataset::MarkDiagnosis => MarkDiagnosis::NAME,
            Dataset::Sentiment => Sentiment::NAME,
        }
    }
}

impl TryFrom<&str> for Dataset {
    type Error = DatasetError;

    /// Try to convert a string to a Dataset
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let token = value.to_lowercase();

        Dataset::ALL
            .into_iter()
            .find(|dataset| dataset.as_str() == token)
            .ok_or_else(|| Self::Error::Unknown(value.to_string()))
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// No dataset found for the given string
    #[error("no dataset found for {0}")]
    Unknown(String),
}
