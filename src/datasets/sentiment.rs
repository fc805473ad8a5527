use std::path::Path;

use crate::pipelines::text_classification::{Pipeline, PipelineError, TextFeaturizerConfig};

use super::{Schema, Source, Task, TextInput};

/// Classify restaurant reviews as positive or negative
#[derive(Debug, Clone, Copy, Default)]
pub struct Sentiment;

impl Task for Sentiment {
    type Label = bool;

    const NAME: &'static str = "sentiment";

    fn schema(&self) -> Schema {
        Schema::new().text(0, "SentimentText").label(1, "Sentiment")
    }

    fn source(&self, data_dir: &Path) -> Source {
        Source::Split {
            path: data_dir.join("yelp_labelled.txt"),
            test_fraction: 0.2,
        }
    }

    fn pipeline(&self, schema: &Schema) -> Result<Pipeline<bool>, PipelineError> {
        Ok(Pipeline::new().featurize_text(
            schema.text_field("SentimentText")?,
            TextFeaturizerConfig::new(),
        ))
    }

    fn samples(&self) -> Vec<TextInput> {
        vec![
            TextInput::from("This was a very bad steak"),
            TextInput::from("This was a horrible meal"),
            TextInput::from("I love this spaghetti."),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_source_holds_out_a_fifth() {
        assert_eq!(
            Sentiment.source(Path::new("data")),
            Source::Split {
                path: PathBuf::from("data/yelp_labelled.txt"),
                test_fraction: 0.2,
            }
        );
    }

    #[test]
    fn test_unknown_text_field_is_rejected() {
        let schema = Schema::new().text(0, "Review").label(1, "Sentiment");

        assert!(matches!(
            Sentiment.pipeline(&schema),
            Err(PipelineError::Schema(_))
        ));
    }
}
