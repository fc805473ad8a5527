use std::path::Path;

use crate::pipelines::text_classification::{Pipeline, PipelineError, TextFeaturizerConfig};

use super::{Schema, Source, Task, TextInput};

/// Classify GitHub issues into repository areas from their title and description
#[derive(Debug, Clone, Copy, Default)]
pub struct GithubIssues;

impl Task for GithubIssues {
    type Label = String;

    const NAME: &'static str = "github-issues";

    fn schema(&self) -> Schema {
        Schema::new()
            .id(0, "ID")
            .label(1, "Area")
            .text(2, "Title")
            .text(3, "Description")
            .with_header(true)
    }

    fn source(&self, data_dir: &Path) -> Source {
        Source::Separate {
            train: data_dir.join("issues_train.tsv"),
            test: data_dir.join("issues_test.tsv"),
        }
    }

    fn pipeline(&self, schema: &Schema) -> Result<Pipeline<String>, PipelineError> {
        Ok(Pipeline::new()
            .featurize_text(schema.text_field("Title")?, TextFeaturizerConfig::new())
            .featurize_text(schema.text_field("Description")?, TextFeaturizerConfig::new())
            .append_cache_checkpoint())
    }

    fn samples(&self) -> Vec<TextInput> {
        vec![TextInput::new(vec![
            "WebSockets communication is slow in my machine".to_string(),
            "The WebSockets communication used under the covers by SignalR looks like is going \
             slow in my development machine.."
                .to_string(),
        ])]
    }
}
