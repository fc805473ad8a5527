use std::path::Path;

use crate::pipelines::text_classification::{Pipeline, PipelineError, TextFeaturizerConfig};

use super::{Schema, Source, Task, TextInput};

/// Detect whether a medical record page mentions a diagnosis
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkDiagnosis;

impl Task for MarkDiagnosis {
    type Label = bool;

    const NAME: &'static str = "mark-diagnosis";

    fn schema(&self) -> Schema {
        Schema::new().text(0, "PageText").label(1, "DiagnosisExists")
    }

    fn source(&self, data_dir: &Path) -> Source {
        Source::Split {
            path: data_dir.join("APS_Pages.txt"),
            test_fraction: 0.2,
        }
    }

    fn pipeline(&self, schema: &Schema) -> Result<Pipeline<bool>, PipelineError> {
        Ok(Pipeline::new().featurize_text(
            schema.text_field("PageText")?,
            TextFeaturizerConfig::new(),
        ))
    }

    fn samples(&self) -> Vec<TextInput> {
        vec![
            TextInput::from("Assessment: type 2 diabetes mellitus without complications"),
            TextInput::from("Patient was seen for a routine follow up visit"),
        ]
    }
}
