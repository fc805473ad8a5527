use std::{
    fs::File,
    path::{Path, PathBuf},
};

use crate::pipelines::text_classification::{labels::LabelError, Label};

use super::{
    schema::{Schema, SchemaError},
    Example, TextDataset, TextInput,
};

/// Load a delimited text file into a dataset using a positional column schema
pub fn load_from_text_file<L: Label>(
    path: impl AsRef<Path>,
    schema: &Schema,
) -> Result<TextDataset<L>, DatasetError> {
    let path = path.as_ref();

    let label_column = schema.label_column()?.index;
    let id_column = schema.id_column().map(|c| c.index);
    let text_columns: Vec<usize> = schema.text_columns().map(|c| c.index).collect();
    let width = schema.width();

    let separator = u8::try_from(schema.separator)
        .map_err(|_| DatasetError::Separator(schema.separator))?;

    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(schema.has_header)
        .quoting(schema.allow_quoting)
        .flexible(true)
        .from_reader(file);

    let mut examples = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|source| DatasetError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let line = record.position().map(|p| p.line()).unwrap_or_default();

        if record.len() != width {
            return Err(DatasetError::ColumnCount {
                path: path.to_path_buf(),
                line,
                expected: width,
                found: record.len(),
            });
        }

        let label = L::parse(&record[label_column]).map_err(|source| DatasetError::Label {
            path: path.to_path_buf(),
            line,
            source,
        })?;

        let id = id_column.map(|index| record[index].to_string());

        let fields = text_columns
            .iter()
            .map(|&index| record[index].to_string())
            .collect();

        examples.push(Example::new(id, label, TextInput::new(fields)));
    }

    log::info!(
        "Loaded {} rows from {} ({} text column(s): {})",
        examples.len(),
        path.display(),
        text_columns.len(),
        schema.text_names().join(", ")
    );

    Ok(TextDataset::new(examples))
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// The file could not be opened
    #[error("unable to read {}: {source}", path.display())]
    Io {
        /// The dataset file
        path: PathBuf,

        /// The underlying error
        source: std::io::Error,
    },

    /// The file could not be parsed as delimited text
    #[error("malformed dataset {}: {source}", path.display())]
    Csv {
        /// The dataset file
        path: PathBuf,

        /// The underlying error
        source: csv::Error,
    },

    /// A row has the wrong number of columns
    #[error("{}:{line}: expected {expected} columns, found {found}", path.display())]
    ColumnCount {
        /// The dataset file
        path: PathBuf,

        /// One-based line number
        line: u64,

        /// Columns declared by the schema
        expected: usize,

        /// Columns present in the row
        found: usize,
    },

    /// A label value could not be parsed
    #[error("{}:{line}: {source}", path.display())]
    Label {
        /// The dataset file
        path: PathBuf,

        /// One-based line number
        line: u64,

        /// The underlying error
        source: LabelError,
    },

    /// The schema cannot be used for loading
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The separator does not fit in one byte
    #[error("separator {0:?} is not a single-byte character")]
    Separator(char),

    /// The test fraction is not a proportion
    #[error("test fraction {0} is outside [0, 1]")]
    TestFraction(f64),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use burn::data::dataset::Dataset as _;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn issues() -> Schema {
        Schema::new()
            .id(0, "ID")
            .label(1, "Area")
            .text(2, "Title")
            .text(3, "Description")
            .with_header(true)
    }

    #[test]
    fn test_load_multiclass_with_header() {
        let file = write(
            "ID\tArea\tTitle\tDescription\n\
             1\tarea-System.Net\tSocket closed\tThe \"socket\" closes early\n\
             2\tarea-System.IO\tFile locked\tCannot delete file\n",
        );

        let dataset = load_from_text_file::<String>(file.path(), &issues()).unwrap();

        assert_eq!(dataset.len(), 2);

        let first = dataset.get(0).unwrap();
        assert_eq!(first.id.as_deref(), Some("1"));
        assert_eq!(first.label, "area-System.Net");
        assert_eq!(
            first.text.fields,
            vec![
                "Socket closed".to_string(),
                "The \"socket\" closes early".to_string()
            ]
        );
    }

    #[test]
    fn test_load_binary_without_header() {
        let file = write("Wow... Loved this place.\t1\nCrust is not good.\t0\n\n");
        let schema = Schema::new().text(0, "SentimentText").label(1, "Sentiment");

        let dataset = load_from_text_file::<bool>(file.path(), &schema).unwrap();

        let labels: Vec<bool> = dataset.examples().map(|row| row.label).collect();
        assert_eq!(labels, vec![true, false]);
        assert_eq!(dataset.get(1).unwrap().id, None);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let schema = Schema::new().text(0, "Text").label(1, "Label");

        let result = load_from_text_file::<bool>("does/not/exist.tsv", &schema);

        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }

    #[test]
    fn test_column_count_mismatch_is_an_error() {
        let file = write("good\t1\nbad\n");
        let schema = Schema::new().text(0, "Text").label(1, "Label");

        match load_from_text_file::<bool>(file.path(), &schema) {
            Err(DatasetError::ColumnCount {
                line,
                expected,
                found,
                ..
            }) => {
                assert_eq!(line, 2);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected a column count error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_whitespace_row_is_an_error() {
        let schema = Schema::new().text(0, "Text").label(1, "Label");

        let file = write("good\t1\n  \t \nbad\t0\n");
        let result = load_from_text_file::<bool>(file.path(), &schema);

        assert!(matches!(
            result,
            Err(DatasetError::Label {
                line: 2,
                source: LabelError::Empty,
                ..
            })
        ));

        let file = write("good\t1\n   \nbad\t0\n");
        let result = load_from_text_file::<bool>(file.path(), &schema);

        assert!(matches!(
            result,
            Err(DatasetError::ColumnCount {
                line: 2,
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_label_type_mismatch_is_an_error() {
        let file = write("good\tpositive\n");
        let schema = Schema::new().text(0, "Text").label(1, "Label");

        let result = load_from_text_file::<bool>(file.path(), &schema);

        assert!(matches!(
            result,
            Err(DatasetError::Label {
                line: 1,
                source: LabelError::NotBoolean(_),
                ..
            })
        ));
    }

    #[test]
    fn test_schema_without_label_is_an_error() {
        let file = write("good\n");
        let schema = Schema::new().text(0, "Text");

        let result = load_from_text_file::<bool>(file.path(), &schema);

        assert!(matches!(
            result,
            Err(DatasetError::Schema(SchemaError::MissingLabel))
        ));
    }
}
