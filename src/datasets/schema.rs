use std::fmt::Display;

use derive_new::new;
use serde::{Deserialize, Serialize};

/// The role a column plays when a row is loaded
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// An optional row identifier, carried through but never featurized
    Id,

    /// The training target
    Label,

    /// A free-text column to be featurized
    Text,
}

/// A positional column binding
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, new)]
pub struct Column {
    /// Zero-based position of the column within a row
    pub index: usize,

    /// Display name of the column
    pub name: String,

    /// What the column is used for
    pub kind: ColumnKind,
}

/// A typed binding to one text column, resolved against a [`Schema`] at declaration time
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TextField {
    /// Position of the field within [`TextInput::fields`](super::TextInput)
    pub position: usize,

    /// The column name, for display
    pub name: String,
}

impl Display for TextField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The column layout of a delimited dataset file
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Column bindings, in declaration order
    pub columns: Vec<Column>,

    /// Whether the first line of the file is a header to skip
    pub has_header: bool,

    /// The column separator
    pub separator: char,

    /// Whether double quotes delimit fields
    pub allow_quoting: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            has_header: false,
            separator: '\t',
            allow_quoting: false,
        }
    }
}

impl Schema {
    /// An empty tab-separated schema without a header
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an identifier column
    pub fn id(self, index: usize, name: &str) -> Self {
        self.column(index, name, ColumnKind::Id)
    }

    /// Bind the label column
    pub fn label(self, index: usize, name: &str) -> Self {
        self.column(index, name, ColumnKind::Label)
    }

    /// Bind a free-text column
    pub fn text(self, index: usize, name: &str) -> Self {
        self.column(index, name, ColumnKind::Text)
    }

    /// Set whether the first line is a header
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set the column separator
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Set whether double quotes delimit fields
    pub fn with_quoting(mut self, allow_quoting: bool) -> Self {
        self.allow_quoting = allow_quoting;
        self
    }

    fn column(mut self, index: usize, name: &str, kind: ColumnKind) -> Self {
        self.columns.push(Column::new(index, name.to_string(), kind));
        self
    }

    /// The number of columns every row must carry
    pub fn width(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.index + 1)
            .max()
            .unwrap_or(0)
    }

    /// The id column, if one is declared
    pub fn id_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.kind == ColumnKind::Id)
    }

    /// The single label column
    pub fn label_column(&self) -> Result<&Column, SchemaError> {
        let mut labels = self.columns.iter().filter(|c| c.kind == ColumnKind::Label);

        match (labels.next(), labels.next()) {
            (Some(column), None) => Ok(column),
            (None, _) => Err(SchemaError::MissingLabel),
            (Some(_), Some(_)) => Err(SchemaError::MultipleLabels),
        }
    }

    /// Text columns, in the order their values appear in a [`TextInput`](super::TextInput)
    pub fn text_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.kind == ColumnKind::Text)
    }

    /// Names of the text columns
    pub fn text_names(&self) -> Vec<String> {
        self.text_columns().map(|c| c.name.clone()).collect()
    }

    /// Resolve a text column by name
    pub fn text_field(&self, name: &str) -> Result<TextField, SchemaError> {
        if let Some(column) = self.columns.iter().find(|c| c.name == name) {
            if column.kind != ColumnKind::Text {
                return Err(SchemaError::NotText(name.to_string()));
            }
        }

        self.text_columns()
            .position(|c| c.name == name)
            .map(|position| TextField {
                position,
                name: name.to_string(),
            })
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
    }
}

/// Schema Error
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// No column with the given name
    #[error("no column named {0}")]
    UnknownColumn(String),

    /// The column exists but is not a text column
    #[error("column {0} is not a text column")]
    NotText(String),

    /// No label column was declared
    #[error("schema declares no label column")]
    MissingLabel,

    /// More than one label column was declared
    #[error("schema declares more than one label column")]
    MultipleLabels,
}
