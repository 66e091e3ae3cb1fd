use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce the dataset. Fatal for the whole page.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The file {} could not be found.", .path.display())]
    NotFound { path: PathBuf },
    #[error("An error occurred: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("An error occurred: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("An error occurred: {} has no header row", .path.display())]
    MissingHeader { path: PathBuf },
}

impl LoadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            LoadError::NotFound { path }
            | LoadError::Read { path, .. }
            | LoadError::Parse { path, .. }
            | LoadError::MissingHeader { path } => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::NotFound { .. } => "not_found",
            LoadError::Read { .. } => "read",
            LoadError::Parse { .. } => "parse",
            LoadError::MissingHeader { .. } => "missing_header",
        }
    }
}

/// Failure scoped to a single chart section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    #[error("The column '{0}' is missing in the dataset.")]
    MissingColumn(String),
    #[error("no values to plot in '{0}'")]
    EmptyData(String),
    #[error("{0}")]
    Render(String),
}

impl ChartError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::MissingColumn(_) => "missing_column",
            ChartError::EmptyData(_) => "empty_data",
            ChartError::Render(_) => "render",
        }
    }

    /// Text shown on the page. Missing columns get their own message,
    /// anything else is wrapped with the name of the chart that failed.
    pub fn user_message(&self, chart_name: &str) -> String {
        match self {
            ChartError::MissingColumn(_) => self.to_string(),
            other => format!(
                "An error occurred while generating the {}: {}",
                chart_name, other
            ),
        }
    }
}

impl From<std::fmt::Error> for ChartError {
    fn from(err: std::fmt::Error) -> Self {
        ChartError::Render(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_message_names_column() {
        let err = ChartError::MissingColumn("Where do you buy food more often?".into());
        assert_eq!(
            err.user_message("bar chart"),
            "The column 'Where do you buy food more often?' is missing in the dataset."
        );
    }

    #[test]
    fn other_errors_are_wrapped_with_chart_name() {
        let err = ChartError::EmptyData("x".into());
        assert_eq!(
            err.user_message("pie chart"),
            "An error occurred while generating the pie chart: no values to plot in 'x'"
        );
    }

    #[test]
    fn not_found_message() {
        let err = LoadError::NotFound {
            path: PathBuf::from("ANALISA KANTIN/sta24.csv"),
        };
        assert_eq!(
            err.to_string(),
            "The file ANALISA KANTIN/sta24.csv could not be found."
        );
        assert_eq!(err.kind(), "not_found");
    }
}
