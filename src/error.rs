use std::fmt;

#[derive(Debug)]
pub enum LabelError {
    MissingPaperFormat,
    EmptyDataset,
    InvalidConfiguration(String),
    Backend(String),
    Io(std::io::Error),
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::MissingPaperFormat => write!(f, "no paper format selected"),
            LabelError::EmptyDataset => write!(f, "dataset has no records to print"),
            LabelError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            LabelError::Backend(message) => write!(f, "document backend failed: {}", message),
            LabelError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for LabelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LabelError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LabelError {
    fn from(value: std::io::Error) -> Self {
        LabelError::Io(value)
    }
}

impl From<serde_json::Error> for LabelError {
    fn from(value: serde_json::Error) -> Self {
        LabelError::InvalidConfiguration(format!("paper format catalog: {}", value))
    }
}
