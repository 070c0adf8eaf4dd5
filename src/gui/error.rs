use crate::pipeline::PipelineError;
use std::{error::Error, fmt::Display};

#[derive(Debug)]
pub enum ScopeGuiError {
    IOError(std::io::Error),
    PipelineError(PipelineError),
}

impl Display for ScopeGuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IOError(e) => write!(f, "terminal error: {e}"),
            Self::PipelineError(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ScopeGuiError {}

impl From<std::io::Error> for ScopeGuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<PipelineError> for ScopeGuiError {
    fn from(value: PipelineError) -> Self {
        Self::PipelineError(value)
    }
}
