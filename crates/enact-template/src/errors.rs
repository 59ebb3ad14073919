use thiserror::Error;

pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("missing value for parameter '{0}'")]
    MissingParam(String),
    #[error("unterminated quote while splitting command: {0}")]
    UnterminatedQuote(String),
}
