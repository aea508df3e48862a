use std::fmt::Display;
use std::str::FromStr;
use sealed::sealed;
use thiserror::Error;

/// A parse error that remembers the offending text and the field it was read for.
#[derive(Debug, Error)]
#[error("{}Failed parsing of {parse_target:?}.\nCause: {source}", .field.map(|v| format!("{v}: ")).unwrap_or_default())]
pub struct ParseErrorEx<E> {
    parse_target: String,
    field: Option<&'static str>,
    #[source]
    source: E
}

impl<E> ParseErrorEx<E> {
    pub fn new(parse_target: &str, field: Option<&'static str>, source: E) -> Self {
        Self { parse_target: parse_target.to_string(), field, source }
    }

    pub fn parse_target(&self) -> &str {
        &self.parse_target
    }

    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    pub fn into_source(self) -> E {
        self.source
    }
}

/// Field parsing for the tab separated tables.
#[sealed]
pub trait ParseEx {
    /// Parses the trimmed value, remembering the field name on failure.
    fn parse_field<F: FromStr>(&self, field: &'static str) -> Result<F, ParseErrorEx<F::Err>>;

    /// Parses the value, an empty value is `None`.
    fn parse_field_opt<F: FromStr>(&self, field: &'static str) -> Result<Option<F>, ParseErrorEx<F::Err>>;

    /// Parses the value or logs a warning and falls back to the default.
    fn parse_or_warn<F: FromStr + Default>(&self, field: &'static str) -> F where F::Err: Display;
}

#[sealed]
impl ParseEx for str {
    fn parse_field<F: FromStr>(&self, field: &'static str) -> Result<F, ParseErrorEx<F::Err>> {
        let trimmed = self.trim();
        F::from_str(trimmed).map_err(|e| ParseErrorEx::new(trimmed, Some(field), e))
    }

    fn parse_field_opt<F: FromStr>(&self, field: &'static str) -> Result<Option<F>, ParseErrorEx<F::Err>> {
        if self.trim().is_empty() {
            Ok(None)
        } else {
            self.parse_field(field).map(Some)
        }
    }

    fn parse_or_warn<F: FromStr + Default>(&self, field: &'static str) -> F where F::Err: Display {
        match self.parse_field(field) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("{err}");
                F::default()
            }
        }
    }
}
