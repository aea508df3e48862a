//! Reading and writing of the tab separated article data files.

use std::fs::File;
use std::io::{BufReader, Write};
use std::num::ParseIntError;
use std::path::Path;
use std::time::Duration;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;
use geogrounder_toolkit::from_str_ex::{ParseErrorEx, ParseEx};
use geogrounder_toolkit::status::StatusMessage;
use crate::article::Article;
use crate::coord::{Coord, CoordParseError};
use crate::errors::ReadError;

/// The known columns of an article data file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ArticleField {
    Id,
    Title,
    Split,
    Coord,
    IncomingLinks,
    Redir,
    Namespace,
    IsListOf,
    IsDisambig,
    IsList,
}

impl ArticleField {
    /// The columns of a combined article data file, in order.
    pub fn combined() -> Vec<ArticleField> {
        ArticleField::iter().collect()
    }

    fn read_into(&self, art: &mut Article, value: &str) -> Result<(), FieldError> {
        match self {
            ArticleField::Id => art.id = value.parse_field("id")?,
            ArticleField::Title => art.title = value.to_string(),
            ArticleField::Split => art.split = value.parse_or_warn("split"),
            ArticleField::Coord => {
                art.coord = if value.is_empty() { None } else { Some(value.parse()?) }
            }
            ArticleField::IncomingLinks => art.incoming_links = value.parse_field_opt("incoming_links")?,
            ArticleField::Redir => art.redir = value.to_string(),
            ArticleField::Namespace => art.namespace = value.to_string(),
            ArticleField::IsListOf => art.is_list_of = yesno_to_bool(value),
            ArticleField::IsDisambig => art.is_disambig = yesno_to_bool(value),
            ArticleField::IsList => art.is_list = yesno_to_bool(value),
        }
        Ok(())
    }

    fn write_from(&self, art: &Article) -> String {
        match self {
            ArticleField::Id => art.id.to_string(),
            ArticleField::Title => art.title.clone(),
            ArticleField::Split => art.split.to_string(),
            ArticleField::Coord => art.coord.map_or_else(String::new, |Coord { lat, long }| format!("{lat},{long}")),
            ArticleField::IncomingLinks => art.incoming_links.map_or_else(String::new, |links| links.to_string()),
            ArticleField::Redir => art.redir.clone(),
            ArticleField::Namespace => art.namespace.clone(),
            ArticleField::IsListOf => bool_to_yesno(art.is_list_of).to_string(),
            ArticleField::IsDisambig => bool_to_yesno(art.is_disambig).to_string(),
            ArticleField::IsList => bool_to_yesno(art.is_list).to_string(),
        }
    }
}

#[derive(Debug, Error)]
enum FieldError {
    #[error(transparent)]
    Int(#[from] ParseErrorEx<ParseIntError>),
    #[error(transparent)]
    Coord(#[from] CoordParseError),
}

fn yesno_to_bool(value: &str) -> bool {
    match value {
        "yes" => true,
        "no" => false,
        other => {
            log::warn!("Expected yes or no, saw '{other}'");
            false
        }
    }
}

fn bool_to_yesno(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn parse_header(header: &StringRecord) -> Vec<Option<ArticleField>> {
    header.iter().map(|name| {
        match name.parse::<ArticleField>() {
            Ok(field) => Some(field),
            Err(_) => {
                log::warn!("Saw unknown field name {name}");
                None
            }
        }
    }).collect()
}

/// Reads an article data file and hands every article to `process`.
///
/// The first row names the columns. Rows with a different number of fields or
/// with unparsable values are skipped with a warning. Returns the column names.
pub fn read_article_data_file(
    path: impl AsRef<Path>,
    max_time: Option<Duration>,
    mut process: impl FnMut(Article),
) -> Result<Vec<String>, ReadError> {
    let path = path.as_ref();
    log::info!("Reading article data from {}...", path.display());
    let file = File::open(path).map_err(|source| ReadError::Open { path: path.to_path_buf(), source })?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(BufReader::new(file));
    let header = reader.headers()?.clone();
    if header.is_empty() {
        return Err(ReadError::MissingHeader(path.to_path_buf()));
    }
    let fields = parse_header(&header);
    let mut status = StatusMessage::new("article").with_max_time(max_time);
    for record in reader.records() {
        let record = record?;
        if record.len() != fields.len() {
            log::warn!(
                "Strange record at line #{}, expected {} fields, saw {} fields; skipping line={:?}",
                record.position().map_or(0, |p| p.line()),
                fields.len(),
                record.len(),
                record.iter().collect::<Vec<_>>().join("\t")
            );
            continue;
        }
        let mut art = Article::default();
        let parsed = fields.iter().zip(record.iter()).try_for_each(|(field, value)| {
            match field {
                Some(field) => field.read_into(&mut art, value),
                None => Ok(())
            }
        });
        if let Err(err) = parsed {
            log::warn!("Skipping record at line #{}: {err}", record.position().map_or(0, |p| p.line()));
            continue;
        }
        process(art);
        if status.item_processed() {
            break;
        }
    }
    log::info!("Finished reading {} articles.", status.num_processed());
    Ok(header.iter().map(str::to_string).collect())
}

/// Writes articles as rows of an article data file.
pub struct ArticleDataWriter<W: Write> {
    writer: csv::Writer<W>,
    fields: Vec<ArticleField>,
}

impl<W: Write> ArticleDataWriter<W> {
    /// Creates the writer and writes the header row.
    pub fn new(inner: W, fields: Vec<ArticleField>) -> Result<Self, ReadError> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Never)
            .from_writer(inner);
        writer.write_record(fields.iter().map(AsRef::<str>::as_ref))?;
        Ok(Self { writer, fields })
    }

    pub fn write_article(&mut self, art: &Article) -> Result<(), ReadError> {
        self.writer.write_record(self.fields.iter().map(|field| field.write_from(art)))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ReadError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes the articles with the given columns to `path`.
pub fn write_article_data_file<'a>(
    path: impl AsRef<Path>,
    fields: Vec<ArticleField>,
    articles: impl IntoIterator<Item = &'a Article>,
) -> Result<(), ReadError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| ReadError::Open { path: path.to_path_buf(), source })?;
    let mut writer = ArticleDataWriter::new(file, fields)?;
    for art in articles {
        writer.write_article(art)?;
    }
    writer.flush()
}
