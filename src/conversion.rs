use std::error::Error;
use std::fmt;

use log::info;

use crate::converter::convert;
use crate::record::{ConversionOptions, ConversionRecord, TimestampSource};
use crate::store::{RecordStore, StoreError};

/// The JSON body posted to convert some markdown.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub markdown: Option<String>,

    /// The name of the uploaded file, absent when the markdown was pasted.
    pub filename: Option<String>,

    pub remove_empty_lines: Option<bool>,
}

/// Why a conversion request didn't produce any text.
#[derive(Debug, PartialEq)]
pub enum ConvertError {
    /// The request had no markdown, or only whitespace.
    MissingMarkdown,
    Store(StoreError),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::MissingMarkdown => write!(f, "Missing Markdown content"),
            ConvertError::Store(err) => write!(f, "Could not record conversion\n{}", err),
        }
    }
}

impl Error for ConvertError {}

/// Validates the request, converts the markdown, records the conversion and
/// hands back the plain text.
///
/// Nothing is recorded unless the markdown is valid, and the text is only
/// returned once the record has been stored.
pub async fn run_conversion<S: RecordStore + ?Sized>(
    store: &S,
    clock: &TimestampSource,
    request: &ConvertRequest,
) -> Result<String, ConvertError> {
    let markdown = match request.markdown.as_deref() {
        Some(md) if !md.trim().is_empty() => md,
        _ => return Err(ConvertError::MissingMarkdown),
    };

    let options = ConversionOptions {
        remove_empty_lines: request.remove_empty_lines.unwrap_or(false),
    };
    let text = convert(markdown, options.remove_empty_lines);

    let record = ConversionRecord::new(
        clock.next(),
        request.filename.as_deref(),
        markdown,
        &text,
        options,
    );
    store.append(&record).await.map_err(ConvertError::Store)?;

    info!(
        "Converted {} ({} -> {} characters)",
        record.filename, record.markdown_length, record.text_length
    );

    Ok(text)
}
