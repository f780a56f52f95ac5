use std::sync::Mutex;

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};

/// The label stored for markdown that was pasted in rather than uploaded.
pub const PASTED_FILENAME: &str = "manual-input";

/// How many characters of the converted text end up in a record's sample.
pub const SAMPLE_LENGTH: usize = 100;

const ELLIPSIS: &str = "...";

/// The options a conversion was run with.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    pub remove_empty_lines: bool,
}

/// One completed conversion, as kept in the history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    /// When the conversion happened, also the key the record is stored under.
    pub timestamp: String,
    pub filename: String,
    pub markdown_length: usize,
    pub text_length: usize,
    /// The start of the converted text, see [`sample_of`].
    pub sample: String,
    pub full_text: String,
    pub original_markdown: String,
    #[serde(default)]
    pub options: ConversionOptions,
}

impl ConversionRecord {
    /// Builds the record for converting `markdown` into `text`.
    ///
    /// A missing or blank `filename` is recorded as [`PASTED_FILENAME`].
    pub fn new(
        timestamp: String,
        filename: Option<&str>,
        markdown: &str,
        text: &str,
        options: ConversionOptions,
    ) -> ConversionRecord {
        let filename = match filename {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => PASTED_FILENAME.to_string(),
        };

        ConversionRecord {
            timestamp,
            filename,
            markdown_length: markdown.chars().count(),
            text_length: text.chars().count(),
            sample: sample_of(text),
            full_text: text.to_string(),
            original_markdown: markdown.to_string(),
            options,
        }
    }

    /// The name to give the converted text when it's downloaded.
    pub fn converted_download_name(&self) -> String {
        let stem = match self.filename.rfind('.') {
            Some(idx) if idx > 0 => &self.filename[..idx],
            _ => self.filename.as_str(),
        };
        format!("converted-{}.txt", stem)
    }

    /// The name to give the original markdown when it's downloaded.
    pub fn original_download_name(&self) -> String {
        format!("original-{}", self.filename)
    }
}

/// The first [`SAMPLE_LENGTH`] characters of `text`, with an ellipsis if anything was cut off.
pub fn sample_of(text: &str) -> String {
    match text.char_indices().nth(SAMPLE_LENGTH) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Hands out ISO-8601 timestamps that never repeat and never go backwards.
///
/// Two calls within the same millisecond would collide as store keys, so the
/// second one is pushed a millisecond past the last timestamp handed out.
pub struct TimestampSource {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl TimestampSource {
    pub fn new() -> TimestampSource {
        TimestampSource {
            last: Mutex::new(None),
        }
    }

    /// A source that only hands out timestamps after `last`, so records made
    /// after a restart still sort after the ones already stored, even if the
    /// clock went backwards. An unreadable `last` is ignored.
    pub fn after(last: Option<&str>) -> TimestampSource {
        let last = last
            .and_then(|stamp| DateTime::parse_from_rfc3339(stamp).ok())
            .map(|time| time.with_timezone(&Utc).trunc_subsecs(3));

        TimestampSource {
            last: Mutex::new(last),
        }
    }

    /// The next timestamp, formatted like `2024-05-01T09:30:00.123Z`.
    pub fn next(&self) -> String {
        // Keys only carry milliseconds, so compare at that precision.
        let now = Utc::now().trunc_subsecs(3);
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let next = match *last {
            Some(previous) if now <= previous => previous + Duration::milliseconds(1),
            _ => now,
        };
        *last = Some(next);

        format_timestamp(next)
    }
}

impl Default for TimestampSource {
    fn default() -> Self {
        TimestampSource::new()
    }
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record_for(text: &str) -> ConversionRecord {
        ConversionRecord::new(
            "2024-05-01T09:30:00.000Z".to_string(),
            None,
            "# md",
            text,
            ConversionOptions::default(),
        )
    }

    #[test]
    fn short_text_is_its_own_sample() {
        let record = record_for("short");

        assert_eq!(record.sample, "short".to_string());
        assert_eq!(record.text_length, 5);
        assert_eq!(record.markdown_length, 4);
    }

    #[test]
    fn exactly_one_hundred_chars_has_no_ellipsis() {
        let text = "a".repeat(100);

        assert_eq!(sample_of(&text), text);
    }

    #[test]
    fn long_text_is_cut_with_ellipsis() {
        let text = "b".repeat(150);
        let record = record_for(&text);

        assert_eq!(record.sample, format!("{}...", "b".repeat(100)));
        assert!(record.full_text.starts_with(&record.sample[..100]));
        assert_eq!(record.text_length, 150);
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let text = "é".repeat(120);
        let record = record_for(&text);

        assert_eq!(record.text_length, 120);
        assert_eq!(record.sample, format!("{}...", "é".repeat(100)));
    }

    #[test]
    fn blank_filename_falls_back_to_pasted() {
        let blank = ConversionRecord::new(
            "t".to_string(),
            Some("  "),
            "md",
            "md",
            ConversionOptions::default(),
        );
        let named = ConversionRecord::new(
            "t".to_string(),
            Some("notes.md"),
            "md",
            "md",
            ConversionOptions::default(),
        );

        assert_eq!(blank.filename, PASTED_FILENAME.to_string());
        assert_eq!(named.filename, "notes.md".to_string());
    }

    #[test]
    fn download_names_follow_the_filename() {
        let mut record = record_for("text");
        record.filename = "notes.v2.md".to_string();

        assert_eq!(record.converted_download_name(), "converted-notes.v2.txt");
        assert_eq!(record.original_download_name(), "original-notes.v2.md");

        record.filename = PASTED_FILENAME.to_string();
        assert_eq!(record.converted_download_name(), "converted-manual-input.txt");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let record = ConversionRecord::new(
            "2024-05-01T09:30:00.000Z".to_string(),
            Some("a.md"),
            "*a*",
            "a",
            ConversionOptions {
                remove_empty_lines: true,
            },
        );

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["markdownLength"], 3);
        assert_eq!(json["textLength"], 1);
        assert_eq!(json["fullText"], "a");
        assert_eq!(json["originalMarkdown"], "*a*");
        assert_eq!(json["options"]["removeEmptyLines"], true);
    }

    #[test]
    fn records_without_options_still_decode() {
        let json = r#"{
            "timestamp": "2024-05-01T09:30:00.000Z",
            "filename": "a.md",
            "markdownLength": 3,
            "textLength": 1,
            "sample": "a",
            "fullText": "a",
            "originalMarkdown": "*a*"
        }"#;

        let record: ConversionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.options, ConversionOptions::default());
    }

    #[test]
    fn timestamps_are_unique_and_increasing() {
        let source = TimestampSource::new();

        let stamps: Vec<String> = (0..50).map(|_| source.next()).collect();

        for pair in stamps.windows(2) {
            assert!(pair[0] < pair[1], "{} is not before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn timestamps_stay_unique_within_a_millisecond() {
        let source = TimestampSource::new();

        let mut stamps: Vec<String> = (0..10_000).map(|_| source.next()).collect();
        let count = stamps.len();
        stamps.dedup();

        assert_eq!(stamps.len(), count);
    }

    #[test]
    fn resumed_source_continues_after_last_stamp() {
        let future = "2999-01-01T00:00:00.000Z";
        let source = TimestampSource::after(Some(future));

        assert_eq!(source.next(), "2999-01-01T00:00:00.001Z".to_string());
        assert_eq!(source.next(), "2999-01-01T00:00:00.002Z".to_string());
    }

    #[test]
    fn resumed_source_ignores_unreadable_stamps() {
        let source = TimestampSource::after(Some("not a time"));

        assert!(source.next().starts_with("20"));
        assert!(TimestampSource::after(None).next() < "2999".to_string());
    }

    #[test]
    fn timestamps_are_iso_8601_with_millis() {
        let stamp = TimestampSource::new().next();

        assert_eq!(stamp.len(), "2024-05-01T09:30:00.123Z".len());
        assert!(stamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
