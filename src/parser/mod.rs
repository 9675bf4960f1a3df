//! Decodes an uploaded byte buffer into a lazy sequence of word records.
//!
//! CSV/TSV are genuinely streamed through [`csv::Reader`]; JSON is parsed
//! into a `Vec<Value>` up front since `serde_json` has no array-element
//! streaming mode, then iterated the same way the CSV path is.

use std::collections::BTreeMap;
use std::io::Cursor;

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::store::operations::words::Cefr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Tsv,
    Json,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub lemma: String,
    pub pos: Option<String>,
    pub gender: Option<String>,
    pub ipa: Option<String>,
    pub meaning_text: String,
    pub translations: BTreeMap<String, String>,
    pub lesson: Option<String>,
    pub cefr: Option<Cefr>,
    pub tags: Vec<String>,
    pub hint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
}

pub enum RowResult {
    Record(ParsedRecord),
    Error(RowError),
}

#[derive(Debug)]
pub enum ParseError {
    Csv(csv::Error),
    Json(serde_json::Error),
    UnknownFormat,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Csv(e) => write!(f, "csv error: {e}"),
            ParseError::Json(e) => write!(f, "json error: {e}"),
            ParseError::UnknownFormat => write!(f, "could not determine file format"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Content sniff (leading `[`/`{` → json), then filename suffix, then a
/// comma-vs-tab heuristic over the first chunk of bytes.
pub fn detect_format(buf: &[u8], filename: Option<&str>) -> Format {
    let head = &buf[..buf.len().min(256)];
    let trimmed = head
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .copied();
    if matches!(trimmed, Some(b'[') | Some(b'{')) {
        return Format::Json;
    }

    if let Some(name) = filename {
        let lower = name.to_lowercase();
        if lower.ends_with(".json") {
            return Format::Json;
        }
        if lower.ends_with(".tsv") {
            return Format::Tsv;
        }
        if lower.ends_with(".csv") {
            return Format::Csv;
        }
    }

    let sample = &buf[..buf.len().min(1024)];
    let commas = sample.iter().filter(|&&b| b == b',').count();
    let tabs = sample.iter().filter(|&&b| b == b'\t').count();
    if tabs > commas {
        Format::Tsv
    } else {
        Format::Csv
    }
}

/// Parses the whole buffer into records eagerly. The `format` argument
/// should usually come from [`detect_format`] when the caller passed
/// `Format::Auto`.
pub fn parse(buf: &[u8], format: Format, filename: Option<&str>) -> Result<Vec<RowResult>, ParseError> {
    let resolved = if format == Format::Auto {
        detect_format(buf, filename)
    } else {
        format
    };

    match resolved {
        Format::Csv => parse_delimited(buf, b','),
        Format::Tsv => parse_delimited(buf, b'\t'),
        Format::Json => parse_json(buf),
        Format::Auto => Err(ParseError::UnknownFormat),
    }
}

fn parse_delimited(buf: &[u8], delimiter: u8) -> Result<Vec<RowResult>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(buf));

    let headers: Vec<String> = reader
        .headers()
        .map_err(ParseError::Csv)?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();

    let mut out = Vec::new();
    for (row_number, record) in reader.records().enumerate() {
        let record = record.map_err(ParseError::Csv)?;
        let mut fields = BTreeMap::new();
        for (col, value) in headers.iter().zip(record.iter()) {
            fields.insert(col.clone(), value.to_string());
        }
        out.push(build_record(row_number + 1, &fields));
    }
    Ok(out)
}

fn parse_json(buf: &[u8]) -> Result<Vec<RowResult>, ParseError> {
    let value: Value = serde_json::from_slice(buf).map_err(ParseError::Json)?;
    let rows = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut out = Vec::new();
    for (row_number, row) in rows.into_iter().enumerate() {
        let mut fields = BTreeMap::new();
        if let Value::Object(map) = row {
            for (key, value) in map {
                let text = match value {
                    Value::String(s) => s,
                    Value::Array(items) => items
                        .into_iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect::<Vec<_>>()
                        .join(";"),
                    Value::Null => continue,
                    other => other.to_string(),
                };
                fields.insert(key.to_lowercase(), text);
            }
        }
        out.push(build_record(row_number + 1, &fields));
    }
    Ok(out)
}

fn lookup<'a>(fields: &'a BTreeMap<String, String>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| fields.get(*name).map(String::as_str))
        .filter(|v| !v.is_empty())
}

fn build_record(row: usize, fields: &BTreeMap<String, String>) -> RowResult {
    let lemma_raw = lookup(fields, &["lemma", "word", "term", "french"]);
    let lemma = match lemma_raw {
        Some(raw) => raw.nfc().collect::<String>().trim().to_string(),
        None => String::new(),
    };
    if lemma.is_empty() {
        return RowResult::Error(RowError {
            row,
            reason: "missing lemma".to_string(),
        });
    }

    let mut translations = BTreeMap::new();
    if let Some(zh) = lookup(fields, &["meaning_zh", "meaning", "translation", "zh", "chinese"]) {
        translations.insert("zh-cn".to_string(), zh.to_string());
    }
    if let Some(en) = lookup(fields, &["meaning_en", "en", "english"]) {
        translations.insert("en".to_string(), en.to_string());
    }
    let meaning_text = translations
        .get("zh-cn")
        .or_else(|| translations.get("en"))
        .cloned()
        .unwrap_or_default();

    let pos = lookup(fields, &["pos", "part_of_speech"]).map(str::to_string);

    let gender = lookup(fields, &["gender", "genre"]).and_then(|raw| {
        match raw.to_lowercase().as_str() {
            "m" | "male" | "masculine" => Some("m".to_string()),
            "f" | "female" | "feminine" => Some("f".to_string()),
            _ => None,
        }
    });

    let ipa = lookup(fields, &["ipa", "phonetic"]).map(str::to_string);
    let lesson = lookup(fields, &["lesson", "chapter", "unit"]).map(str::to_string);
    let cefr = lookup(fields, &["cefr", "level"]).and_then(parse_cefr);

    let tags = lookup(fields, &["tags"])
        .map(|raw| {
            raw.split(|c| c == ';' || c == ',' || c == '|')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let hint = lookup(fields, &["hint"]).map(str::to_string);

    RowResult::Record(ParsedRecord {
        lemma,
        pos,
        gender,
        ipa,
        meaning_text,
        translations,
        lesson,
        cefr,
        tags,
        hint,
    })
}

fn parse_cefr(raw: &str) -> Option<Cefr> {
    match raw.trim().to_uppercase().as_str() {
        "A1" => Some(Cefr::A1),
        "A2" => Some(Cefr::A2),
        "B1" => Some(Cefr::B1),
        "B2" => Some(Cefr::B2),
        "C1" => Some(Cefr::C1),
        "C2" => Some(Cefr::C2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_json_by_leading_bracket() {
        assert_eq!(detect_format(b"[{\"lemma\":\"chat\"}]", None), Format::Json);
    }

    #[test]
    fn detects_tsv_by_tab_heuristic() {
        assert_eq!(detect_format(b"lemma\tmeaning\nchat\tcat\n", None), Format::Tsv);
    }

    #[test]
    fn csv_row_missing_lemma_is_an_error() {
        let buf = b"lemma,meaning\n,cat\n";
        let rows = parse(buf, Format::Csv, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0], RowResult::Error(_)));
    }

    #[test]
    fn csv_maps_known_columns_case_insensitively() {
        let buf = b"Word,Meaning_ZH,CEFR,Tags\nchat,\xe7\x8c\xab,A1,animal;pet\n";
        let rows = parse(buf, Format::Csv, None).unwrap();
        let RowResult::Record(record) = &rows[0] else {
            panic!("expected a record");
        };
        assert_eq!(record.lemma, "chat");
        assert_eq!(record.cefr, Some(Cefr::A1));
        assert_eq!(record.tags, vec!["animal", "pet"]);
    }

    #[test]
    fn invalid_cefr_is_dropped_not_rejected() {
        let buf = b"lemma,cefr\nchat,not-a-level\n";
        let rows = parse(buf, Format::Csv, None).unwrap();
        let RowResult::Record(record) = &rows[0] else {
            panic!("expected a record");
        };
        assert_eq!(record.cefr, None);
    }

    #[test]
    fn json_array_is_parsed() {
        let buf = br#"[{"lemma":"chien","tags":["animal","pet"]}]"#;
        let rows = parse(buf, Format::Json, None).unwrap();
        let RowResult::Record(record) = &rows[0] else {
            panic!("expected a record");
        };
        assert_eq!(record.lemma, "chien");
        assert_eq!(record.tags, vec!["animal", "pet"]);
    }
}
