//! Delimited account record parser
//!
//! Converts CSV text with a header line into paired profile/behavior accounts.
//! Parsing is tolerant: bad numbers become zero, unknown roles and interests are
//! coerced, and short rows are skipped and reported instead of aborting the batch.
//!
//! Every line is its own row. Quoting is honored within a line, so a stray
//! quote damages only the row it appears in.

use crate::error::AnalyticsError;
use crate::types::{Account, ActivityCounters, Interest, Profile, Role};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub const COL_USER_ID: &str = "user_id";
pub const COL_REGISTRATION_DATE: &str = "registration_date";
pub const COL_LOCATION: &str = "location";
pub const COL_LAST_ACTIVE_DATE: &str = "last_active_date";
pub const COL_ROLE: &str = "role";
pub const COL_INTERESTS: &str = "interests";
pub const COL_POST_COUNT: &str = "post_count";
pub const COL_INTERACTIONS: &str = "interactions";
pub const COL_LIKE_COUNT: &str = "like_count";
pub const COL_REPOST_COUNT: &str = "repost_count";
pub const COL_COMMENT_COUNT: &str = "comment_count";
pub const COL_FOLLOWER_COUNT: &str = "follower_count";
pub const COL_FOLLOWING_COUNT: &str = "following_count";

/// Separators accepted inside the interest field (`,` needs a quoted field)
const INTEREST_SEPARATORS: [char; 2] = [';', ','];

/// Naive datetime layouts accepted besides RFC 3339, interpreted as UTC
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Why a row was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer fields than header columns
    MissingFields,
    /// The identity field is empty
    MissingUserId,
    /// The line is not a readable delimited record
    Unreadable,
}

/// A row rejected during parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based line number in the source text
    pub line: u64,
    pub reason: SkipReason,
    pub expected_fields: usize,
    pub found_fields: usize,
}

impl SkippedRow {
    /// The row failure as an error value
    pub fn to_error(&self) -> AnalyticsError {
        AnalyticsError::MalformedRow {
            line: self.line,
            expected: self.expected_fields,
            found: self.found_fields,
        }
    }
}

/// Kind of non-fatal field diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Role not recognized, coerced to the default role
    UnknownRole,
    /// Interest token dropped
    UnknownInterest,
    /// Numeric field unparseable, read as zero
    InvalidNumber,
    /// Date field unparseable, treated as absent
    InvalidDate,
    /// A later row reused an earlier user id and replaced it
    DuplicateUser,
}

/// Non-fatal diagnostic attached to a parsed row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWarning {
    pub line: u64,
    pub user_id: String,
    pub field: String,
    pub value: String,
    pub kind: WarningKind,
}

/// Result of parsing a whole document
#[derive(Debug, Clone, Default)]
pub struct ParsedDataset {
    /// Accepted rows in source order (duplicates still present)
    pub accounts: Vec<Account>,
    pub skipped_rows: Vec<SkippedRow>,
    pub warnings: Vec<FieldWarning>,
}

/// Header name → column position
struct ColumnMap {
    positions: HashMap<String, usize>,
    width: usize,
}

impl ColumnMap {
    fn from_header(header: &StringRecord) -> Self {
        let positions = header
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_lowercase(), idx))
            .collect();
        Self {
            positions,
            width: header.len(),
        }
    }

    fn has(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.positions
            .get(column)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
    }
}

/// Per-row context for collecting diagnostics
struct RowContext<'a> {
    line: u64,
    user_id: &'a str,
    warnings: &'a mut Vec<FieldWarning>,
}

impl RowContext<'_> {
    fn warn(&mut self, field: &str, value: &str, kind: WarningKind) {
        warn!(
            line = self.line,
            user_id = self.user_id,
            field,
            value,
            ?kind,
            "coerced invalid field"
        );
        self.warnings.push(FieldWarning {
            line: self.line,
            user_id: self.user_id.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            kind,
        });
    }
}

/// Parser for delimited account records
pub struct RecordParser;

impl RecordParser {
    /// Parse CSV text into accounts.
    ///
    /// Fails with `EmptyDataset` when there is no header or no usable row and
    /// with `MissingColumn` when the header lacks `user_id`.
    pub fn parse(text: &str) -> Result<ParsedDataset, AnalyticsError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx as u64 + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());

        let header = match lines.next() {
            Some((_, line)) => read_record(line)?,
            None => None,
        };
        let Some(header) = header else {
            return Err(AnalyticsError::EmptyDataset);
        };
        let columns = ColumnMap::from_header(&header);
        if !columns.has(COL_USER_ID) {
            return Err(AnalyticsError::MissingColumn(COL_USER_ID.to_string()));
        }

        let mut dataset = ParsedDataset::default();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for (line, row) in lines {
            let record = match read_record(row) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(err) => {
                    warn!(line, error = %err, "skipping unreadable row");
                    dataset.skipped_rows.push(SkippedRow {
                        line,
                        reason: SkipReason::Unreadable,
                        expected_fields: columns.width,
                        found_fields: 0,
                    });
                    continue;
                }
            };

            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            if record.len() < columns.width {
                let skipped = SkippedRow {
                    line,
                    reason: SkipReason::MissingFields,
                    expected_fields: columns.width,
                    found_fields: record.len(),
                };
                warn!(error = %skipped.to_error(), "skipping malformed row");
                dataset.skipped_rows.push(skipped);
                continue;
            }

            let user_id = columns.get(&record, COL_USER_ID).unwrap_or_default();
            if user_id.is_empty() {
                warn!(line, "skipping row without user id");
                dataset.skipped_rows.push(SkippedRow {
                    line,
                    reason: SkipReason::MissingUserId,
                    expected_fields: columns.width,
                    found_fields: record.len(),
                });
                continue;
            }

            let mut ctx = RowContext {
                line,
                user_id,
                warnings: &mut dataset.warnings,
            };
            if !seen_ids.insert(user_id.to_string()) {
                ctx.warn(COL_USER_ID, user_id, WarningKind::DuplicateUser);
            }

            let account = parse_row(&columns, &record, &mut ctx);
            dataset.accounts.push(account);
        }

        if dataset.accounts.is_empty() {
            return Err(AnalyticsError::EmptyDataset);
        }

        debug!(
            accepted = dataset.accounts.len(),
            skipped = dataset.skipped_rows.len(),
            warnings = dataset.warnings.len(),
            "parsed account records"
        );

        Ok(dataset)
    }
}

/// Read one line as a single delimited record
fn read_record(line: &str) -> Result<Option<StringRecord>, csv::Error> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .transpose()
}

fn parse_row(columns: &ColumnMap, record: &StringRecord, ctx: &mut RowContext<'_>) -> Account {
    let role_raw = columns.get(record, COL_ROLE).unwrap_or_default();
    let role = Role::from_label(role_raw).unwrap_or_else(|| {
        ctx.warn(COL_ROLE, role_raw, WarningKind::UnknownRole);
        Role::default()
    });

    let interests = parse_interests(columns.get(record, COL_INTERESTS).unwrap_or_default(), ctx);

    let registration_date = optional_field(
        columns.get(record, COL_REGISTRATION_DATE),
        COL_REGISTRATION_DATE,
        ctx,
        parse_date,
    );
    let last_active_date = optional_field(
        columns.get(record, COL_LAST_ACTIVE_DATE),
        COL_LAST_ACTIVE_DATE,
        ctx,
        parse_timestamp,
    );

    let location = columns
        .get(record, COL_LOCATION)
        .filter(|raw| !raw.is_empty())
        .map(str::to_string);

    let interaction_count = if columns.has(COL_INTERACTIONS) {
        count_field(columns, record, COL_INTERACTIONS, ctx)
    } else {
        [COL_LIKE_COUNT, COL_REPOST_COUNT, COL_COMMENT_COUNT]
            .iter()
            .map(|column| count_field(columns, record, column, ctx))
            .fold(0u64, u64::saturating_add)
    };

    let counters = ActivityCounters {
        post_count: count_field(columns, record, COL_POST_COUNT, ctx),
        interaction_count,
        follower_count: count_field(columns, record, COL_FOLLOWER_COUNT, ctx),
        following_count: count_field(columns, record, COL_FOLLOWING_COUNT, ctx),
    };

    let profile = Profile::new(ctx.user_id, role, interests, registration_date, location);
    Account::new(profile, counters, last_active_date)
}

/// Split the interest sub-list, dropping unknown tokens one by one
fn parse_interests(raw: &str, ctx: &mut RowContext<'_>) -> Vec<Interest> {
    raw.split(INTEREST_SEPARATORS)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let interest = Interest::from_token(token);
            if interest.is_none() {
                ctx.warn(COL_INTERESTS, token, WarningKind::UnknownInterest);
            }
            interest
        })
        .collect()
}

/// Empty means absent; unparseable means absent plus a warning
fn optional_field<T>(
    raw: Option<&str>,
    column: &str,
    ctx: &mut RowContext<'_>,
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = raw.filter(|raw| !raw.is_empty())?;
    let parsed = parse(raw);
    if parsed.is_none() {
        ctx.warn(column, raw, WarningKind::InvalidDate);
    }
    parsed
}

fn count_field(
    columns: &ColumnMap,
    record: &StringRecord,
    column: &str,
    ctx: &mut RowContext<'_>,
) -> u64 {
    let raw = columns.get(record, column).unwrap_or_default();
    if raw.is_empty() {
        return 0;
    }
    parse_count(raw).unwrap_or_else(|| {
        ctx.warn(column, raw, WarningKind::InvalidNumber);
        0
    })
}

/// Parse a non-negative counter. Fractions are truncated, negatives read as zero.
pub fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value.max(0.0).trunc() as u64),
        _ => None,
    }
}

/// Parse an instant. Naive values are read as UTC; bare dates as midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a calendar day, accepting full timestamps too
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| parse_timestamp(raw).map(|dt| dt.date_naive()))
}
