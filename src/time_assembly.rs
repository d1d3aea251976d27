//! Combines date/time component columns into seconds since the epoch for the
//! synthetic `time` variable.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::{
    classify::ClassifiedColumn,
    error::{ConvertError, Result},
    model::CoordinateType,
    parser::ParsedTable,
};

pub const EPOCH_UNITS: &str = "seconds since 1970-01-01T00:00:00Z";

const DEFAULT_DATE: &str = "yyyy-MM-dd";
const DEFAULT_TIME: &str = "HH:mm:ss";
const DEFAULT_DATE_TIME: &str = "yyyy-MM-dd'T'HH:mm:ss";

/// Translate a wizard date pattern (`yyyy-MM-dd HH:mm:ss`) into a chrono
/// format string. Text inside single quotes is literal.
pub fn chrono_format(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        match c {
            '\'' => {
                let end = chars[i + 1..].iter().position(|&x| x == '\'');
                let stop = end.map(|e| i + 1 + e).unwrap_or(chars.len());
                for &lit in &chars[i + 1..stop] {
                    push_literal(&mut out, lit);
                }
                i = stop + 1;
                continue;
            }
            'y' => out.push_str(if run == 2 { "%y" } else { "%Y" }),
            'M' => out.push_str(match run {
                1 | 2 => "%m",
                3 => "%b",
                _ => "%B",
            }),
            'd' => out.push_str("%d"),
            'D' => out.push_str("%j"),
            'H' => out.push_str("%H"),
            'h' => out.push_str("%I"),
            'm' => out.push_str("%M"),
            's' => out.push_str("%S"),
            'S' => out.push_str(match run {
                3 => "%3f",
                6 => "%6f",
                9 => "%9f",
                _ => "%f",
            }),
            'a' => out.push_str("%p"),
            'Z' | 'X' => out.push_str("%z"),
            other => {
                for _ in 0..run {
                    push_literal(&mut out, other);
                }
            }
        }
        i += run;
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn first_of(components: &[ClassifiedColumn], ty: CoordinateType) -> Option<&ClassifiedColumn> {
    components
        .iter()
        .find(|c| c.declaration.usage == crate::model::ColumnUsage::Coordinate(ty))
}

fn pattern_of(column: &ClassifiedColumn, default: &str) -> String {
    let raw = column.declaration.attribute("units").unwrap_or(default);
    chrono_format(if raw.trim().is_empty() { default } else { raw })
}

fn data_error(line: usize, column: &ClassifiedColumn, value: &str, fmt: &str) -> ConvertError {
    ConvertError::Data {
        line: line + 1,
        column: column.column_id(),
        message: format!("'{value}' does not match date/time format '{fmt}'"),
    }
}

/// Seconds since the epoch per row, or `None` when the components cannot
/// pin down an instant (no components, or a time of day without a date).
pub fn assemble(components: &[ClassifiedColumn], table: &ParsedTable) -> Result<Option<Vec<f64>>> {
    if let Some(full) = first_of(components, CoordinateType::FullDateTime) {
        let fmt = pattern_of(full, DEFAULT_DATE_TIME);
        return table
            .column(full.column_id())
            .map(|(line, value)| {
                NaiveDateTime::parse_from_str(value, &fmt)
                    .map(epoch_seconds)
                    .map_err(|_| data_error(line, full, value, &fmt))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some);
    }

    let Some(date_col) = first_of(components, CoordinateType::DateOnly) else {
        return Ok(None);
    };
    let date_fmt = pattern_of(date_col, DEFAULT_DATE);
    let time_col = first_of(components, CoordinateType::TimeOnly);
    let time_fmt = time_col.map(|c| pattern_of(c, DEFAULT_TIME));

    let mut out = Vec::with_capacity(table.row_count());
    for row in &table.rows {
        let raw_date = &row.tokens[date_col.column_id()];
        let date = NaiveDate::parse_from_str(raw_date, &date_fmt)
            .map_err(|_| data_error(row.line, date_col, raw_date, &date_fmt))?;
        let time = match (time_col, &time_fmt) {
            (Some(col), Some(fmt)) => {
                let raw_time = &row.tokens[col.column_id()];
                NaiveTime::parse_from_str(raw_time, fmt)
                    .map_err(|_| data_error(row.line, col, raw_time, fmt))?
            }
            _ => NaiveTime::MIN,
        };
        out.push(epoch_seconds(NaiveDateTime::new(date, time)));
    }
    Ok(Some(out))
}

fn epoch_seconds(naive: NaiveDateTime) -> f64 {
    let dt = Utc.from_utc_datetime(&naive);
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1e6
}
