//! Cell value normalization for calamine cells.

use calamine::Data;

/// Trimmed text of a cell; empty cells become an empty string.
pub fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Float(f)) => {
            // Avoid trailing ".0" for whole numbers
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Some(Data::Bool(b)) => b.to_string(),
        Some(Data::DateTime(dt)) => format!("{}", dt.as_f64()),
        Some(Data::DateTimeIso(s)) | Some(Data::DurationIso(s)) => s.trim().to_string(),
        Some(Data::Error(e)) => format!("#ERR:{:?}", e),
    }
}

/// Integer value of a cell.
///
/// Numeric cells round half away from zero; text cells are parsed as integers
/// after trimming. Blank, non-numeric or out-of-range values are absent.
pub fn cell_int(cell: Option<&Data>) -> Option<i32> {
    match cell {
        None | Some(Data::Empty) => None,
        Some(Data::Int(i)) => i32::try_from(*i).ok(),
        Some(Data::Float(f)) => round_to_i32(*f),
        Some(Data::DateTime(dt)) => round_to_i32(dt.as_f64()),
        Some(Data::String(s)) => parse_int(s),
        Some(Data::Bool(_)) | Some(Data::Error(_)) => None,
        Some(Data::DateTimeIso(_)) | Some(Data::DurationIso(_)) => None,
    }
}

/// Parse trimmed text as an integer; blank or malformed text is absent.
pub fn parse_int(text: &str) -> Option<i32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse().ok()
}

fn round_to_i32(v: f64) -> Option<i32> {
    if !v.is_finite() {
        return None;
    }
    let rounded = v.round();
    if rounded < f64::from(i32::MIN) || rounded > f64::from(i32::MAX) {
        return None;
    }
    Some(rounded as i32)
}
