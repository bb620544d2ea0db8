use std::collections::{HashMap, HashSet};

/// Detect the header row index among already-read rows.
///
/// Only the first `max_rows` rows are considered. Scanning from the bottom up,
/// the header is the last row that has the most common width, has no blank
/// cells, and contains neither numbers nor dates. Returns 0 when no row fits.
pub fn detect_header_row(rows: &[Vec<String>], max_rows: usize) -> usize {
    let rows: Vec<&Vec<String>> = rows.iter()
        .take(max_rows)
        .collect();

    if rows.is_empty() {
        return 0;
    }

    // Width counts ignore trailing blank cells, which spreadsheets pad freely
    let width = |row: &Vec<String>| {
        row.iter()
            .rposition(|c| !c.trim().is_empty())
            .map_or(0, |p| p + 1)
    };

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for row in &rows {
        let w = width(row);
        if w > 0 {
            *counts.entry(w).or_insert(0) += 1;
        }
    }
    let most_common = counts.into_iter()
        .max_by_key(|&(len, c)| (c, len))
        .map(|(len, _)| len)
        .unwrap_or(0);

    for i in (0..rows.len()).rev() {
        let row = rows[i];
        if most_common == 0 || width(row) != most_common {
            continue;
        }

        let all_text = row[..most_common].iter().all(|cell| {
            let trimmed = cell.trim();
            !trimmed.is_empty() && trimmed.parse::<f64>().is_err() && !is_date_like(trimmed)
        });

        if all_text {
            return i;
        }
    }

    0
}

/// Turn raw header cells into unique column names.
///
/// Blank names become `Unnamed: {index}` and repeats get a `.1`, `.2`, ...
/// suffix, so `["a", "a", ""]` yields `["a", "a.1", "Unnamed: 2"]`.
pub fn normalize_headers(raw: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(raw.len());

    for (idx, cell) in raw.iter().enumerate() {
        let base = match cell.trim() {
            "" => format!("Unnamed: {idx}"),
            s => s.to_string(),
        };

        let mut name = base.clone();
        let mut suffix = 0;
        while taken.contains(&name) {
            suffix += 1;
            name = format!("{base}.{suffix}");
        }
        taken.insert(name.clone());
        names.push(name);
    }

    names
}

fn is_date_like(s: &str) -> bool {
    let has_separators = s.contains('/') || s.contains(':') || s.contains('-');
    let has_date_words = s.to_lowercase().contains("am") || s.to_lowercase().contains("pm");

    if !has_separators && !has_date_words {
        return false;
    }

    use chrono::NaiveDateTime;
    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%Y-%m-%d",
        "%m/%d/%Y",
    ];
    for fmt in &formats {
        if NaiveDateTime::parse_from_str(s, fmt).is_ok() {
            return true;
        }
        if chrono::NaiveDate::parse_from_str(s, fmt).is_ok() {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_below_title_block() {
        let table = rows(&[
            &["Quarterly export", "", ""],
            &["generated", "2024-01-05", ""],
            &["Model", "Price", "Colour"],
            &["GT-R", "115000", "Red"],
            &["GT-R Nismo", "210000", "White"],
        ]);
        assert_eq!(detect_header_row(&table, 50), 2);
    }

    #[test]
    fn numeric_only_sheet_falls_back_to_first_row() {
        let table = rows(&[&["1", "2"], &["3", "4"]]);
        assert_eq!(detect_header_row(&table, 50), 0);
    }

    #[test]
    fn dates_are_not_headers() {
        let table = rows(&[
            &["When", "Value"],
            &["2024-01-01", "x"],
        ]);
        assert_eq!(detect_header_row(&table, 50), 0);
    }

    #[test]
    fn headers_are_made_unique() {
        let raw: Vec<String> = ["Model", "Model", "", "Model.1", " Price "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let names = normalize_headers(&raw);
        assert_eq!(names[0], "Model");
        assert_eq!(names[1], "Model.1");
        assert_eq!(names[2], "Unnamed: 2");
        assert_eq!(names[3], "Model.1.1");
        assert_eq!(names[4], "Price");
    }
}
