use journal_core::RawRow;
use std::collections::HashMap;

use crate::error::{IngestError, IngestResult};

#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    /// Every record after the header, blank ones included.
    pub rows: Vec<RawRow>,
}

impl ParsedCsv {
    pub fn non_blank_rows(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_blank()).count()
    }
}

/// Split an upload into trimmed headers and header-keyed rows.
///
/// Empty lines are skipped by the reader. Rows shorter than the header get
/// empty cells; extra cells are ignored. When a header repeats, the first
/// column wins.
pub fn parse_csv(content: &[u8]) -> IngestResult<ParsedCsv> {
    let raw = String::from_utf8_lossy(content);
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw.as_ref());

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::MalformedFile(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::NoHeaders);
    }

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| IngestError::MalformedFile(e.to_string()))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 2);

        let mut cells = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() || cells.contains_key(header) {
                continue;
            }
            let value = record.get(i).unwrap_or("").to_string();
            cells.insert(header.clone(), value);
        }
        rows.push(RawRow::new(line, cells));
    }

    let parsed = ParsedCsv { headers, rows };
    if parsed.non_blank_rows() == 0 {
        return Err(IngestError::NoDataRows);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let csv = "\u{feff}Date , Symbol,P&L\n2024-01-15,AAPL,10\n\n,,\n2024-01-16,MSFT\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.headers, vec!["Date", "Symbol", "P&L"]);
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.rows[0].line, 2);
        assert_eq!(parsed.rows[0].get("Symbol"), Some("AAPL"));
        assert!(parsed.rows[1].is_blank());
        assert_eq!(parsed.rows[1].line, 4);
        assert_eq!(parsed.rows[2].get("P&L"), None);
        assert_eq!(parsed.non_blank_rows(), 2);
    }

    #[test]
    fn test_quoted_multiline_keeps_line_numbers() {
        let csv = "symbol,notes\nAAPL,\"line one\nline two\"\nMSFT,x\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.rows[0].line, 2);
        assert_eq!(parsed.rows[1].line, 4);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(matches!(parse_csv(b""), Err(IngestError::NoHeaders)));
        assert!(matches!(parse_csv(b" , \n"), Err(IngestError::NoHeaders)));
        assert!(matches!(parse_csv(b"symbol,pnl\n"), Err(IngestError::NoDataRows)));
        assert!(matches!(parse_csv(b"symbol,pnl\n,\n , \n"), Err(IngestError::NoDataRows)));
    }

    #[test]
    fn test_duplicate_header_first_wins() {
        let parsed = parse_csv(b"pnl,pnl\n1,2\n").unwrap();
        assert_eq!(parsed.rows[0].get("pnl"), Some("1"));
    }
}
