//! Delimiter detection for delimited text of unknown dialect.

/// Candidates tried when the configuration does not name any.
pub const DEFAULT_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Pick the delimiter that best explains the first `max_lines` logical lines.
///
/// A candidate must appear in the header line. Among those, the one whose
/// per-line count matches the header on the most data lines wins; ties go to
/// the candidate producing more columns, then to the earlier candidate.
/// Quoted sections are ignored, including quoted line breaks.
pub fn sniff_delimiter(sample: &[u8], candidates: &[u8], max_lines: usize) -> Option<u8> {
    let lines = logical_lines(sample, max_lines.max(1));
    let (header, data) = lines.split_first()?;

    let mut best: Option<(u8, usize, usize)> = None;
    for &candidate in candidates {
        let header_count = count_unquoted(header, candidate);
        if header_count == 0 {
            continue;
        }
        let consistent = data
            .iter()
            .filter(|line| count_unquoted(line, candidate) == header_count)
            .count();

        let better = match best {
            None => true,
            Some((_, best_consistent, best_count)) => {
                (consistent, header_count) > (best_consistent, best_count)
            }
        };
        if better {
            best = Some((candidate, consistent, header_count));
        }
    }

    best.map(|(delimiter, _, _)| delimiter)
}

/// Split into non-blank lines, keeping quoted newlines inside their line.
fn logical_lines(sample: &[u8], max_lines: usize) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, &byte) in sample.iter().enumerate() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'\n' if !in_quotes => {
                push_line(&mut lines, &sample[start..idx]);
                start = idx + 1;
                if lines.len() >= max_lines {
                    return lines;
                }
            }
            _ => {}
        }
    }
    push_line(&mut lines, &sample[start..]);
    lines.truncate(max_lines);
    lines
}

fn push_line<'a>(lines: &mut Vec<&'a [u8]>, line: &'a [u8]) {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().any(|b| !b.is_ascii_whitespace()) {
        lines.push(line);
    }
}

fn count_unquoted(line: &[u8], delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &byte in line {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(text: &str) -> Option<u8> {
        sniff_delimiter(text.as_bytes(), &DEFAULT_DELIMITERS, 50)
    }

    #[test]
    fn test_detects_common_delimiters() {
        assert_eq!(sniff("a,b,c\n1,2,3\n"), Some(b','));
        assert_eq!(sniff("a;b;c\r\n1;2;3\r\n"), Some(b';'));
        assert_eq!(sniff("a\tb\tc\n1\t2\t3\n"), Some(b'\t'));
        assert_eq!(sniff("a|b\n1|2\n"), Some(b'|'));
    }

    #[test]
    fn test_semicolon_with_decimal_commas() {
        // Comma decimals make the comma count vary row to row.
        let text = "Year;Value;Low\n2020;12,5;10,1\n2021;13;11,2\n2022;9,75;8\n";
        assert_eq!(sniff(text), Some(b';'));
    }

    #[test]
    fn test_ignores_quoted_delimiters() {
        let text = "name;point\n\"Doe, Jane\";\"POINT (-95.7, 37.1)\"\n\"Roe, Rick\";x\n";
        assert_eq!(sniff(text), Some(b';'));
    }

    #[test]
    fn test_quoted_newline_stays_in_line() {
        let text = "a,b\n\"multi\nline\",2\n3,4\n";
        assert_eq!(sniff(text), Some(b','));
        assert_eq!(logical_lines(text.as_bytes(), 10).len(), 3);
    }

    #[test]
    fn test_no_delimiter_found() {
        assert_eq!(sniff("single\ncolumn\n"), None);
        assert_eq!(sniff(""), None);
        assert_eq!(sniff("\n  \n"), None);
    }
}
