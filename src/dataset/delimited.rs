//! Delimited text (CSV) reader.

use super::DatasetError;

const CANDIDATE_DELIMITERS: [u8; 3] = [b';', b',', b'\t'];

/// Picks the candidate delimiter that occurs most often in the header line.
fn detect_delimiter(header_line: &str) -> u8 {
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .max_by_key(|delimiter| header_line.bytes().filter(|byte| byte == delimiter).count())
        .filter(|delimiter| header_line.as_bytes().contains(delimiter))
        .unwrap_or(b',')
}

/// Reads every record as strings. Invalid UTF-8 is replaced rather than rejected.
pub(super) fn read_records(bytes: &[u8]) -> Result<Vec<Vec<String>>, DatasetError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    let header_line = String::from_utf8_lossy(bytes.split(|byte| *byte == b'\n').next().unwrap_or_default());
    let delimiter = detect_delimiter(&header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        records.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_semicolon_exports() {
        assert_eq!(detect_delimiter("ID;LOCAL"), b';');
        assert_eq!(detect_delimiter("ID,LOCAL"), b',');
        assert_eq!(detect_delimiter("ID\tLOCAL"), b'\t');
        assert_eq!(detect_delimiter("ID"), b',');
    }

    #[test]
    fn reads_quoted_fields_and_strips_bom() {
        let data = "\u{feff}ID;LOCAL\nA1;\"Rua; 5\"\nA2\n";
        let records = read_records(data.as_bytes()).unwrap();
        assert_eq!(records[0], ["ID", "LOCAL"]);
        assert_eq!(records[1], ["A1", "Rua; 5"]);
        assert_eq!(records[2], ["A2"]);
    }
}
