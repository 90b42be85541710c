use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use super::errors::LoadError;


/// One row of origin-destination data: the number of passengers who entered at `origin` and
/// exited at `destination` during `hour`.
#[derive(PartialEq, Debug, Clone)]
pub struct OdRecord {
    pub origin: String,
    pub destination: String,
    pub hour: u8,
    pub count: u64,
}

// A convenience type for parsing csv data with headers
type Row = HashMap<String, String>;

// column positions in the header-less exits data: date, hour, origin, destination, count
static HOUR_COL: usize = 1;
static ORIGIN_COL: usize = 2;
static DESTINATION_COL: usize = 3;
static COUNT_COL: usize = 4;

impl OdRecord {
    pub fn new(origin: &str, destination: &str, hour: u8, count: u64) -> OdRecord {
        OdRecord {
            origin: String::from(origin),
            destination: String::from(destination),
            hour,
            count,
        }
    }

    pub fn all_from_csv(csvpath: &Path, has_headers: bool) -> Result<Vec<OdRecord>, LoadError> {
        let file = File::open(csvpath).map_err(
            |source| LoadError::Io{path: csvpath.to_path_buf(), source})?;
        return OdRecord::all_from_reader(file, has_headers);
    }

    /// Parses OD rows.  With headers, the columns `origin`, `destination`, `hour` and `count`
    /// are looked up by name; without, the positional date/hour/origin/destination/count layout
    /// is assumed.
    pub fn all_from_reader<RR: Read>(reader: RR, has_headers: bool)
                                     -> Result<Vec<OdRecord>, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(has_headers)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = vec![];
        if has_headers {
            for (row_idx, result) in reader.deserialize().enumerate() {
                let row: Row = result?;
                let field = |name: &'static str| match row.get(name) {
                    Some(value) => Ok(value.as_str()),
                    None => Err(LoadError::MissingField{row: row_idx, field: name}),
                };
                records.push(OdRecord {
                    origin: String::from(field("origin")?),
                    destination: String::from(field("destination")?),
                    hour: parse_field(row_idx, "hour", field("hour")?)?,
                    count: parse_field(row_idx, "count", field("count")?)?,
                });
            }
        } else {
            for (row_idx, result) in reader.records().enumerate() {
                let row = result?;
                let field = |name: &'static str, col: usize| match row.get(col) {
                    Some(value) => Ok(value),
                    None => Err(LoadError::MissingField{row: row_idx, field: name}),
                };
                records.push(OdRecord {
                    origin: String::from(field("origin", ORIGIN_COL)?),
                    destination: String::from(field("destination", DESTINATION_COL)?),
                    hour: parse_field(row_idx, "hour", field("hour", HOUR_COL)?)?,
                    count: parse_field(row_idx, "count", field("count", COUNT_COL)?)?,
                });
            }
        }
        log::debug!("loaded {} OD records", records.len());
        return Ok(records);
    }
}

fn parse_field<TT: FromStr>(row: usize, field: &'static str, value: &str) -> Result<TT, LoadError> {
    value.parse().map_err(|_| LoadError::BadField{row, field, value: String::from(value)})
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_positional_parsing() {
        let data = "2025-01-02,7,ASHB,MCAR,12\n2025-01-02,17,MCAR,ASHB,3\n";
        let records = OdRecord::all_from_reader(data.as_bytes(), false).unwrap();
        assert_eq!(records, vec![
            OdRecord::new("ASHB", "MCAR", 7, 12),
            OdRecord::new("MCAR", "ASHB", 17, 3),
        ]);
    }

    #[test]
    fn test_header_parsing() {
        let data = "hour,origin,destination,count\n8, A , B ,100\n";
        let records = OdRecord::all_from_reader(data.as_bytes(), true).unwrap();
        assert_eq!(records, vec![OdRecord::new("A", "B", 8, 100)]);
    }

    #[test]
    fn test_bad_rows() {
        let data = "2025-01-02,seven,ASHB,MCAR,12\n";
        match OdRecord::all_from_reader(data.as_bytes(), false) {
            Err(LoadError::BadField{row, field, value}) => {
                assert_eq!(row, 0);
                assert_eq!(field, "hour");
                assert_eq!(value, "seven");
            }
            other => panic!("expected a bad field, got {:?}", other),
        }

        let data = "origin,destination,hour\nA,B,8\n";
        assert!(matches!(OdRecord::all_from_reader(data.as_bytes(), true),
                         Err(LoadError::MissingField{field: "count", ..})));

        let data = "2025-01-02,7,ASHB,MCAR,-4\n";
        assert!(matches!(OdRecord::all_from_reader(data.as_bytes(), false),
                         Err(LoadError::BadField{field: "count", ..})));
    }

    #[test]
    fn test_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "2025-03-04,9,EMBR,MONT,40")?;
        writeln!(file, "2025-03-04,9,MONT,EMBR,2")?;
        let records = OdRecord::all_from_csv(file.path(), false)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].count, 40);

        let missing = OdRecord::all_from_csv(Path::new("/no/such/od.csv"), false);
        assert!(matches!(missing, Err(LoadError::Io{..})));
        Ok(())
    }
}
