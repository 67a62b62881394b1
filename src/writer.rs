use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::PipelineError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Serialize `data` as compact UTF-8 JSON to `dir/file_name`, replacing any
/// previous file. Returns the bytes written.
pub fn write_json<T: Serialize + ?Sized>(
    dir: &Path,
    file_name: &str,
    data: &T,
) -> Result<u64, PipelineError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);

    let mut out = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(&mut out, data)?;
    out.flush()?;
    drop(out);

    let size = fs::metadata(&path)?.len();
    log::info!(
        "-> {} ({:.2} MB)",
        path.display(),
        size as f64 / BYTES_PER_MB
    );
    Ok(size)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::sanitize::Number;

    #[test]
    fn writes_compact_json_with_string_year_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut data: BTreeMap<i32, Vec<Number>> = BTreeMap::new();
        data.insert(2022, vec![Number::Float(1.5), Number::Int(3)]);
        data.insert(2021, vec![]);

        let size = write_json(dir.path(), "out.json", &data).unwrap();
        let text = fs::read_to_string(dir.path().join("out.json")).unwrap();
        assert_eq!(text, r#"{"2021":[],"2022":[1.5,3]}"#);
        assert_eq!(size, text.len() as u64);
    }

    #[test]
    fn keeps_non_ascii_as_utf8() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), "names.json", &["Côte d'Ivoire"]).unwrap();
        let text = fs::read_to_string(dir.path().join("names.json")).unwrap();
        assert_eq!(text, r#"["Côte d'Ivoire"]"#);
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        write_json(&nested, "empty.json", &BTreeMap::<String, u8>::new()).unwrap();
        let text = fs::read_to_string(nested.join("empty.json")).unwrap();
        assert_eq!(text, "{}");
    }
}
