use std::path::Path;
use std::path::PathBuf;

use yaml_rust::Yaml;

use super::errors::ConfigError;


pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}

fn wrong_type(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType{key: String::from(key), expected}
}

/// Reads a number, accepting both yaml integers and reals.
pub fn yaml_to_f64(value: &Yaml) -> Option<f64> {
    match value {
        Yaml::Real(_) => value.as_f64(),
        Yaml::Integer(ii) => Some(*ii as f64),
        _ => None,
    }
}

pub fn opt_f64(yaml: &Yaml, key: &str) -> Result<Option<f64>, ConfigError> {
    let value = &yaml[key];
    if value.is_badvalue() {
        return Ok(None);
    }
    match yaml_to_f64(value) {
        Some(ff) => Ok(Some(ff)),
        None => Err(wrong_type(key, "a number")),
    }
}

pub fn opt_u32(yaml: &Yaml, key: &str) -> Result<Option<u32>, ConfigError> {
    let value = &yaml[key];
    if value.is_badvalue() {
        return Ok(None);
    }
    match value.as_i64() {
        Some(ii) if ii >= 0 && ii <= u32::MAX as i64 => Ok(Some(ii as u32)),
        _ => Err(wrong_type(key, "a non-negative integer")),
    }
}

pub fn opt_bool(yaml: &Yaml, key: &str) -> Result<Option<bool>, ConfigError> {
    let value = &yaml[key];
    if value.is_badvalue() {
        return Ok(None);
    }
    match value.as_bool() {
        Some(bb) => Ok(Some(bb)),
        None => Err(wrong_type(key, "a boolean")),
    }
}

pub fn opt_str<'a>(yaml: &'a Yaml, key: &str) -> Result<Option<&'a str>, ConfigError> {
    let value = &yaml[key];
    if value.is_badvalue() {
        return Ok(None);
    }
    match value.as_str() {
        Some(ss) => Ok(Some(ss)),
        None => Err(wrong_type(key, "a string")),
    }
}

/// Reads a list of station codes.  Codes like 16TH or 12TH are fine as plain strings, but a yaml
/// author may write an all-digit code unquoted, so integers are accepted too.
pub fn yaml_to_str_list(value: &Yaml, key: &str) -> Result<Vec<String>, ConfigError> {
    let items = match value.as_vec() {
        Some(items) => items,
        None => return Err(wrong_type(key, "a list of strings")),
    };
    items.iter().map(|item| match item {
        Yaml::String(ss) => Ok(ss.clone()),
        Yaml::Integer(ii) => Ok(ii.to_string()),
        _ => Err(wrong_type(key, "a list of strings")),
    }).collect()
}

pub fn yaml_to_int_list(value: &Yaml, key: &str) -> Result<Vec<i64>, ConfigError> {
    let items = match value.as_vec() {
        Some(items) => items,
        None => return Err(wrong_type(key, "a list of integers")),
    };
    items.iter().map(|item| item.as_i64().ok_or_else(|| wrong_type(key, "a list of integers")))
        .collect()
}

/// Iterates over the entries of a yaml mapping whose keys are strings.
pub fn yaml_hash_entries<'a>(value: &'a Yaml, key: &str)
                             -> Result<Vec<(&'a str, &'a Yaml)>, ConfigError> {
    let hash = match value.as_hash() {
        Some(hash) => hash,
        None => return Err(wrong_type(key, "a mapping")),
    };
    hash.iter().map(|(kk, vv)| match kk.as_str() {
        Some(name) => Ok((name, vv)),
        None => Err(wrong_type(key, "a mapping with string keys")),
    }).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use yaml_rust::YamlLoader;

    #[test]
    fn test_absolute_path() {
        let base = Path::new("/etc/configs");
        assert_eq!(str_to_absolute_path("data/od.csv", base),
                   PathBuf::from("/etc/configs/data/od.csv"));
        assert_eq!(str_to_absolute_path("/tmp/od.csv", base), PathBuf::from("/tmp/od.csv"));
    }

    #[test]
    fn test_typed_getters() {
        let docs = YamlLoader::load_from_str(
            "aa: 4\nbb: 2.5\ncc: true\ndd: [16TH, 12, MONT]\nee: name\n").unwrap();
        let doc = &docs[0];
        assert_eq!(opt_f64(doc, "aa").unwrap(), Some(4.));
        assert_eq!(opt_f64(doc, "bb").unwrap(), Some(2.5));
        assert_eq!(opt_f64(doc, "zz").unwrap(), None);
        assert!(opt_f64(doc, "cc").is_err());
        assert_eq!(opt_u32(doc, "aa").unwrap(), Some(4));
        assert!(opt_u32(doc, "bb").is_err());
        assert_eq!(opt_bool(doc, "cc").unwrap(), Some(true));
        assert_eq!(opt_str(doc, "ee").unwrap(), Some("name"));
        assert_eq!(yaml_to_str_list(&doc["dd"], "dd").unwrap(),
                   vec!["16TH".to_string(), "12".to_string(), "MONT".to_string()]);
    }
}
