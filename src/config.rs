//! `key=value` settings file for the line.
//!
//! ```text
//! # lab adapter
//! device=/dev/ttyUSB0
//! baud=115200
//! data_bits=8
//! parity=n
//! stop_bits=1
//! vmin=0
//! vtime=0
//! ```
//!
//! Comments start with `#`. Lines without a key or a value are ignored, as
//! are keys this crate does not know.
use crate::line::{Baud, DataBits, LineConfig, LineConfigError, Parity, ReadPolicy, StopBits};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Error reading settings: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid value for {key}: {source}")]
    Invalid {
        key: String,
        source: LineConfigError,
    },
}

fn filter_comments(line: &str) -> &str {
    match line.find('#') {
        Some(i) => line[..i].trim(),
        None => line.trim(),
    }
}

fn parse_line(map: &mut HashMap<String, String>, line: &str) {
    let filtered = filter_comments(line);
    let (key, value) = match filtered.split_once('=') {
        Some((k, v)) => (k.trim(), v.trim()),
        None => return,
    };
    if !key.is_empty() && !value.is_empty() {
        map.insert(key.to_string(), value.to_string());
    }
}

pub fn parse<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>, io::Error> {
    let mut kv_pairs = HashMap::new();
    let file = File::open(path)?;
    let reader = io::BufReader::new(file);
    for line in reader.lines() {
        parse_line(&mut kv_pairs, &line?);
    }
    Ok(kv_pairs)
}

/// Values found in a settings file. Anything missing is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub device: Option<String>,
    pub baud: Option<Baud>,
    pub data_bits: Option<DataBits>,
    pub parity: Option<Parity>,
    pub stop_bits: Option<StopBits>,
    pub vmin: Option<u8>,
    pub vtime: Option<u8>,
}

fn field<T>(map: &HashMap<String, String>, key: &str) -> Result<Option<T>, SettingsError>
where
    T: std::str::FromStr<Err = LineConfigError>,
{
    match map.get(key) {
        Some(v) => v.parse().map(Some).map_err(|source| SettingsError::Invalid {
            key: key.to_string(),
            source,
        }),
        None => Ok(None),
    }
}

fn byte(map: &HashMap<String, String>, key: &str) -> Result<Option<u8>, SettingsError> {
    match map.get(key) {
        Some(v) => v.parse().map(Some).map_err(|_| SettingsError::Invalid {
            key: key.to_string(),
            source: LineConfigError::Number(v.clone()),
        }),
        None => Ok(None),
    }
}

impl Settings {
    pub fn from_map(map: &HashMap<String, String>) -> Result<Settings, SettingsError> {
        Ok(Settings {
            device: map.get("device").cloned(),
            baud: field(map, "baud")?,
            data_bits: field(map, "data_bits")?,
            parity: field(map, "parity")?,
            stop_bits: field(map, "stop_bits")?,
            vmin: byte(map, "vmin")?,
            vtime: byte(map, "vtime")?,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings, SettingsError> {
        Settings::from_map(&parse(path)?)
    }

    /// Fill every field that is still `None` from `other`.
    pub fn or(self, other: Settings) -> Settings {
        Settings {
            device: self.device.or(other.device),
            baud: self.baud.or(other.baud),
            data_bits: self.data_bits.or(other.data_bits),
            parity: self.parity.or(other.parity),
            stop_bits: self.stop_bits.or(other.stop_bits),
            vmin: self.vmin.or(other.vmin),
            vtime: self.vtime.or(other.vtime),
        }
    }

    /// Line configuration with defaults (9600 8N1, immediate reads) for
    /// anything not set.
    pub fn line_config(&self) -> LineConfig {
        let default = LineConfig::default();
        let read_policy = ReadPolicy::from_raw(
            self.vmin.unwrap_or(default.read_policy().min_bytes()),
            self.vtime.unwrap_or(default.read_policy().vtime()),
        );
        LineConfig::from_parts(
            self.baud.unwrap_or(default.baud()),
            self.data_bits.unwrap_or(default.data_bits()),
            self.parity.unwrap_or(default.parity()),
            self.stop_bits.unwrap_or(default.stop_bits()),
        )
        .with_read_policy(read_policy)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use std::fs;
    use std::io::Write;
    use std::path::PathBuf;

    fn test_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ttyline-{}-{}", std::process::id(), name));
        File::create(&path).expect("Error creating test cfg file");
        path
    }

    fn delete_file(path: &Path) {
        fs::remove_file(path).expect("Unable to remove test cfg");
    }

    fn write(file: &Path, s: &str) {
        let mut f = fs::OpenOptions::new().append(true).open(file).unwrap();
        f.write_all(s.as_bytes()).unwrap();
        f.write_all(b"\n").unwrap();
    }

    // Invalid paths should return an Error
    #[test]
    fn test_invalid_path() {
        let res = parse("none.text").map_err(|e| e.kind());
        assert_eq!(Err(io::ErrorKind::NotFound), res);
    }

    //Empty hashmap is returned if file is empty
    #[test]
    fn test_empty_file() {
        let file = test_file("cfg1");
        let res = parse(&file).unwrap();
        assert_eq!(0, res.len());
        delete_file(&file);
    }

    // Comments on the same line as kv pairs
    // should be ignored
    #[test]
    fn test_comments() {
        let file = test_file("cfg2");
        write(&file, "#baud=300");
        write(&file, "baud=115200 # fast adapter");
        let res = parse(&file).unwrap();
        assert_eq!(1, res.len());
        assert_eq!(Some(&String::from("115200")), res.get("baud"));
        delete_file(&file);
    }

    // KV pairs with out a key or value are ignored
    #[test]
    fn test_invalid_kvpairs() {
        let file = test_file("cfg3");
        write(&file, "parity=");
        write(&file, "=odd");
        write(&file, "no separator");
        let res = parse(&file).unwrap();
        assert_eq!(0, res.len());
        delete_file(&file);
    }

    #[test]
    fn test_load_settings() {
        let file = test_file("cfg4");
        write(&file, "device = /dev/ttyS1");
        write(&file, "baud=57600");
        write(&file, "data_bits=7");
        write(&file, "parity=E");
        write(&file, "stop_bits=2");
        write(&file, "vtime=5");
        write(&file, "colour=blue");
        let settings = Settings::load(&file).unwrap();
        delete_file(&file);

        assert_eq!(Some("/dev/ttyS1".to_string()), settings.device);
        assert_eq!(Some(Parity::Even), settings.parity);
        assert_eq!(None, settings.vmin);
        let config = settings.line_config();
        assert_eq!("57600 7E2", config.to_string());
        assert_eq!(ReadPolicy::from_raw(0, 5), config.read_policy());
    }

    #[test]
    fn test_invalid_value_names_key() {
        let mut map = HashMap::new();
        map.insert("data_bits".to_string(), "4".to_string());
        match Settings::from_map(&map) {
            Err(SettingsError::Invalid { key, source }) => {
                assert_eq!("data_bits", key);
                assert_eq!(LineConfigError::DataBits(4), source);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut map = HashMap::new();
        map.insert("vmin".to_string(), "300".to_string());
        assert!(matches!(
            Settings::from_map(&map),
            Err(SettingsError::Invalid { .. })
        ));
    }

    #[test]
    fn test_or_prefers_self() {
        let cli = Settings {
            baud: Some(Baud::B115200),
            ..Settings::default()
        };
        let file = Settings {
            device: Some("/dev/ttyS0".to_string()),
            baud: Some(Baud::B300),
            ..Settings::default()
        };
        let merged = cli.or(file);
        assert_eq!(Some(Baud::B115200), merged.baud);
        assert_eq!(Some("/dev/ttyS0".to_string()), merged.device);
    }

    #[test]
    fn test_empty_settings_give_defaults() {
        assert_eq!(LineConfig::default(), Settings::default().line_config());
    }
}
