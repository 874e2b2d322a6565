//! Sectioned key/value settings store
//!
//! Settings are grouped as file → section → key. Each file is kept in memory
//! once touched and persisted as `<folder>/<file>.ron`, which keeps the kind
//! of every stored [`Variant`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::logging::{debug, error, warn};
use crate::foundation::variant::Variant;

/// File extension of settings files
pub const CONFIG_FILE_EXTENSION: &str = "ron";

/// Normalise a file, section or key name
///
/// Trims, lower-cases and replaces `' '`, `'='` and `'/'` with `'_'`.
pub fn prepare_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, ' ' | '=' | '/') { '_' } else { c })
        .collect()
}

/// True if a file id stays inside the config folder
pub fn is_file_path_secure(file: &str) -> bool {
    if file.trim().is_empty() {
        error!("Config file id must not be empty");
        return false;
    }
    let secure = !Path::new(file).is_absolute() && !file.starts_with('/') && !file.contains("..");
    if !secure {
        error!("Config file id is not permitted: {file}");
    }
    secure
}

/// Keys of one section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSection {
    /// Values by prepared key
    pub keys: BTreeMap<String, Variant>,
}

/// In-memory contents of one settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFile {
    /// Sections by prepared name
    pub sections: BTreeMap<String, ConfigSection>,
}

impl Config for ConfigFile {}

impl ConfigFile {
    /// Value of a key, `default` if absent
    pub fn get(&self, section: &str, key: &str, default: Variant) -> Variant {
        self.sections
            .get(&prepare_name(section))
            .and_then(|s| s.keys.get(&prepare_name(key)))
            .cloned()
            .unwrap_or(default)
    }

    /// Set a key in memory
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<Variant>) {
        self.sections
            .entry(prepare_name(section))
            .or_default()
            .keys
            .insert(prepare_name(key), value.into());
    }

    /// True if the section holds the key
    pub fn has_key(&self, section: &str, key: &str) -> bool {
        self.sections
            .get(&prepare_name(section))
            .is_some_and(|s| s.keys.contains_key(&prepare_name(key)))
    }
}

/// File, section and key of a setting with its value and default
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigData {
    /// File id
    pub file: String,
    /// Section name
    pub section: String,
    /// Key
    pub key: String,
    /// Value to write
    pub value: Variant,
    /// Value returned when the key is absent
    pub default_value: Variant,
}

impl ConfigData {
    /// Location without a key, for reading several keys of one section
    pub fn new(file: &str, section: &str) -> Self {
        Self {
            file: file.to_string(),
            section: section.to_string(),
            ..Self::default()
        }
    }

    /// Set the key
    #[must_use]
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    /// Set the value to write
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Variant>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the default returned by reads
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Variant>) -> Self {
        self.default_value = value.into();
        self
    }

    fn is_complete(&self) -> bool {
        !self.file.is_empty() && !self.section.is_empty() && !self.key.is_empty()
    }
}

/// Settings store rooted at a config folder
#[derive(Debug, Default)]
pub struct ConfigApi {
    folder: Option<PathBuf>,
    files: HashMap<String, ConfigFile>,
}

impl ConfigApi {
    /// Store with no folder; every access fails until
    /// [`ConfigApi::prepare_data_folder`] is called
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the folder if needed and use it for settings files
    pub fn prepare_data_folder(&mut self, folder: impl AsRef<Path>) -> Result<(), ConfigError> {
        let folder = folder.as_ref();
        std::fs::create_dir_all(folder).map_err(|e| {
            error!("Failed to create config folder {}: {e}", folder.display());
            e
        })?;
        debug!("Config folder prepared at {}", folder.display());
        self.folder = Some(folder.to_path_buf());
        self.files.clear();
        Ok(())
    }

    /// Prepared config folder
    pub fn data_folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    /// Path of a settings file
    pub fn file_path(&self, file: &str) -> Result<PathBuf, ConfigError> {
        let folder = self.folder.as_ref().ok_or(ConfigError::NotPrepared)?;
        let file = self.checked_file_id(file)?;
        Ok(folder.join(format!("{file}.{CONFIG_FILE_EXTENSION}")))
    }

    fn checked_file_id(&self, file: &str) -> Result<String, ConfigError> {
        if self.folder.is_none() {
            error!("Config folder has not been prepared");
            return Err(ConfigError::NotPrepared);
        }
        let file = prepare_name(file);
        if is_file_path_secure(&file) {
            Ok(file)
        } else {
            Err(ConfigError::InsecurePath(file))
        }
    }

    /// Settings file, loaded from disk on first access
    pub fn get_file(&mut self, file: &str) -> Result<&mut ConfigFile, ConfigError> {
        let id = self.checked_file_id(file)?;
        if !self.files.contains_key(&id) {
            let path = self.file_path(&id)?;
            let contents = if path.exists() {
                ConfigFile::load_from_file(&path)?
            } else {
                ConfigFile::default()
            };
            self.files.insert(id.clone(), contents);
        }
        self.files.get_mut(&id).ok_or(ConfigError::IncompleteData)
    }

    /// Persist a settings file
    pub fn write_file(&mut self, file: &str) -> Result<(), ConfigError> {
        let path = self.file_path(file)?;
        self.get_file(file)?.save_to_file(&path)
    }

    /// True if the key exists
    pub fn has_key(&mut self, file: &str, section: &str, key: &str) -> Result<bool, ConfigError> {
        Ok(self.get_file(file)?.has_key(section, key))
    }

    /// Value of a key, `default` if absent
    pub fn read(&mut self, file: &str, section: &str, key: &str, default: Variant) -> Result<Variant, ConfigError> {
        Ok(self.get_file(file)?.get(section, key, default))
    }

    /// Set a key and persist its file
    pub fn write(
        &mut self,
        file: &str,
        section: &str,
        key: &str,
        value: impl Into<Variant>,
    ) -> Result<(), ConfigError> {
        self.get_file(file)?.set(section, key, value);
        self.write_file(file)
    }

    /// [`ConfigApi::read`] driven by a [`ConfigData`]
    pub fn read_data(&mut self, data: &ConfigData) -> Result<Variant, ConfigError> {
        if !data.is_complete() {
            warn!("Config data needs a file, section and key to read");
            return Err(ConfigError::IncompleteData);
        }
        self.read(&data.file, &data.section, &data.key, data.default_value.clone())
    }

    /// [`ConfigApi::write`] driven by a [`ConfigData`]; the value must be set
    pub fn write_data(&mut self, data: &ConfigData) -> Result<(), ConfigError> {
        if !data.is_complete() || data.value.is_empty() {
            warn!("Config data needs a file, section, key and value to write");
            return Err(ConfigError::IncompleteData);
        }
        self.write(&data.file, &data.section, &data.key, data.value.clone())
    }

    /// Existing value of a key, or `default` after writing it
    pub fn declare_setting(
        &mut self,
        file: &str,
        section: &str,
        key: &str,
        default: impl Into<Variant>,
    ) -> Result<Variant, ConfigError> {
        let default = default.into();
        if self.has_key(file, section, key)? {
            return self.read(file, section, key, default);
        }
        self.write(file, section, key, default.clone())?;
        Ok(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Color, IntRect, IntVector2, Mat3, Mat3x4, Mat4, Quat, Vec2, Vec3, Vec4};

    fn temp_folder(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("scene_engine_store_{}_{name}", std::process::id()))
    }

    fn sample_values() -> Vec<Variant> {
        vec![
            Variant::Int(-1_234_567),
            Variant::Bool(true),
            Variant::Float(0.125),
            Vec2::new(0.6, -0.8).into(),
            Vec3::new(0.0, 1.0, 0.25).into(),
            Vec4::new(0.5, 0.5, 0.5, -0.5).into(),
            Quat::from_euler_angles(0.1, 0.2, 0.3).into(),
            Color::new(0.1, 0.2, 0.3, 0.4).into(),
            "This [is] a = a test } { @ ?!".into(),
            IntRect::new(-4, 8, 15, 16).into(),
            IntVector2::new(23, -42).into(),
            Mat3::from_fn(|r, c| (r * 3 + c) as f32 * 0.5).into(),
            Mat3x4::from_fn(|r, c| (r * 4 + c) as f32 - 3.0).into(),
            Mat4::from_fn(|r, c| (r * 4 + c) as f32 / 7.0).into(),
        ]
    }

    fn key_for(value: &Variant) -> String {
        format!("Test {}", value.type_name())
    }

    fn assert_same(read: &Variant, expected: &Variant) {
        assert_eq!(read.variant_type(), expected.variant_type());
        assert_eq!(read.to_string(), expected.to_string());
    }

    #[test]
    fn test_prepare_name() {
        assert_eq!(prepare_name("  Config Test "), "config_test");
        assert_eq!(prepare_name("a=b/c"), "a_b_c");
    }

    #[test]
    fn test_insecure_file_ids() {
        let mut api = ConfigApi::new();
        api.prepare_data_folder(temp_folder("secure")).unwrap();
        assert!(matches!(api.get_file("../escape"), Err(ConfigError::InsecurePath(_))));
        assert!(matches!(api.get_file("   "), Err(ConfigError::InsecurePath(_))));
        assert!(api.get_file("plain").is_ok());
        let _ = std::fs::remove_dir_all(temp_folder("secure"));
    }

    #[test]
    fn test_unprepared_store() {
        let mut api = ConfigApi::new();
        assert!(matches!(
            api.read("file", "section", "key", Variant::Empty),
            Err(ConfigError::NotPrepared)
        ));
    }

    #[test]
    fn test_write_and_read_every_kind() {
        let folder = temp_folder("kinds");
        let mut api = ConfigApi::new();
        api.prepare_data_folder(&folder).unwrap();
        let values = sample_values();

        let location = ConfigData::new("Config Test", "Test Write");
        for value in &values {
            let data = location.clone().with_key(&key_for(value)).with_value(value.clone());
            api.write_data(&data).unwrap();
            assert_same(&api.read_data(&data).unwrap(), value);
        }

        let file = api.get_file("Config Test File").unwrap();
        for value in &values {
            file.set("Test Write File", &key_for(value), value.clone());
            assert_same(&file.get("Test Write File", &key_for(value), Variant::Empty), value);
        }
        api.write_file("Config Test File").unwrap();

        let mut reloaded = ConfigApi::new();
        reloaded.prepare_data_folder(&folder).unwrap();
        for value in &values {
            let key = key_for(value);
            assert_same(&reloaded.read("config test", "test write", &key, Variant::Empty).unwrap(), value);
            assert_same(
                &reloaded.read("config test file", "test write file", &key, Variant::Empty).unwrap(),
                value,
            );
        }
        let _ = std::fs::remove_dir_all(&folder);
    }

    #[test]
    fn test_declare_setting() {
        let folder = temp_folder("declare");
        let mut api = ConfigApi::new();
        api.prepare_data_folder(&folder).unwrap();

        assert_eq!(api.declare_setting("framework", "ui", "scale", 2.0f32).unwrap(), Variant::Float(2.0));
        api.write("framework", "ui", "scale", 1.5f32).unwrap();
        assert_eq!(api.declare_setting("framework", "ui", "scale", 2.0f32).unwrap(), Variant::Float(1.5));
        assert!(api.has_key("Framework", "UI", "Scale").unwrap());
        let _ = std::fs::remove_dir_all(&folder);
    }

    #[test]
    fn test_incomplete_data() {
        let mut api = ConfigApi::new();
        api.prepare_data_folder(temp_folder("incomplete")).unwrap();
        let data = ConfigData::new("file", "section");
        assert!(matches!(api.read_data(&data), Err(ConfigError::IncompleteData)));
        assert!(matches!(api.write_data(&data.with_key("k")), Err(ConfigError::IncompleteData)));
        let _ = std::fs::remove_dir_all(temp_folder("incomplete"));
    }
}
