// Configuration loading

pub mod settings;

pub use settings::{parse_delimiter, InputSettings, OutputSettings, Settings, SettingsError};
