//! Run settings
//!
//! Read from an optional `pipeline.yaml` next to the task tables; every field
//! has a default. Command-line flags are applied afterwards through the
//! `with_*` builders.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sheetdoc_agents::{default_provider_from_env, GenericExtractor, GenericParagraphGenerator};
use sheetdoc_core::{resolve_reference, ConfigError};

/// Settings file name
pub const SETTINGS_FILE: &str = "pipeline.yaml";

/// Settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Directory holding the task tables
    #[serde(skip)]
    pub config_dir: PathBuf,
    /// Document template
    pub template: Option<PathBuf>,
    /// Directory the document and diagnostics are written to
    pub output_dir: PathBuf,
    /// Rendered document file name
    pub output_name: String,
    /// Diagnostics artifact file name
    pub diagnostics_name: String,
    /// Directory prompt references are relative to (defaults to `config_dir`)
    pub prompt_root: Option<PathBuf>,
    /// Divide percentages by 100 during coercion
    pub percent_as_fraction: bool,
    /// Provider used when a task names none
    pub default_provider: String,
    /// Extractor used when a sheet task names none
    pub extractor: String,
    /// Generator used when a paragraph task names none
    pub generator: String,
    /// Value injected for unresolved fill-mode dependencies
    pub fill_placeholder: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            template: None,
            output_dir: PathBuf::from("output"),
            output_name: "report.md".to_string(),
            diagnostics_name: "diagnostics.json".to_string(),
            prompt_root: None,
            percent_as_fraction: true,
            default_provider: default_provider_from_env(),
            extractor: GenericExtractor::NAME.to_string(),
            generator: GenericParagraphGenerator::NAME.to_string(),
            fill_placeholder: "-".to_string(),
        }
    }
}

impl PipelineSettings {
    /// Create default settings rooted at `config_dir`
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    /// Load `pipeline.yaml` from `config_dir` if present
    ///
    /// Relative `template` and `prompt_root` values are taken relative to
    /// `config_dir`; `output_dir` stays relative to the working directory.
    ///
    /// # Errors
    /// [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(SETTINGS_FILE);
        if !path.is_file() {
            return Ok(Self::new(config_dir));
        }
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut settings: Self = match serde_yaml::from_str::<Option<Self>>(&text) {
            Ok(parsed) => parsed.unwrap_or_default(),
            Err(source) => return Err(ConfigError::Parse { path, source }),
        };
        settings.config_dir = config_dir.to_path_buf();
        settings.template = settings.template.map(|t| anchor(config_dir, &t));
        settings.prompt_root = settings.prompt_root.map(|p| anchor(config_dir, &p));
        tracing::debug!(path = %path.display(), "pipeline settings loaded");
        Ok(settings)
    }

    /// With document template
    #[inline]
    #[must_use]
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// With output directory
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// With output file name
    #[inline]
    #[must_use]
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// With prompt root
    #[inline]
    #[must_use]
    pub fn with_prompt_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.prompt_root = Some(root.into());
        self
    }

    /// With percentage handling
    #[inline]
    #[must_use]
    pub fn with_percent_as_fraction(mut self, enabled: bool) -> Self {
        self.percent_as_fraction = enabled;
        self
    }

    /// With default provider
    #[inline]
    #[must_use]
    pub fn with_default_provider(mut self, provider: impl Into<String>) -> Self {
        self.default_provider = provider.into();
        self
    }

    /// Directory prompts resolve against
    #[must_use]
    pub fn prompt_root(&self) -> &Path {
        self.prompt_root.as_deref().unwrap_or(&self.config_dir)
    }

    /// Full path of the rendered document
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }

    /// Full path of the diagnostics artifact
    #[must_use]
    pub fn diagnostics_path(&self) -> PathBuf {
        self.output_dir.join(&self.diagnostics_name)
    }
}

fn anchor(root: &Path, path: &Path) -> PathBuf {
    resolve_reference(root, &path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::load(dir.path()).unwrap();
        assert_eq!(settings.config_dir, dir.path());
        assert!(settings.percent_as_fraction);
        assert_eq!(settings.fill_placeholder, "-");
        assert_eq!(settings.prompt_root(), dir.path());
        assert_eq!(settings.extractor, "GenericExtractor");
    }

    #[test]
    fn file_values_anchor_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            "template: templates/report.hbs\noutput_dir: out\npercent_as_fraction: false\ndefault_provider: qwen\n",
        )
        .unwrap();
        let settings = PipelineSettings::load(dir.path()).unwrap();
        assert_eq!(settings.template, Some(dir.path().join("templates/report.hbs")));
        assert_eq!(settings.output_path(), PathBuf::from("out").join("report.md"));
        assert!(!settings.percent_as_fraction);
        assert_eq!(settings.default_provider, "qwen");
    }

    #[test]
    fn empty_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "").unwrap();
        assert!(PipelineSettings::load(dir.path()).is_ok());
    }

    #[test]
    fn invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "percent_as_fraction: [").unwrap();
        assert!(matches!(
            PipelineSettings::load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn builders_override() {
        let settings = PipelineSettings::new("cfg")
            .with_output_dir("/tmp/out")
            .with_output_name("doc.md")
            .with_percent_as_fraction(false);
        assert_eq!(settings.output_path(), PathBuf::from("/tmp/out/doc.md"));
        assert!(!settings.percent_as_fraction);
    }
}
