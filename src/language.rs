//! Per-project language configuration.
//!
//! A [`LanguageConfig`] tells the pipeline template which languages to
//! generate server and client bindings for, and where generated code for each
//! language lives relative to the project root. [`LanguageSettings`] is the
//! implementation built from workspace manifest entries.

use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Deserializer};

/// Identifier of a binding target language such as `cxx` or `python`.
///
/// Names are normalised to lower case so `Python` and `python` denote the
/// same language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Language(String);

impl Language {
    /// Create a language identifier, normalising it to lower case.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// Borrow the normalised name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Language selection and output naming for one project.
pub trait LanguageConfig {
    /// Languages to generate server bindings for, in build order.
    fn server_languages(&self) -> &[Language];

    /// Languages to generate client bindings for, in build order.
    fn client_languages(&self) -> &[Language];

    /// Directory, relative to the project root, receiving the server
    /// implementation generated from the interface file `base`.
    fn server_root_dir(&self, language: &Language, base: &str) -> Utf8PathBuf;

    /// Directory, relative to the project root, receiving the client
    /// bindings generated from the interface file `base`.
    fn client_root_dir(&self, language: &Language, base: &str) -> Utf8PathBuf;
}

/// Language settings as declared in a workspace manifest.
///
/// Server implementations land in `server-<language>-<base>` and client
/// bindings in `client-<language>`.
///
/// ```
/// use camino::Utf8PathBuf;
/// use sidlbuild::language::{Language, LanguageConfig, LanguageSettings};
///
/// let settings = LanguageSettings::default()
///     .with_server("CXX")
///     .with_client("python");
/// assert_eq!(settings.server_languages(), &[Language::new("cxx")]);
/// assert_eq!(
///     settings.server_root_dir(&Language::new("cxx"), "solver"),
///     Utf8PathBuf::from("server-cxx-solver")
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageSettings {
    /// Server languages, duplicates removed.
    pub server: Vec<Language>,
    /// Client languages, duplicates removed.
    pub client: Vec<Language>,
}

fn push_unique(languages: &mut Vec<Language>, language: Language) {
    if !languages.contains(&language) {
        languages.push(language);
    }
}

impl LanguageSettings {
    /// Request server bindings for `language`.
    #[must_use]
    pub fn with_server(mut self, language: &str) -> Self {
        self.add_server(Language::new(language));
        self
    }

    /// Request client bindings for `language`.
    #[must_use]
    pub fn with_client(mut self, language: &str) -> Self {
        self.add_client(Language::new(language));
        self
    }

    /// Request server bindings for `language` unless already requested.
    pub fn add_server(&mut self, language: Language) {
        push_unique(&mut self.server, language);
    }

    /// Request client bindings for `language` unless already requested.
    pub fn add_client(&mut self, language: Language) {
        push_unique(&mut self.client, language);
    }
}

impl LanguageConfig for LanguageSettings {
    fn server_languages(&self) -> &[Language] {
        &self.server
    }

    fn client_languages(&self) -> &[Language] {
        &self.client
    }

    fn server_root_dir(&self, language: &Language, base: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("server-{language}-{base}"))
    }

    fn client_root_dir(&self, language: &Language, _base: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("client-{language}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_names_are_normalised() {
        assert_eq!(Language::new(" Python "), Language::new("python"));
        assert_eq!(Language::from("CXX").as_str(), "cxx");
    }

    #[test]
    fn adding_a_language_twice_keeps_one_entry() {
        let settings = LanguageSettings::default()
            .with_server("cxx")
            .with_server("python")
            .with_server("CXX");
        assert_eq!(
            settings.server_languages(),
            &[Language::new("cxx"), Language::new("python")]
        );
        assert!(settings.client_languages().is_empty());
    }

    #[test]
    fn client_root_ignores_base_name() {
        let settings = LanguageSettings::default();
        assert_eq!(
            settings.client_root_dir(&Language::new("python"), "solver"),
            Utf8PathBuf::from("client-python")
        );
    }
}
