use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::Arc;
use unic_langid::LanguageIdentifier;

/// Fallback locale used when the user's language is unknown or unsupported
pub const DEFAULT_LANGUAGE: &str = "en";

const LOCALES: [(&str, &str); 2] = [
    ("en", include_str!("../locales/en/main.ftl")),
    ("fr", include_str!("../locales/fr/main.ftl")),
];

/// Localization manager for the bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl std::fmt::Debug for LocalizationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut languages: Vec<&String> = self.bundles.keys().collect();
        languages.sort();
        f.debug_struct("LocalizationManager")
            .field("languages", &languages)
            .finish()
    }
}

impl LocalizationManager {
    /// Create a new localization manager
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (locale_str, source) in LOCALES {
            let locale: LanguageIdentifier = locale_str.parse()?;
            let bundle = Self::create_bundle(&locale, source)?;
            bundles.insert(locale_str.to_string(), bundle);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(
        locale: &LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Telegram renders the FSI/PDI isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid {locale} resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate {locale} messages: {errors:?}"))?;

        Ok(bundle)
    }

    /// Get a localized message in a specific language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&FluentArgs>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {}", key),
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            tracing::warn!(key = %key, language = %language, errors = ?errors, "Fluent formatting errors");
        }
        value.into_owned()
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Detect the appropriate language based on user's Telegram language code
    pub fn detect_language(&self, language_code: Option<&str>) -> String {
        if let Some(code) = language_code {
            // Extract language code (e.g., "fr-FR" -> "fr", "en-US" -> "en")
            let lang = code
                .split(['-', '_'])
                .next()
                .unwrap_or(DEFAULT_LANGUAGE)
                .to_ascii_lowercase();

            if self.is_language_supported(&lang) {
                return lang;
            }
        }

        DEFAULT_LANGUAGE.to_string()
    }

    /// Get a localized message in the user's language
    pub fn t(&self, key: &str, language_code: Option<&str>) -> String {
        let language = self.detect_language(language_code);
        self.get_message_in_language(key, &language, None)
    }

    /// Get a localized message with arguments in the user's language
    pub fn t_args(&self, key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
        let language = self.detect_language(language_code);
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, FluentValue::from(*value));
        }
        self.get_message_in_language(key, &language, Some(&fluent_args))
    }
}

/// Create the shared localization manager
pub fn create_localization_manager() -> Result<Arc<LocalizationManager>> {
    Ok(Arc::new(LocalizationManager::new()?))
}
