// Compiled asset configuration
// Turns the declarative `assets` section into matchers ready for request handling

use super::types::{AssetSettings, HtmlHandling, NotFoundHandling};
use crate::error::ConfigurationError;
use crate::http::headers::{compile_header_rules, HeaderRules};
use crate::logger;
use crate::resolver::{compile_redirect_rules, RedirectRules};

/// Immutable, pre-compiled configuration shared by all requests
#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub html_handling: HtmlHandling,
    pub not_found_handling: NotFoundHandling,
    pub serve_directly: bool,
    pub header_rules: HeaderRules,
    pub redirect_rules: RedirectRules,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            html_handling: HtmlHandling::default(),
            not_found_handling: NotFoundHandling::default(),
            serve_directly: true,
            header_rules: HeaderRules::empty(),
            redirect_rules: RedirectRules::empty(),
        }
    }
}

impl AssetConfig {
    /// Compile settings, degrading a broken rule set to "no rules"
    ///
    /// Configuration errors are logged; they never stop requests from being served.
    pub fn compile(settings: &AssetSettings) -> Self {
        let header_rules = compile_header_rules(&settings.headers).unwrap_or_else(|e| {
            logger::log_config_error("headers", &e);
            HeaderRules::empty()
        });
        let redirect_rules = compile_redirect_rules(&settings.redirects).unwrap_or_else(|e| {
            logger::log_config_error("redirects", &e);
            RedirectRules::empty()
        });

        Self {
            html_handling: settings.html_handling,
            not_found_handling: settings.not_found_handling,
            serve_directly: settings.serve_directly,
            header_rules,
            redirect_rules,
        }
    }

    /// Compile settings, failing on the first configuration error
    pub fn try_compile(settings: &AssetSettings) -> Result<Self, ConfigurationError> {
        Ok(Self {
            html_handling: settings.html_handling,
            not_found_handling: settings.not_found_handling,
            serve_directly: settings.serve_directly,
            header_rules: compile_header_rules(&settings.headers)?,
            redirect_rules: compile_redirect_rules(&settings.redirects)?,
        })
    }
}
