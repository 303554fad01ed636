//! Localized refusal and error messages
//!
//! Lookups never fall back to another language: an absent language is a
//! configuration error surfaced as `MissingLocalization`.

use std::collections::HashMap;

use crate::error::{Result, WorkflowError};

/// Substitution point in refusal templates
pub const REASON_PLACEHOLDER: &str = "{reason}";

const BUILTIN_REFUSALS: &[(&str, &str)] = &[
    ("english", "I'm sorry, but I can't help with that request. Reason: {reason}"),
    ("spanish", "Lo siento, pero no puedo ayudar con esa solicitud. Motivo: {reason}"),
    ("portuguese", "Desculpe, mas não posso ajudar com essa solicitação. Motivo: {reason}"),
    ("french", "Désolé, mais je ne peux pas répondre à cette demande. Raison : {reason}"),
];

const BUILTIN_ERRORS: &[(&str, &str)] = &[
    ("english", "Something went wrong while processing your message. Please try again."),
    ("spanish", "Algo salió mal al procesar tu mensaje. Por favor, inténtalo de nuevo."),
    ("portuguese", "Algo deu errado ao processar sua mensagem. Por favor, tente novamente."),
    ("french", "Une erreur s'est produite lors du traitement de votre message. Veuillez réessayer."),
];

/// Language → template tables for refusals and generic errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageCatalog {
    refusals: HashMap<String, String>,
    errors: HashMap<String, String>,
}

impl MessageCatalog {
    /// Catalog with no languages at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog with the built-in english, spanish, portuguese and french texts
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for (language, template) in BUILTIN_REFUSALS {
            catalog
                .refusals
                .insert(language.to_string(), template.to_string());
        }
        for (language, text) in BUILTIN_ERRORS {
            catalog.errors.insert(language.to_string(), text.to_string());
        }
        catalog
    }

    /// Add or replace a refusal template
    ///
    /// The template must contain `{reason}` exactly once.
    pub fn insert_refusal(
        &mut self,
        language: &str,
        template: impl Into<String>,
    ) -> Result<&mut Self> {
        let template = template.into();
        let language = normalize(language);
        match template.matches(REASON_PLACEHOLDER).count() {
            1 => {}
            n => {
                return Err(WorkflowError::InvalidTemplate {
                    language,
                    reason: format!("expected exactly one {} placeholder, found {}", REASON_PLACEHOLDER, n),
                })
            }
        }
        self.refusals.insert(language, template);
        Ok(self)
    }

    /// Add or replace a generic error message
    pub fn insert_error(&mut self, language: &str, text: impl Into<String>) -> &mut Self {
        self.errors.insert(normalize(language), text.into());
        self
    }

    /// Render the refusal for `language` with `reason` substituted
    pub fn refusal(&self, language: &str, reason: &str) -> Result<String> {
        let language = normalize(language);
        let template = self
            .refusals
            .get(&language)
            .ok_or(WorkflowError::MissingLocalization { language })?;
        Ok(template.replacen(REASON_PLACEHOLDER, reason, 1))
    }

    /// Localized "something went wrong" text
    pub fn generic_error(&self, language: &str) -> Result<&str> {
        let language = normalize(language);
        match self.errors.get(&language) {
            Some(text) => Ok(text.as_str()),
            None => Err(WorkflowError::MissingLocalization { language }),
        }
    }

    pub fn has_language(&self, language: &str) -> bool {
        self.refusals.contains_key(&normalize(language))
    }

    /// Languages with a refusal template, sorted
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.refusals.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }
}

fn normalize(language: &str) -> String {
    language.trim().to_lowercase()
}
