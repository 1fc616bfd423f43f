//! Per-form policy lookup.

use std::collections::HashMap;

use formgate_common::{FormPolicy, GateError, MinScore};

use crate::config::FormSettings;

/// Read-only `form_id -> policy` lookup
pub trait PolicyStore: Send + Sync {
    /// Configured policy for a form, if any
    fn lookup(&self, form_id: &str) -> Option<FormPolicy>;

    /// Policy for a form, falling back to `action = form_id, min_score = 0.5`
    fn policy_for(&self, form_id: &str) -> FormPolicy {
        self.lookup(form_id)
            .unwrap_or_else(|| FormPolicy::fallback(form_id))
    }
}

/// Policies loaded from the `[forms]` configuration table
#[derive(Debug, Clone, Default)]
pub struct ConfiguredPolicies {
    forms: HashMap<String, FormPolicy>,
}

impl ConfiguredPolicies {
    pub fn new(policies: impl IntoIterator<Item = FormPolicy>) -> Self {
        Self {
            forms: policies
                .into_iter()
                .map(|p| (p.form_id.clone(), p))
                .collect(),
        }
    }

    /// Validate and normalise the configured forms.
    ///
    /// Form IDs and actions are trimmed and blank form IDs skipped. A score of
    /// 0 reads as unset. An action outside the widget's alphabet or a score
    /// outside [0, 1] is an error.
    pub fn from_settings(settings: &HashMap<String, FormSettings>) -> Result<Self, GateError> {
        let mut forms = HashMap::new();

        for (raw_id, entry) in settings {
            let form_id = raw_id.trim();
            if form_id.is_empty() {
                continue;
            }

            if let Some(action) = entry.action.as_deref().map(str::trim) {
                if !action.is_empty() && !is_valid_action(action) {
                    return Err(GateError::Config(format!(
                        "form {form_id}: action {action:?} may only contain alphanumeric characters, slashes and underscores"
                    )));
                }
            }

            let min_score = match entry.score.filter(|score| *score != 0.0) {
                Some(score) => Some(MinScore::try_new(score).ok_or_else(|| {
                    GateError::Config(format!(
                        "form {form_id}: score {score} is outside [0, 1]"
                    ))
                })?),
                None => None,
            };

            let policy = FormPolicy::resolve(form_id, entry.action.as_deref(), min_score);
            forms.insert(form_id.to_string(), policy);
        }

        Ok(Self { forms })
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl PolicyStore for ConfiguredPolicies {
    fn lookup(&self, form_id: &str) -> Option<FormPolicy> {
        self.forms.get(form_id).cloned()
    }
}

fn is_valid_action(action: &str) -> bool {
    action
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '_')
}
