//! Locator templating: `~`, `$VAR` and `${VAR}`.
//!
//! Variables resolve from the config's `[env]` table first, then the process
//! environment. `ROOT_PATH` falls back to `.` when neither defines it. Unknown
//! variables are left in place so the failing locator shows up verbatim in
//! the load diagnostics.

use std::borrow::Cow;
use std::collections::BTreeMap;

use tally_recon::ReconConfig;

pub const ROOT_PATH: &str = "ROOT_PATH";

#[derive(Debug, Clone, Default)]
pub struct Expander {
    vars: BTreeMap<String, String>,
}

impl Expander {
    /// Values of `table` may themselves reference the process environment.
    pub fn new(table: &BTreeMap<String, String>) -> Self {
        let base = Self::default();
        let vars = table
            .iter()
            .map(|(k, v)| (k.clone(), base.expand(v)))
            .collect();
        Self { vars }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if let Some(v) = self.vars.get(name) {
            return Some(v.clone());
        }
        match std::env::var(name) {
            Ok(v) => Some(v),
            Err(_) if name == ROOT_PATH => Some(".".to_string()),
            Err(_) => None,
        }
    }

    pub fn expand(&self, input: &str) -> String {
        let home = || dirs::home_dir().map(|p| p.to_string_lossy().into_owned());
        let expanded: Cow<'_, str> =
            shellexpand::full_with_context_no_errors(input, home, |name| self.lookup(name));
        expanded.into_owned()
    }
}

/// Expand every source locator and the output directory in place.
pub fn expand_config(config: &mut ReconConfig) {
    let expander = Expander::new(&config.env);
    config.expand_locators(|locator| expander.expand(locator));
}
