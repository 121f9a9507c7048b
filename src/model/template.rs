//! Built-in report templates shipped with regulatory packages

use super::report::ReportConfig;
use crate::error::{ConfigError, EngineError, Result};

const EMIR_TRADES: &str = include_str!("../../templates/emir_trades.yaml");
const MIFIR_TRANSACTIONS: &str = include_str!("../../templates/mifir_transactions.yaml");

/// A named package template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTemplate {
    pub name: &'static str,
    pub description: &'static str,
    source: &'static str,
}

pub const TEMPLATES: &[ReportTemplate] = &[
    ReportTemplate {
        name: "emir_trades",
        description: "EMIR trade report (XML, daily on business days)",
        source: EMIR_TRADES,
    },
    ReportTemplate {
        name: "mifir_transactions",
        description: "MiFIR transaction report (CSV, weekday mornings)",
        source: MIFIR_TRANSACTIONS,
    },
];

impl ReportTemplate {
    pub fn find(name: &str) -> Option<&'static ReportTemplate> {
        TEMPLATES.iter().find(|t| t.name == name)
    }

    /// Raw YAML source, as written by `init`
    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn instantiate(&self) -> Result<ReportConfig> {
        serde_yml::from_str(self.source).map_err(|e| EngineError::Load {
            what: "report template",
            path: self.name.to_string(),
            message: e.to_string(),
        })
    }
}

impl ReportConfig {
    /// A fresh report built from a package template
    pub fn from_template(name: &str) -> Result<Self> {
        let template =
            ReportTemplate::find(name).ok_or_else(|| ConfigError::UnknownTemplate(name.to_string()))?;
        template.instantiate()
    }
}
