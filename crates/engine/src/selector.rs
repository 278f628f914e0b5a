// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator selection of FireWorks and workflows
//!
//! A selector is either an explicit id list or a filter, never both.
//! Bulk destructive operations over a large selection need confirmation.

use crate::error::{LaunchPadError, Result};
use crate::launchpad::LaunchPad;
use fw_core::{Clock, FwId, FwQuery, FwState, Sort, WfId, WfQuery};
use fw_storage::EntityStore;
use std::collections::BTreeSet;

/// Which entities an operator command applies to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pub fw_ids: Vec<FwId>,
    pub name: Option<String>,
    pub state: Option<FwState>,
    pub query: Option<FwQuery>,
    pub sort: Sort,
    /// 0 selects everything
    pub limit: usize,
}

impl Selector {
    /// Select everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn ids(ids: impl IntoIterator<Item = FwId>) -> Self {
        Self {
            fw_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_state(mut self, state: FwState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_query(mut self, query: FwQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn has_filter(&self) -> bool {
        self.name.is_some() || self.state.is_some() || self.query.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fw_ids.is_empty() && self.has_filter() {
            return Err(LaunchPadError::AmbiguousSelector(
                "fw ids cannot be combined with name, state or query".to_string(),
            ));
        }
        Ok(())
    }

    /// The filter as a FireWork query
    fn fw_query(&self) -> FwQuery {
        let mut query = self.query.clone().unwrap_or_default();
        if let Some(name) = &self.name {
            query.name = Some(name.clone());
        }
        if let Some(state) = self.state {
            query.states = Some(vec![state]);
        }
        query
    }
}

/// Operator acknowledgement for bulk destructive operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Confirmation {
    #[default]
    None,
    /// Today's date, YYYY-MM-DD (UTC)
    Token(String),
    /// The caller already asked the operator
    Skip,
}

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    /// FireWork ids named by `selector`
    pub fn resolve_fw_ids(&self, selector: &Selector) -> Result<Vec<FwId>> {
        selector.validate()?;
        if !selector.fw_ids.is_empty() {
            return Ok(selector.fw_ids.clone());
        }
        self.get_fw_ids(&selector.fw_query(), selector.sort, selector.limit)
    }

    /// Workflow ids named by `selector`
    ///
    /// Explicit ids select their workflows. A name or state filters workflows
    /// by name and aggregate state; a query selects workflows with at least
    /// one matching FireWork.
    pub fn resolve_wf_ids(&self, selector: &Selector) -> Result<Vec<WfId>> {
        selector.validate()?;
        if !selector.fw_ids.is_empty() {
            let mut seen = BTreeSet::new();
            let mut wf_ids = Vec::new();
            for fw_id in &selector.fw_ids {
                let wf_id = self.wf_id_for_fw(*fw_id)?;
                if seen.insert(wf_id) {
                    wf_ids.push(wf_id);
                }
            }
            return Ok(wf_ids);
        }

        let mut wf_query = WfQuery::new();
        if let Some(name) = &selector.name {
            wf_query = wf_query.with_name(name.clone());
        }
        if let Some(state) = selector.state {
            wf_query = wf_query.with_state(state);
        }
        if let Some(query) = &selector.query {
            if query.include_archived {
                wf_query = wf_query.including_archived();
            }
            let members = self.get_fw_ids(query, Sort::default(), 0)?;
            wf_query = wf_query.with_fw_ids(members);
        }
        self.get_wf_ids(&wf_query, selector.sort, selector.limit)
    }

    /// Gate a bulk operation over `count` entities
    pub fn confirm(&self, count: usize, confirmation: &Confirmation) -> Result<()> {
        let threshold = self.config.confirmation_threshold;
        if count <= threshold {
            return Ok(());
        }
        match confirmation {
            Confirmation::Skip => Ok(()),
            Confirmation::Token(token) if *token == self.now().format("%Y-%m-%d").to_string() => Ok(()),
            Confirmation::Token(_) => Err(LaunchPadError::BadPassword),
            Confirmation::None => Err(LaunchPadError::ConfirmationRequired { count, threshold }),
        }
    }

    /// Archive every selected workflow
    pub fn archive_selected(&self, selector: &Selector, confirmation: &Confirmation) -> Result<Vec<WfId>> {
        let wf_ids = self.resolve_wf_ids(selector)?;
        self.confirm(wf_ids.len(), confirmation)?;
        for wf_id in &wf_ids {
            self.archive_workflow(*wf_id)?;
        }
        tracing::info!(workflows = wf_ids.len(), "archived selection");
        Ok(wf_ids)
    }

    /// Purge every selected workflow
    pub fn purge_selected(&self, selector: &Selector, confirmation: &Confirmation) -> Result<Vec<WfId>> {
        let wf_ids = self.resolve_wf_ids(selector)?;
        self.confirm(wf_ids.len(), confirmation)?;
        for wf_id in &wf_ids {
            self.purge_workflow(*wf_id)?;
        }
        tracing::info!(workflows = wf_ids.len(), "purged selection");
        Ok(wf_ids)
    }

    /// Rerun every selected FireWork; returns every FireWork reset
    pub fn rerun_selected(&self, selector: &Selector, confirmation: &Confirmation) -> Result<Vec<FwId>> {
        let fw_ids = self.resolve_fw_ids(selector)?;
        self.confirm(fw_ids.len(), confirmation)?;
        let mut reset = BTreeSet::new();
        for fw_id in fw_ids {
            reset.extend(self.rerun_fw(fw_id)?);
        }
        tracing::info!(reset = reset.len(), "reran selection");
        Ok(reset.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
