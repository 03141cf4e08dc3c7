//! Project loading, validation and introspection.

use std::path::Path;

use jw_joins::resolve;
use jw_project::{LintWarning, Project, lint_project};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Counts shown by `validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub name: String,
    pub version: u32,
    pub join_count: usize,
    pub address_count: usize,
    pub mock_count: usize,
    pub rule_count: usize,
    pub step_count: usize,
    pub warnings: Vec<LintWarning>,
}

/// Load a project file (`.yaml`, `.yml` or `.json`), migrated and validated.
pub fn load_project(path: &Path) -> AppResult<Project> {
    let project = jw_project::load_project(path).map_err(|e| match e {
        jw_project::ProjectError::Io(_) => AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: e,
        },
        other => AppError::Project(other),
    })?;
    info!(path = %path.display(), name = %project.name, "project loaded");
    Ok(project)
}

/// Validate again and collect lint warnings.
pub fn summarize_project(project: &Project) -> AppResult<ProjectSummary> {
    jw_project::validate_project(project)?;

    let entries = project.joins.walk();
    let mut address_count = 0;
    for entry in &entries {
        address_count += resolve(entry.spec)?.len();
    }

    let warnings = lint_project(project);
    for warning in &warnings {
        warn!(project = %project.name, "{warning}");
    }

    Ok(ProjectSummary {
        name: project.name.clone(),
        version: project.version,
        join_count: entries.len(),
        address_count,
        mock_count: project.mocks.len(),
        rule_count: project.rules.len(),
        step_count: project.script.len(),
        warnings,
    })
}

/// Pretty JSON of the join map, as a tree or grouped by kind.
pub fn render_joins(project: &Project, by_kind: bool) -> AppResult<String> {
    let text = if by_kind {
        project.joins.render_by_kind()?
    } else {
        project.joins.render_tree()?
    };
    Ok(text)
}
