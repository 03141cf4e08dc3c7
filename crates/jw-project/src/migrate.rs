//! Schema migration framework.

use crate::ProjectError;
use crate::schema::Project;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut project: Project) -> Result<Project, ProjectError> {
    while project.version < LATEST_VERSION {
        project = migrate_one_version(project)?;
    }
    Ok(project)
}

fn migrate_one_version(project: Project) -> Result<Project, ProjectError> {
    match project.version {
        0 => migrate_v0_to_v1(project),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 1 only added the optional `bus` section, whose defaults behave
/// like a version 0 bus. A version 0 document is therefore already a valid
/// version 1 document and only the version number changes.
fn migrate_v0_to_v1(mut project: Project) -> Result<Project, ProjectError> {
    project.version = 1;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v0_is_bumped() {
        let project = Project {
            version: 0,
            ..Project::default()
        };
        let migrated = migrate_to_latest(project).unwrap();
        assert_eq!(migrated.version, LATEST_VERSION);
    }

    #[test]
    fn v0_file_loads_like_its_v1_twin() {
        let body = r#"
name: Lobby
joins:
  Power: { type: boolean, join: 1 }
  Level: { type: number, join: { start: 1, end: 3 }, offset: 10 }
mocks:
  - { target: { path: Power }, block: { type: toggle } }
"#;
        let v0 = crate::parse_yaml(&format!("version: 0\n{body}")).unwrap();
        let v1 = crate::parse_yaml(&format!("version: 1\n{body}")).unwrap();
        assert_eq!(v0, v1);
        assert_eq!(v0.bus, jw_mock::BusConfig::default());
    }
}
