use crate::events::ResourceKind;
use cli_table::{format::Justify, Cell, Style, Table};
use colored::*;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Creation was requested and the resource became ready.
    Created,
    /// The resource existed but was not ready yet; waited for it.
    Awaited,
    AlreadyPresent,
    DeleteRequested,
    AlreadyAbsent,
    /// The desired state was not one we know how to reach.
    Ignored,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Action::Created => "created",
            Action::Awaited => "became ready",
            Action::AlreadyPresent => "already present",
            Action::DeleteRequested => "deletion requested",
            Action::AlreadyAbsent => "already absent",
            Action::Ignored => "ignored",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub kind: ResourceKind,
    pub name: String,
    pub desired: String,
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub rows: Vec<ReportRow>,
    pub kubeconfig: Option<PathBuf>,
}

impl RunReport {
    pub fn record(&mut self, kind: ResourceKind, name: &str, desired: impl fmt::Display, action: Action) {
        self.rows.push(ReportRow {
            kind,
            name: name.to_string(),
            desired: desired.to_string(),
            action,
        });
    }

    pub fn action(&self, kind: ResourceKind) -> Option<Action> {
        self.rows.iter().find(|r| r.kind == kind).map(|r| r.action)
    }

    pub fn render(&self) -> String {
        let mut rows = vec![vec![
            "resource".magenta().bold().cell().bold(true),
            "name".magenta().bold().cell().bold(true),
            "desired".magenta().bold().cell().bold(true),
            "action".magenta().bold().cell().bold(true),
        ]];
        for row in &self.rows {
            rows.push(vec![
                row.kind.to_string().blue().bold().cell().justify(Justify::Left),
                row.name.clone().cell().justify(Justify::Left),
                row.desired.clone().cell().justify(Justify::Left),
                colored_action(row.action).cell().justify(Justify::Left),
            ]);
        }
        let table = rows.table().bold(true);
        let mut rendered = match table.display() {
            Ok(display) => display.to_string(),
            Err(e) => {
                eprintln!("Error displaying run report: {:?}", e);
                return "could not visualize run report".to_string();
            }
        };
        if let Some(path) = &self.kubeconfig {
            rendered.push_str(&format!("\nkubeconfig: {}", path.display()));
        }
        rendered
    }
}

fn colored_action(action: Action) -> ColoredString {
    let text = action.to_string();
    match action {
        Action::Created | Action::Awaited | Action::AlreadyPresent | Action::AlreadyAbsent => {
            text.green()
        }
        Action::DeleteRequested => text.yellow(),
        Action::Ignored => text.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DesiredState;

    #[test]
    fn render_lists_every_resource_with_its_action() {
        // Arrange
        let mut report = RunReport::default();
        report.record(ResourceKind::Cluster, "demo", DesiredState::Created, Action::Created);
        report.record(ResourceKind::Helm, "demo", "ready", Action::AlreadyPresent);
        report.kubeconfig = Some(PathBuf::from("/drone/src/.kube/config"));

        // Act
        let rendered = report.render();

        // Assert
        assert!(rendered.contains("cluster"));
        assert!(rendered.contains("demo"));
        assert!(rendered.contains("created"));
        assert!(rendered.contains("already present"));
        assert!(rendered.contains("kubeconfig: /drone/src/.kube/config"));
    }

    #[test]
    fn action_finds_first_row_of_kind() {
        let mut report = RunReport::default();
        report.record(
            ResourceKind::Cluster,
            "demo",
            DesiredState::Deleted,
            Action::DeleteRequested,
        );

        assert_eq!(
            report.action(ResourceKind::Cluster),
            Some(Action::DeleteRequested)
        );
        assert_eq!(report.action(ResourceKind::Deployment), None);
    }
}
