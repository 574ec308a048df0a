//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::application::services::sequencer::SuiteSummary;
use crate::domain::{Node, Outcome, Pod, Teardown};
use crate::output::OutputContext;

/// Renders run results and cluster snapshots for a terminal.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        self.ctx.line(&format!("clustervet {version}"));
    }

    /// Render the per-scenario verdicts, the totals and the teardown result.
    pub fn render_summary(&self, summary: &SuiteSummary) {
        let styles = &self.ctx.styles;
        self.ctx.line("");
        self.ctx.header("Results:");
        for result in &summary.report.scenarios {
            let millis = result.duration.as_millis();
            let (mark, detail) = match &result.outcome {
                Outcome::Passed => ("✓".style(styles.success).to_string(), String::new()),
                Outcome::Failed(reason) => {
                    ("✗".style(styles.error).to_string(), format!(": {reason}"))
                }
                Outcome::Skipped(reason) => (
                    "-".style(styles.warning).to_string(),
                    format!(" (skipped: {reason})"),
                ),
            };
            self.ctx.line(&format!(
                "  {mark} {}{detail} {}",
                result.scenario,
                format!("[{millis}ms]").style(styles.dim)
            ));
            for block in &result.diagnostics {
                for row in block.lines() {
                    self.ctx.line(&format!("      {}", row.style(styles.dim)));
                }
            }
        }

        let (passed, failed, skipped) = summary.report.counts();
        self.ctx.line("");
        self.ctx.kv(
            "Scenarios:",
            &format!("{passed} passed, {failed} failed, {skipped} skipped"),
        );
        match summary.teardown {
            Teardown::Destroy => match &summary.teardown_error {
                None => self.ctx.kv("Cluster:", "destroyed"),
                Some(err) => self.ctx.kv("Cluster:", &format!("teardown failed: {err}")),
            },
            Teardown::Preserve => {
                self.ctx.kv("Cluster:", "preserved for inspection");
                if let Some(kubeconfig) = &summary.kubeconfig {
                    self.ctx.kv("Kubeconfig:", kubeconfig);
                }
            }
        }
    }

    /// Render a node snapshot as an aligned table.
    pub fn render_nodes(&self, nodes: &[Node]) {
        let rows: Vec<[String; 4]> = nodes
            .iter()
            .map(|n| {
                [
                    n.name.clone(),
                    n.status.to_string(),
                    if n.roles.is_empty() {
                        "<none>".to_string()
                    } else {
                        n.roles.join(",")
                    },
                    n.version.clone(),
                ]
            })
            .collect();
        self.table(["NAME", "STATUS", "ROLES", "VERSION"], &rows);
    }

    /// Render a pod snapshot as an aligned table.
    pub fn render_pods(&self, pods: &[Pod]) {
        let rows: Vec<[String; 5]> = pods
            .iter()
            .map(|p| {
                [
                    p.namespace.clone(),
                    p.name.clone(),
                    p.ready.to_string(),
                    p.status.to_string(),
                    p.node.clone().unwrap_or_else(|| "<none>".to_string()),
                ]
            })
            .collect();
        self.table(["NAMESPACE", "NAME", "READY", "STATUS", "NODE"], &rows);
    }

    fn table<const N: usize>(&self, header: [&str; N], rows: &[[String; N]]) {
        let mut widths = header.map(str::len);
        for row in rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.len());
            }
        }
        let header_cells: Vec<String> = header.iter().map(ToString::to_string).collect();
        self.ctx.line(&format!(
            "  {}",
            pad_row(&header_cells, &widths).style(self.ctx.styles.header)
        ));
        for row in rows {
            self.ctx.line(&format!("  {}", pad_row(row, &widths)));
        }
    }
}

/// Left-align every cell to its column width, two spaces apart.
fn pad_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
