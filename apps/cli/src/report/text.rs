use std::fmt::Write;

use anyhow::Result;
use nodecheck::{AssessmentResult, CheckStatus, NodeCheckResult, NodeKind, ReadinessTier, ResourceSnapshot};

use super::Renderer;
use super::style::{Styler, Tone};

const RULE_WIDTH: usize = 60;

/// Human-readable report
pub struct TextRenderer {
    styler: Box<dyn Styler>,
}

impl TextRenderer {
    pub fn new(styler: Box<dyn Styler>) -> Self {
        Self { styler }
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        self.styler.paint(text, tone)
    }

    fn write_node(&self, out: &mut String, node: &NodeCheckResult) -> std::fmt::Result {
        let title = match node.kind {
            NodeKind::Consensus => "CONSENSUS NODE",
            NodeKind::Execution => "EXECUTION NODE",
        };
        writeln!(out, "\n{}", self.paint(title, Tone::Heading))?;
        match &node.target {
            Some(target) => writeln!(out, "  Endpoint: {} ({target})", node.endpoint)?,
            None => writeln!(out, "  Endpoint: {}", node.endpoint)?,
        }

        if let Some(report) = &node.connectivity {
            let diagnosis = &report.diagnosis;
            let tone = if diagnosis.status.is_blocking() {
                Tone::Bad
            } else if diagnosis.status.is_warning() {
                Tone::Warn
            } else {
                Tone::Good
            };
            writeln!(
                out,
                "  Connectivity: {} ({}/{} connects)",
                self.paint(&diagnosis.summary, tone),
                report.result.successes(),
                report.result.attempts().len()
            )?;
            for detail in &diagnosis.details {
                writeln!(out, "    {}", self.paint(detail, Tone::Muted))?;
            }
        }

        for check in &node.checks {
            let (label, tone) = match check.status {
                CheckStatus::Pass => ("PASS", Tone::Good),
                CheckStatus::Warn => ("WARN", Tone::Warn),
                CheckStatus::Fail => ("FAIL", Tone::Bad),
                CheckStatus::Skipped => ("SKIP", Tone::Muted),
            };
            write!(out, "  [{}] {:<14} {}", self.paint(label, tone), check.name, check.detail)?;
            if check.attempts > 1 {
                write!(out, " {}", self.paint(&format!("({} attempts)", check.attempts), Tone::Muted))?;
            }
            writeln!(out)?;
        }

        let (state, tone) = node_state(node);
        writeln!(out, "  Status: {}", self.paint(state, tone))?;
        writeln!(out, "  Score: {}/100", node.score())
    }

    fn write_metrics(&self, out: &mut String, result: &AssessmentResult) -> std::fmt::Result {
        writeln!(out, "\n{}", self.paint("KEY METRICS", Tone::Heading))?;
        writeln!(out, "  Consensus peers: {}", or_na(result.consensus.peer_count.map(group_thousands)))?;
        writeln!(out, "  Execution peers: {}", or_na(result.execution.peer_count.map(group_thousands)))?;
        writeln!(out, "  Chain ID: {}", or_na(result.execution.chain_id.map(|id| id.to_string())))?;
        writeln!(out, "  Latest block: {}", or_na(result.execution.latest_block.map(group_thousands)))
    }

    fn write_resources(&self, out: &mut String, resources: &ResourceSnapshot) -> std::fmt::Result {
        writeln!(out, "\n{}", self.paint("HOST RESOURCES", Tone::Heading))?;
        if let Some(load) = resources.load_percent {
            writeln!(out, "  CPU load: {load:.1}% per CPU")?;
        }
        if let Some(memory) = resources.memory_used_percent {
            writeln!(out, "  Memory used: {memory:.1}%")?;
        }
        if let Some(disk) = resources.disk_used_percent {
            writeln!(out, "  Disk used (/): {disk:.1}%")?;
        }
        let tone = if resources.disk_critical() { Tone::Bad } else { Tone::Warn };
        for warning in resources.warnings() {
            writeln!(out, "  {}", self.paint(&warning, tone))?;
        }
        Ok(())
    }

    fn write_quick_fixes(&self, out: &mut String, result: &AssessmentResult) -> std::fmt::Result {
        let failing: Vec<&NodeCheckResult> = [&result.consensus, &result.execution]
            .into_iter()
            .filter(|node| !(node.reachable && node.healthy))
            .collect();
        if failing.is_empty() {
            return Ok(());
        }

        writeln!(out, "\n{}", self.paint("QUICK FIXES", Tone::Warn))?;
        for node in failing {
            let (service, label) = match node.kind {
                NodeKind::Consensus => ("lighthouse-bn", "Consensus node"),
                NodeKind::Execution => ("geth", "Execution node"),
            };
            let port = node
                .target
                .as_deref()
                .and_then(|target| target.rsplit_once(':'))
                .map_or_else(|| node.kind.default_port().to_string(), |(_, port)| port.to_string());

            writeln!(out, "  {label}:")?;
            writeln!(out, "    - sudo systemctl status {service}")?;
            writeln!(out, "    - sudo systemctl restart {service}")?;
            writeln!(out, "    - sudo ufw allow {port}")?;
            if let Some(report) = &node.connectivity {
                for hint in &report.diagnosis.remediation {
                    writeln!(out, "    - {hint}")?;
                }
            }
        }
        Ok(())
    }

    fn write_report(&self, out: &mut String, result: &AssessmentResult) -> std::fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(out, "{}", self.paint(&rule, Tone::Muted))?;
        writeln!(out, "{}", self.paint("VALIDATOR NODE READINESS", Tone::Heading))?;
        writeln!(out, "{}", self.paint(&rule, Tone::Muted))?;

        if let Some(resources) = &result.resources {
            self.write_resources(out, resources)?;
        }
        self.write_node(out, &result.consensus)?;
        self.write_node(out, &result.execution)?;
        self.write_metrics(out, result)?;

        let tone = match result.tier {
            ReadinessTier::Excellent | ReadinessTier::Good => Tone::Good,
            ReadinessTier::Marginal => Tone::Warn,
            ReadinessTier::NotReady => Tone::Bad,
        };
        let verdict = if result.ready { "ready" } else { "not ready" };
        writeln!(out, "\n{}", self.paint("SUMMARY", Tone::Heading))?;
        writeln!(out, "  Overall score: {:.1}/100", result.overall_score)?;
        writeln!(out, "  Readiness: {} ({verdict})", self.paint(&result.tier.to_string(), tone))?;

        if !result.issues.is_empty() {
            writeln!(out, "\n{}", self.paint("ISSUES", Tone::Bad))?;
            for (index, issue) in result.issues.iter().enumerate() {
                writeln!(out, "  {}. {issue}", index + 1)?;
            }
        }
        self.write_quick_fixes(out, result)?;

        writeln!(out, "\n{}", self.paint(&rule, Tone::Muted))?;
        writeln!(
            out,
            "Last checked: {}",
            result.checked_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        )
    }
}

impl Renderer for TextRenderer {
    fn render(&self, result: &AssessmentResult) -> Result<String> {
        let mut out = String::new();
        self.write_report(&mut out, result)?;
        Ok(out)
    }
}

fn node_state(node: &NodeCheckResult) -> (&'static str, Tone) {
    match (node.reachable, node.healthy, node.synced) {
        (true, true, true) => ("OPTIMAL (healthy & synced)", Tone::Good),
        (true, true, false) => ("FUNCTIONAL (healthy, not synced)", Tone::Warn),
        (true, false, _) => ("CRITICAL (unhealthy)", Tone::Bad),
        (false, ..) => ("CRITICAL (unreachable)", Tone::Bad),
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}

/// `1234567` -> `1,234,567`
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
