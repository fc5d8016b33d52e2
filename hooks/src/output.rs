//! Command output, as text lines or a JSON envelope.

use fwdeploy_common::CompressionRun;
use serde::Serialize;

use crate::error::Result;
use crate::hooks::{ActionResult, HookReport};
use crate::readiness::GateReport;
use crate::targets::Plan;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

pub fn render<T: Serialize>(
    json: bool,
    data: &T,
    text: impl Fn(&T) -> String,
) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(&JsonOut { ok: true, data })?)
    } else {
        Ok(text(data))
    }
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: &T,
    text: impl Fn(&T) -> String,
) -> Result<()> {
    println!("{}", render(json, data, text)?);
    Ok(())
}

pub fn gate_line(gate: &Option<GateReport>) -> String {
    match gate {
        Some(r) => format!(
            "{}\t{}:{}\t{} attempt(s)\t{}ms",
            r.outcome,
            r.host,
            r.port,
            r.attempts,
            r.elapsed.as_millis()
        ),
        None => "skipped\tupload protocol is not network OTA".to_string(),
    }
}

pub fn run_line(run: &CompressionRun) -> String {
    format!(
        "compressed {} of {} file(s)\t{} up to date\t{} failed",
        run.files_compressed, run.files_examined, run.files_up_to_date, run.files_failed
    )
}

pub fn report_lines(report: &HookReport) -> String {
    let mut lines = vec![format!("hook {}", report.point)];
    for result in &report.results {
        lines.push(match result {
            ActionResult::CompressAssets { run } => format!("compress_assets\t{}", run_line(run)),
            ActionResult::AwaitDevice { gate } => format!("await_device\t{}", gate_line(gate)),
        });
    }
    lines.join("\n")
}

pub fn plan_line(plan: &Plan) -> String {
    let order: Vec<&str> = plan.order.iter().map(|t| t.as_str()).collect();
    let mut line = format!("{}\t{}", plan.name, order.join(" -> "));
    if plan.always_build {
        line.push_str("\t(always)");
    }
    line
}
