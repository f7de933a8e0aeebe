use countdown_core::{CliError, PhaseGraph};
use countdown_plugins::pipeline::{video_graph, VideoPhase};
use serde_json::json;

use super::cli::PlanArgs;

pub fn run(args: &PlanArgs) -> Result<i32, CliError> {
    let graph = video_graph()?;
    graph.validate()?;

    if args.json {
        let doc = plan_json(&graph);
        let out = serde_json::to_string_pretty(&doc).map_err(|e| CliError::Command(e.to_string()))?;
        println!("{out}");
    } else {
        print!("{}", render_plan(&graph));
    }
    Ok(0)
}

fn plan_json(graph: &PhaseGraph<VideoPhase>) -> serde_json::Value {
    let phases: Vec<serde_json::Value> = graph
        .phases()
        .iter()
        .map(|phase| {
            let writes: Vec<&str> = phase.writes().iter().collect();
            json!({
                "phase": phase,
                "depends_on": graph.dependencies(*phase),
                "writes": writes,
            })
        })
        .collect();

    json!({
        "phases": phases,
        "waves": graph.predicted_waves(),
    })
}

fn render_plan(graph: &PhaseGraph<VideoPhase>) -> String {
    let width = graph
        .phases()
        .iter()
        .map(|p| p.as_str().len())
        .max()
        .unwrap_or(0);

    let mut out = String::from("PHASES\n");
    for phase in graph.phases() {
        let deps: Vec<&str> = graph
            .dependencies(*phase)
            .iter()
            .map(|d| d.as_str())
            .collect();
        let deps = if deps.is_empty() {
            "-".to_string()
        } else {
            deps.join(", ")
        };
        out.push_str(&format!(
            "  {:<width$}  after: {}  writes: {}\n",
            phase.as_str(),
            deps,
            phase.writes(),
            width = width
        ));
    }

    out.push_str("\nWAVES\n");
    for (idx, wave) in graph.predicted_waves().iter().enumerate() {
        let names: Vec<&str> = wave.iter().map(|p| p.as_str()).collect();
        out.push_str(&format!("  {}: {}\n", idx, names.join(", ")));
    }
    out
}
