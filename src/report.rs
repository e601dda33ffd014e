//! Result export: best paths, statistics, LaTeX table and JSON dump.
//!
//! Every writer takes a generic `Write`; a failing writer surfaces as
//! [`Error::Csv`] or [`Error::Json`]. [`ReportWriter`] renders the outputs of
//! one dataset in memory and saves each file under its own path.

use crate::error::{Error, Result};
use crate::experiment::{ExperimentReport, HeuristicResult};
use crate::instance::Instance;
use crate::solution::Solution;
use crate::visualization::Visualizer;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One row of the statistics CSV
#[derive(Debug, Clone, Serialize)]
struct StatisticsRow<'a> {
    heuristic: &'a str,
    runs: usize,
    min: i64,
    max: i64,
    average: f64,
    std_dev: f64,
}

#[derive(Debug, Serialize)]
struct PathRow {
    id: usize,
    x: i64,
    y: i64,
    cost: i64,
}

#[derive(Debug, Serialize)]
struct BestSolutions<'a> {
    dataset: &'a str,
    target: usize,
    started_at: &'a str,
    solutions: Vec<&'a Solution>,
}

/// Write the best tour of every heuristic: a label line, an `id,x,y,cost`
/// header and one row per tour point, blocks separated by an empty line.
pub fn write_paths<W: Write>(mut out: W, instance: &Instance, report: &ExperimentReport) -> Result<()> {
    for result in &report.results {
        let Some(best) = &result.best else {
            continue;
        };

        writeln!(out, "{}", result.heuristic.label()).map_err(csv::Error::from)?;
        {
            let mut writer = csv::Writer::from_writer(&mut out);
            for &node in &best.tour {
                let n = &instance.nodes[node];
                writer.serialize(PathRow {
                    id: n.id,
                    x: n.x,
                    y: n.y,
                    cost: n.cost,
                })?;
            }
            if best.tour.is_empty() {
                writer.write_record(["id", "x", "y", "cost"])?;
            }
            writer.flush().map_err(csv::Error::from)?;
        }
        writeln!(out).map_err(csv::Error::from)?;
    }
    Ok(())
}

/// Write `heuristic,runs,min,max,average,std_dev`, one row per heuristic that ran.
pub fn write_statistics<W: Write>(out: W, report: &ExperimentReport) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for result in &report.results {
        if let Some(stats) = result.statistics() {
            writer.serialize(StatisticsRow {
                heuristic: result.heuristic.name(),
                runs: stats.runs,
                min: stats.min,
                max: stats.max,
                average: stats.average,
                std_dev: stats.std_dev,
            })?;
        }
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// LaTeX `tabular` with one `Method & Avg (Min, Max)` row per heuristic.
pub fn latex_table(report: &ExperimentReport) -> String {
    let mut table = String::new();
    table.push_str("\\begin{tabular}{|l|c|}\n");
    table.push_str("\\hline\n");
    table.push_str(&format!(
        "Method & {} Avg (Min, Max) \\\\\n",
        latex_escape(&report.dataset)
    ));
    table.push_str("\\hline\n");

    for result in &report.results {
        table.push_str(&latex_row(result));
    }

    table.push_str("\\hline\n");
    table.push_str("\\end{tabular}\n");
    table
}

fn latex_row(result: &HeuristicResult) -> String {
    match result.statistics() {
        Some(stats) => format!(
            "{} & {:.2} ({:.2}, {:.2}) \\\\\n",
            result.heuristic.label(),
            stats.average,
            stats.min as f64,
            stats.max as f64
        ),
        None => format!("{} & -- \\\\\n", result.heuristic.label()),
    }
}

fn latex_escape(text: &str) -> String {
    text.replace('\\', "\\textbackslash{}")
        .replace('_', "\\_")
        .replace('&', "\\&")
        .replace('%', "\\%")
}

/// Pretty-printed JSON of the best solution of every heuristic.
pub fn write_best_json<W: Write>(out: W, report: &ExperimentReport) -> Result<()> {
    let dump = BestSolutions {
        dataset: &report.dataset,
        target: report.target,
        started_at: &report.started_at,
        solutions: report.results.iter().filter_map(|r| r.best.as_ref()).collect(),
    };
    serde_json::to_writer_pretty(out, &dump)?;
    Ok(())
}

/// Writes every output of one dataset into a directory
pub struct ReportWriter {
    output_dir: PathBuf,
    visualizer: Visualizer,
}

impl ReportWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| Error::io(&output_dir, e))?;
        Ok(ReportWriter {
            output_dir,
            visualizer: Visualizer::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn save(&self, file_name: String, contents: &[u8]) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        std::fs::write(&path, contents).map_err(|e| Error::io(&path, e))?;
        Ok(path)
    }

    /// Write paths, statistics, LaTeX, JSON and one SVG per heuristic.
    /// Returns the paths written.
    pub fn write_all(&self, instance: &Instance, report: &ExperimentReport) -> Result<Vec<PathBuf>> {
        let dataset = &report.dataset;
        let mut written = Vec::new();

        let mut paths = Vec::new();
        write_paths(&mut paths, instance, report)?;
        written.push(self.save(format!("{}_paths.csv", dataset), &paths)?);

        let mut statistics = Vec::new();
        write_statistics(&mut statistics, report)?;
        written.push(self.save(format!("{}_statistics.csv", dataset), &statistics)?);

        let table = latex_table(report);
        written.push(self.save(format!("{}_results_table.tex", dataset), table.as_bytes())?);

        let mut json = Vec::new();
        write_best_json(&mut json, report)?;
        written.push(self.save(format!("{}_best.json", dataset), &json)?);

        for result in &report.results {
            if let Some(best) = &result.best {
                let svg = self
                    .visualizer
                    .generate_svg(instance, best, result.heuristic.label());
                let path = self
                    .output_dir
                    .join(format!("{}_{}.svg", dataset, result.heuristic.name()));
                self.visualizer.save_svg(&svg, &path)?;
                written.push(path);
            }
        }

        log::info!(
            "Wrote {} files for {} to {}",
            written.len(),
            dataset,
            self.output_dir.display()
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMatrix;
    use crate::experiment::{Experiment, ExperimentConfig};
    use crate::heuristics::HeuristicKind;

    fn create_test_report() -> (Instance, ExperimentReport) {
        let points: Vec<(i64, i64, i64)> = (0..8)
            .map(|i| ((i * 31) % 47, (i * 19) % 43, 10 + i))
            .collect();
        let instance = Instance::new("TSP_T", &points);
        let distances = DistanceMatrix::from_instance(&instance);
        let experiment = Experiment::new(ExperimentConfig {
            random_trials: 5,
            random_seed: Some(3),
            parallel: false,
            ..Default::default()
        });
        let report = experiment.run(&instance, &distances).unwrap();
        (instance, report)
    }

    #[test]
    fn test_write_paths() {
        let (instance, report) = create_test_report();
        let mut buffer = Vec::new();
        write_paths(&mut buffer, &instance, &report).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Random Search");
        assert_eq!(lines[1], "id,x,y,cost");
        assert_eq!(text.matches("id,x,y,cost").count(), 4);
        assert!(text.contains("Greedy Cycle\nid,x,y,cost\n"));

        // label + header + 4 rows + blank line per heuristic
        assert_eq!(lines.len(), 4 * 7);
    }

    #[test]
    fn test_write_statistics() {
        let (_, report) = create_test_report();
        let mut buffer = Vec::new();
        write_statistics(&mut buffer, &report).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("heuristic,runs,min,max,average,std_dev"));
        let random = lines.next().unwrap();
        assert!(random.starts_with("Random,5,"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_latex_table() {
        let (_, report) = create_test_report();
        let table = latex_table(&report);

        assert!(table.starts_with("\\begin{tabular}"));
        assert!(table.contains("Method & TSP\\_T Avg (Min, Max)"));

        let greedy = report.result(HeuristicKind::GreedyCycle).unwrap();
        let stats = greedy.statistics().unwrap();
        let row = format!(
            "Greedy Cycle & {:.2} ({}.00, {}.00) \\\\",
            stats.average, stats.min, stats.max
        );
        assert!(table.contains(&row));
    }

    #[test]
    fn test_write_best_json() {
        let (_, report) = create_test_report();
        let mut buffer = Vec::new();
        write_best_json(&mut buffer, &report).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["dataset"], "TSP_T");
        assert_eq!(value["solutions"].as_array().unwrap().len(), 4);
        let first: Solution = serde_json::from_value(value["solutions"][0].clone()).unwrap();
        assert_eq!(first.tour.len(), 4);
    }

    #[test]
    fn test_report_writer() {
        let (instance, report) = create_test_report();
        let dir = std::env::temp_dir().join(format!("nc-tsp-report-{}", std::process::id()));
        let writer = ReportWriter::new(&dir).unwrap();

        let written = writer.write_all(&instance, &report).unwrap();
        assert_eq!(written.len(), 4 + 4);
        assert!(dir.join("TSP_T_statistics.csv").exists());
        assert!(dir.join("TSP_T_GreedyCycle.svg").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_report_writer_names_failing_file() {
        let (instance, report) = create_test_report();
        let dir = std::env::temp_dir().join(format!("nc-tsp-blocked-{}", std::process::id()));
        let writer = ReportWriter::new(&dir).unwrap();
        // a directory where the statistics file should go
        std::fs::create_dir_all(dir.join("TSP_T_statistics.csv")).unwrap();

        let err = writer.write_all(&instance, &report).unwrap_err();
        match err {
            Error::Io { path, .. } => assert_eq!(path, dir.join("TSP_T_statistics.csv")),
            other => panic!("unexpected error: {}", other),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failing_writer() {
        let (instance, report) = create_test_report();
        assert!(matches!(
            write_paths(BrokenPipe, &instance, &report),
            Err(Error::Csv(_))
        ));
        assert!(matches!(write_statistics(BrokenPipe, &report), Err(Error::Csv(_))));
        assert!(matches!(write_best_json(BrokenPipe, &report), Err(Error::Json(_))));
    }
}
