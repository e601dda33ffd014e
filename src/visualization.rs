//! Visualization utilities for node-cost TSP solutions.
//!
//! Generates SVG plots of tours. Tour points are coloured by visiting cost
//! on a viridis-like scale; points left out of the tour are drawn faint.

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::solution::Solution;
use std::path::Path;

/// Colour stops of the cost scale, low to high
const COST_SCALE: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// Node radius
    pub node_radius: f64,
    /// Draw the index of every tour point
    pub labels: bool,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 50.0,
            node_radius: 5.0,
            labels: false,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate SVG visualization of a solution
    pub fn generate_svg(&self, instance: &Instance, solution: &Solution, title: &str) -> String {
        let mut svg = String::new();

        let (min_x, max_x, min_y, max_y) = self.get_bounds(instance);
        // leave room on the right for the colour bar
        let plot_width = self.width - 2.0 * self.margin - 60.0;
        let plot_height = self.height - 2.0 * self.margin;
        let scale_x = plot_width / (max_x - min_x).max(1.0);
        let scale_y = plot_height / (max_y - min_y).max(1.0);
        let scale = scale_x.min(scale_y);

        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .idle {{ fill: #bdc3c7; stroke: none; opacity: 0.6; }}
    .node {{ stroke: #000000; stroke-width: 1; }}
    .edge {{ stroke: #7f8c8d; stroke-width: 1; fill: none; }}
    .label {{ font-family: Arial; font-size: 10px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ffffff"/>
"##,
            self.width, self.height, self.width, self.height
        ));

        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">{}: {} | Objective: {} | Points: {}</text>
"##,
            self.margin,
            escape(&instance.name),
            escape(title),
            solution.objective,
            solution.len()
        ));

        let transform = |x: i64, y: i64| -> (f64, f64) {
            let tx = self.margin + (x as f64 - min_x) * scale;
            let ty = self.height - self.margin - (y as f64 - min_y) * scale;
            (tx, ty)
        };

        let mut in_tour = vec![false; instance.len()];
        for &node in &solution.tour {
            if let Some(flag) = in_tour.get_mut(node) {
                *flag = true;
            }
        }

        for node in instance.nodes.iter().filter(|n| !in_tour[n.id]) {
            let (x, y) = transform(node.x, node.y);
            svg.push_str(&format!(
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" class="idle"/>
"##,
                x,
                y,
                self.node_radius * 0.6
            ));
        }

        let tour: Vec<usize> = solution
            .tour
            .iter()
            .copied()
            .filter(|&n| n < instance.len())
            .collect();

        // closing edge included
        if tour.len() > 1 {
            let mut points = String::new();
            for &node in tour.iter().chain(tour.first()) {
                let (x, y) = transform(instance.nodes[node].x, instance.nodes[node].y);
                points.push_str(&format!("{:.2},{:.2} ", x, y));
            }
            svg.push_str(&format!(
                r##"<polyline points="{}" class="edge"/>
"##,
                points.trim_end()
            ));
        }

        let (min_cost, max_cost) = cost_range(instance, &tour);
        for &node in &tour {
            let n = &instance.nodes[node];
            let (x, y) = transform(n.x, n.y);
            svg.push_str(&format!(
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" class="node" fill="{}"/>
"##,
                x,
                y,
                self.node_radius,
                cost_color(n.cost, min_cost, max_cost)
            ));

            if self.labels {
                svg.push_str(&format!(
                    r##"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"##,
                    x,
                    y - self.node_radius - 3.0,
                    n.id
                ));
            }
        }

        svg.push_str(&self.color_bar(min_cost, max_cost));
        svg.push_str("</svg>");

        svg
    }

    /// Vertical colour bar labelled with the cost range
    fn color_bar(&self, min_cost: i64, max_cost: i64) -> String {
        let x = self.width - self.margin - 20.0;
        let top = self.margin;
        let height = self.height - 2.0 * self.margin;

        let mut bar = String::from(
            r##"<defs>
<linearGradient id="cost-scale" x1="0" y1="1" x2="0" y2="0">
"##,
        );
        for (i, &(r, g, b)) in COST_SCALE.iter().enumerate() {
            let offset = i as f64 / (COST_SCALE.len() - 1) as f64;
            bar.push_str(&format!(
                "<stop offset=\"{:.2}\" stop-color=\"#{:02x}{:02x}{:02x}\"/>\n",
                offset, r, g, b
            ));
        }
        bar.push_str("</linearGradient>\n</defs>\n");

        bar.push_str(&format!(
            r##"<rect x="{}" y="{}" width="15" height="{}" fill="url(#cost-scale)" stroke="#2c3e50"/>
<text x="{}" y="{}" class="label">{}</text>
<text x="{}" y="{}" class="label">{}</text>
<text x="{}" y="{}" class="label" transform="rotate(90 {} {})">Node Cost</text>
"##,
            x,
            top,
            height,
            x + 20.0,
            top + 10.0,
            max_cost,
            x + 20.0,
            top + height,
            min_cost,
            x + 30.0,
            top + height / 2.0,
            x + 30.0,
            top + height / 2.0
        ));
        bar
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, svg).map_err(|e| Error::io(path, e))
    }

    /// Get coordinate bounds
    fn get_bounds(&self, instance: &Instance) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for node in &instance.nodes {
            min_x = min_x.min(node.x as f64);
            max_x = max_x.max(node.x as f64);
            min_y = min_y.min(node.y as f64);
            max_y = max_y.max(node.y as f64);
        }

        if instance.is_empty() {
            return (0.0, 1.0, 0.0, 1.0);
        }
        (min_x, max_x, min_y, max_y)
    }
}

fn cost_range(instance: &Instance, tour: &[usize]) -> (i64, i64) {
    let costs = tour.iter().map(|&n| instance.cost(n));
    let min = costs.clone().min().unwrap_or(0);
    let max = costs.max().unwrap_or(0);
    (min, max)
}

/// Interpolated colour of `cost` on the scale spanning `[min, max]`.
fn cost_color(cost: i64, min: i64, max: i64) -> String {
    let t = if max > min {
        ((cost - min) as f64 / (max - min) as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let segments = (COST_SCALE.len() - 1) as f64;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(COST_SCALE.len() - 2);
    let frac = pos - i as f64;

    let (r0, g0, b0) = COST_SCALE[i];
    let (r1, g1, b1) = COST_SCALE[i + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;

    format!("#{:02x}{:02x}{:02x}", lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMatrix;

    fn create_test_instance() -> Instance {
        Instance::new(
            "test",
            &[(0, 0, 10), (100, 0, 20), (100, 100, 30), (0, 100, 40), (50, 50, 5)],
        )
    }

    #[test]
    fn test_visualizer() {
        let instance = create_test_instance();
        let distances = DistanceMatrix::from_instance(&instance);
        let solution = Solution::from_tour(&instance, &distances, vec![0, 1, 2], "test");

        let viz = Visualizer::new();
        let svg = viz.generate_svg(&instance, &solution, "Greedy Cycle");

        assert!(svg.starts_with("<?xml"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Greedy Cycle"));
        assert_eq!(svg.matches("class=\"node\"").count(), 3);
        assert_eq!(svg.matches("class=\"idle\"").count(), 2);
    }

    #[test]
    fn test_closing_edge_is_drawn() {
        let instance = create_test_instance();
        let distances = DistanceMatrix::from_instance(&instance);
        let solution = Solution::from_tour(&instance, &distances, vec![0, 1, 2], "test");
        let svg = Visualizer::new().generate_svg(&instance, &solution, "t");

        let start = svg.find("points=\"").unwrap() + 8;
        let end = start + svg[start..].find('"').unwrap();
        let points: Vec<&str> = svg[start..end].split(' ').collect();
        assert_eq!(points.len(), 4);
        assert_eq!(points.first(), points.last());
    }

    #[test]
    fn test_cost_color() {
        assert_eq!(cost_color(0, 0, 100), "#440154");
        assert_eq!(cost_color(100, 0, 100), "#fde725");
        assert_eq!(cost_color(7, 7, 7), "#440154");
        assert_eq!(cost_color(50, 0, 100), "#21918c");
    }

    #[test]
    fn test_empty_solution() {
        let instance = Instance::new("empty", &[]);
        let svg = Visualizer::new().generate_svg(&instance, &Solution::empty("none"), "none");
        assert!(!svg.contains("polyline"));
        assert!(svg.ends_with("</svg>"));
    }
}
