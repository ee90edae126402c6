//! SVG diagram layouts.
//!
//! Layouts are computed on a 10x10 unit grid with the origin at the bottom
//! left and scaled to pixels on output.

use std::collections::HashSet;
use std::f64::consts::PI;

const SCALE: f64 = 80.0;
const TITLE_HEIGHT: f64 = 60.0;

/// Related-concept labels longer than this are cut and suffixed with `...`.
pub const MAX_CONCEPT_LABEL: usize = 30;
/// Related concepts drawn around the center of a concept map.
pub const MAX_RELATED: usize = 8;
pub const MAX_STEP_LABEL: usize = 60;
pub const MAX_ROOT_LABEL: usize = 20;
pub const MAX_CHILD_LABEL: usize = 15;
pub const MAX_CHILDREN: usize = 5;

const FLOW_COLORS: [&str; 6] = ["#3498DB", "#2ECC71", "#F39C12", "#E74C3C", "#9B59B6", "#1ABC9C"];

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// Cut `text` to `max` characters and append `...` when it was longer.
fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", take_chars(text, max))
    } else {
        text.to_string()
    }
}

/// Flow steps keep the whole label within `MAX_STEP_LABEL` characters.
fn step_label(index: usize, step: &str) -> String {
    let label = format!("{}. {}", index + 1, step);
    if label.chars().count() > MAX_STEP_LABEL {
        format!("{}...", take_chars(&label, MAX_STEP_LABEL - 3))
    } else {
        label
    }
}

struct Canvas {
    width: f64,
    height_units: f64,
    body: String,
}

impl Canvas {
    fn new(height_units: f64) -> Self {
        Self {
            width: 10.0 * SCALE,
            height_units,
            body: String::new(),
        }
    }

    fn px(&self, x: f64, y: f64) -> (f64, f64) {
        (x * SCALE, TITLE_HEIGHT + (self.height_units - y) * SCALE)
    }

    #[allow(clippy::too_many_arguments)]
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, stroke: &str, opacity: f64) {
        // (x, y) is the bottom-left corner in grid units.
        let (px, py) = self.px(x, y + h);
        push_line!(
            self.body,
            r#"  <rect x="{px:.1}" y="{py:.1}" width="{:.1}" height="{:.1}" rx="8" fill="{fill}" stroke="{stroke}" stroke-width="2" fill-opacity="{opacity}"/>"#,
            w * SCALE,
            h * SCALE,
        );
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: &str, arrow: bool) {
        let (x1, y1) = self.px(from.0, from.1);
        let (x2, y2) = self.px(to.0, to.1);
        let marker = if arrow { r#" marker-end="url(#arrow)""# } else { "" };
        push_line!(
            self.body,
            r#"  <line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="{color}" stroke-width="2"{marker}/>"#,
        );
    }

    fn text(&mut self, x: f64, y: f64, label: &str, size: u32, color: &str, bold: bool) {
        let (px, py) = self.px(x, y);
        let weight = if bold { "bold" } else { "normal" };
        push_line!(
            self.body,
            r#"  <text x="{px:.1}" y="{py:.1}" font-size="{size}" font-weight="{weight}" fill="{color}" text-anchor="middle" dominant-baseline="middle">{}</text>"#,
            escape(label),
        );
    }

    fn finish(self, title: &str) -> String {
        let height = TITLE_HEIGHT + self.height_units * SCALE;
        let mut svg = String::new();
        push_line!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{height:.0}" viewBox="0 0 {w:.0} {height:.0}" font-family="sans-serif">"#,
            w = self.width,
        );
        svg.push_str(concat!(
            "  <defs>\n",
            r#"    <marker id="arrow" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse">"#,
            "\n",
            r##"      <path d="M 0 0 L 10 5 L 0 10 z" fill="#95A5A6"/>"##,
            "\n    </marker>\n  </defs>\n",
        ));
        push_line!(
            svg,
            r#"  <rect width="100%" height="100%" fill="white"/>"#
        );
        push_line!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" font-size="22" font-weight="bold" text-anchor="middle">{}</text>"#,
            self.width / 2.0,
            TITLE_HEIGHT / 2.0 + 8.0,
            escape(title),
        );
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        svg
    }
}

/// A central concept with up to [`MAX_RELATED`] related concepts placed on a
/// circle around it.
pub fn concept_map(concept: &str, related: &[String]) -> String {
    let mut canvas = Canvas::new(10.0);
    let (cx, cy) = (5.0, 5.0);
    let shown = &related[..related.len().min(MAX_RELATED)];

    // Arrows first so boxes paint over their tails.
    let positions: Vec<(f64, f64)> = (0..shown.len())
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / shown.len() as f64;
            (cx + 3.0 * angle.cos(), cy + 3.0 * angle.sin())
        })
        .collect();
    for &pos in &positions {
        canvas.line((cx, cy), pos, "#95A5A6", true);
    }

    canvas.rect(cx - 1.0, cy - 0.5, 2.0, 1.0, "#3498DB", "#2C3E50", 1.0);
    canvas.text(cx, cy, concept, 15, "white", true);

    for (name, &(x, y)) in shown.iter().zip(&positions) {
        canvas.rect(x - 0.8, y - 0.4, 1.6, 0.8, "#ECF0F1", "#34495E", 1.0);
        canvas.text(x, y, &ellipsize(name, MAX_CONCEPT_LABEL), 11, "#2C3E50", false);
    }

    canvas.finish(&format!("Concept Map: {concept}"))
}

/// Numbered process steps top to bottom, linked by arrows.
pub fn flow(steps: &[String], title: &str) -> String {
    let n = steps.len() as f64;
    let mut canvas = Canvas::new(n + 1.0);

    for (i, step) in steps.iter().enumerate() {
        let y = n - i as f64;
        let color = FLOW_COLORS[i % FLOW_COLORS.len()];
        canvas.rect(1.0, y - 0.4, 8.0, 0.8, color, color, 0.7);
        canvas.text(5.0, y, &step_label(i, step), 13, "white", true);
        if i + 1 < steps.len() {
            canvas.line((5.0, y - 0.5), (5.0, y - 1.1), "#34495E", true);
        }
    }

    canvas.finish(title)
}

/// A root node with up to [`MAX_CHILDREN`] children in a row beneath it.
pub fn hierarchy(root: &str, children: &[String], title: &str) -> String {
    let mut canvas = Canvas::new(10.0);
    let root = if root.is_empty() { "Root" } else { root };
    let shown = &children[..children.len().min(MAX_CHILDREN)];
    let spacing = 8.0 / (shown.len() as f64 + 1.0);

    for (i, child) in shown.iter().enumerate() {
        let x = spacing * (i as f64 + 1.0) + 1.0;
        let y = 6.0;
        canvas.line((5.0, 8.5), (x, y + 0.4), "#7F8C8D", false);
        canvas.rect(x - 0.8, y - 0.4, 1.6, 0.8, "#ECF0F1", "#34495E", 1.0);
        canvas.text(x, y, &ellipsize(child, MAX_CHILD_LABEL), 11, "#2C3E50", false);
    }

    canvas.rect(4.0, 8.5, 2.0, 0.8, "#3498DB", "#2C3E50", 1.0);
    canvas.text(5.0, 8.9, &take_chars(root, MAX_ROOT_LABEL), 14, "white", true);

    canvas.finish(title)
}

/// Topic characters kept in a diagram file name.
pub const MAX_SLUG_CHARS: usize = 80;

/// File-name-safe form of a topic: spaces and path separators become `_`.
pub fn diagram_file_name(topic: &str) -> String {
    let slug: String = topic
        .chars()
        .take(MAX_SLUG_CHARS)
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("diagram_{slug}.svg")
}

/// [`diagram_file_name`] with a `_2`, `_3`, ... suffix for names already in `taken`.
/// The returned name is added to `taken`.
pub fn unique_diagram_file_name(topic: &str, taken: &mut HashSet<String>) -> String {
    let base = diagram_file_name(topic);
    let stem = base.trim_end_matches(".svg").to_string();
    let mut name = base;
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{stem}_{n}.svg");
        n += 1;
    }
    taken.insert(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn concept_map_caps_related_concepts() {
        let related: Vec<String> = (0..12).map(|i| format!("concept{i}")).collect();
        let svg = concept_map("Center", &related);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Concept Map: Center"));
        assert!(svg.contains(">concept7<"));
        assert!(!svg.contains(">concept8<"));
        assert_eq!(svg.matches("marker-end").count(), MAX_RELATED);
    }

    #[test]
    fn concept_labels_are_ellipsized() {
        let long = "x".repeat(40);
        let svg = concept_map("C", &[long]);
        assert!(svg.contains(&format!(">{}...<", "x".repeat(30))));
    }

    #[test]
    fn text_is_xml_escaped() {
        let svg = concept_map("A & <B>", &names(&["\"quoted\""]));
        assert!(svg.contains("A &amp; &lt;B&gt;"));
        assert!(svg.contains("&quot;quoted&quot;"));
        assert!(!svg.contains("<B>"));
    }

    #[test]
    fn flow_numbers_steps_and_links_them() {
        let svg = flow(&names(&["Collect", "Analyze", "Report"]), "Process");
        assert!(svg.contains(">1. Collect<"));
        assert!(svg.contains(">3. Report<"));
        assert_eq!(svg.matches("marker-end").count(), 2);
    }

    #[test]
    fn long_steps_are_cut_to_sixty_chars() {
        let label = step_label(0, &"y".repeat(100));
        assert_eq!(label.chars().count(), MAX_STEP_LABEL);
        assert!(label.ends_with("..."));
        assert_eq!(step_label(1, "short"), "2. short");
    }

    #[test]
    fn hierarchy_caps_children_and_truncates() {
        let children = names(&["a", "b", "c", "d", "e", "f", "a very long child name"]);
        let svg = hierarchy("Biology of the living cell", &children, "Tree");
        assert!(svg.contains(">Biology of the livin<"));
        assert!(svg.contains(">e<"));
        assert!(!svg.contains(">f<"));
        assert_eq!(svg.matches("<line").count(), MAX_CHILDREN);
    }

    #[test]
    fn empty_root_is_labelled_root() {
        let svg = hierarchy("", &[], "Empty");
        assert!(svg.contains(">Root<"));
    }

    #[test]
    fn diagram_file_names_are_path_safe() {
        assert_eq!(diagram_file_name("Cell Biology"), "diagram_Cell_Biology.svg");
        assert_eq!(diagram_file_name("../etc"), "diagram____etc.svg");
    }

    #[test]
    fn long_topics_are_cut_in_file_names() {
        let name = diagram_file_name(&"é".repeat(500));
        assert_eq!(name, format!("diagram_{}.svg", "é".repeat(MAX_SLUG_CHARS)));
        assert!(name.len() < 255);
    }

    #[test]
    fn colliding_topics_get_numbered_names() {
        let mut taken = HashSet::new();
        assert_eq!(unique_diagram_file_name("Cells!", &mut taken), "diagram_Cells_.svg");
        assert_eq!(unique_diagram_file_name("Cells?", &mut taken), "diagram_Cells__2.svg");
        assert_eq!(unique_diagram_file_name("Cells.", &mut taken), "diagram_Cells__3.svg");
        assert_eq!(taken.len(), 3);
    }
}
