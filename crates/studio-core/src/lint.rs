//! Lint diagnostics for Studio documents.
//!
//! Reports style data the renderers would have to repair, plus geometry
//! that cannot be seen, without modifying the document.

use crate::id::LayerId;
use crate::model::{Color, Document, Layer, LayerKind};

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Renders with a fallback; likely a mistake.
    Warning,
    /// Informational.
    Info,
}

/// A single lint diagnostic for a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LintDiagnostic {
    pub layer_id: LayerId,
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "bad-color", "few-stops").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over the document and return diagnostics.
#[must_use]
pub fn lint_document(doc: &Document) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    for layer in &doc.layers {
        lint_colors(layer, &mut diags);
        lint_gradient(layer, &mut diags);
        lint_image(layer, &mut diags);
        lint_off_canvas(doc, layer, &mut diags);
    }
    lint_backgrounds(doc, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

fn bad_color(layer: &Layer, field: &str, value: &str, diags: &mut Vec<LintDiagnostic>) {
    if Color::parse_css(value).is_none() {
        diags.push(LintDiagnostic {
            layer_id: layer.id,
            message: format!("`{field}` value {value:?} is not a color; it renders as gray."),
            severity: LintSeverity::Warning,
            rule: "bad-color",
        });
    }
}

fn lint_colors(layer: &Layer, diags: &mut Vec<LintDiagnostic>) {
    if !layer.style.is_gradient {
        bad_color(layer, "color", &layer.style.color, diags);
    }
    match &layer.kind {
        LayerKind::Rectangle(s) | LayerKind::Circle(s) if s.stroke_width > 0.0 => {
            bad_color(layer, "strokeColor", &s.stroke_color, diags);
        }
        LayerKind::Text(t) => {
            if let Some(bg) = &t.background {
                bad_color(layer, "background", bg, diags);
            }
        }
        _ => {}
    }
}

fn lint_gradient(layer: &Layer, diags: &mut Vec<LintDiagnostic>) {
    if !layer.style.is_gradient {
        return;
    }
    let stops = &layer.style.gradient_stops;
    if stops.len() < 2 {
        diags.push(LintDiagnostic {
            layer_id: layer.id,
            message: format!(
                "Gradient has {} stop(s); at least 2 are required, it renders as gray.",
                stops.len()
            ),
            severity: LintSeverity::Warning,
            rule: "few-stops",
        });
    }
    for (i, stop) in stops.iter().enumerate() {
        if !(0.0..=100.0).contains(&stop.position) {
            diags.push(LintDiagnostic {
                layer_id: layer.id,
                message: format!("Stop {i} sits at {}%, outside 0..100.", stop.position),
                severity: LintSeverity::Warning,
                rule: "stop-range",
            });
        }
        bad_color(layer, &format!("gradientStops[{i}].color"), &stop.color, diags);
    }
}

fn lint_image(layer: &Layer, diags: &mut Vec<LintDiagnostic>) {
    let Some(img) = layer.image() else {
        return;
    };
    if img.src.is_empty() {
        diags.push(LintDiagnostic {
            layer_id: layer.id,
            message: "Image layer has no source.".to_string(),
            severity: LintSeverity::Warning,
            rule: "missing-src",
        });
    } else if !img.has_intrinsic_size() {
        diags.push(LintDiagnostic {
            layer_id: layer.id,
            message: "Image size is unknown until it loads; pan offsets are not centered yet."
                .to_string(),
            severity: LintSeverity::Info,
            rule: "unknown-size",
        });
    }
}

fn lint_off_canvas(doc: &Document, layer: &Layer, diags: &mut Vec<LintDiagnostic>) {
    if !layer.bounds().intersects(&doc.canvas_bounds()) {
        diags.push(LintDiagnostic {
            layer_id: layer.id,
            message: format!(
                "Layer lies entirely outside the {} canvas and will not appear in the export.",
                doc.aspect.label()
            ),
            severity: LintSeverity::Warning,
            rule: "off-canvas",
        });
    }
}

fn lint_backgrounds(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    let flagged: Vec<&Layer> = doc.layers.iter().filter(|l| l.is_background()).collect();
    for extra in flagged.iter().skip(1) {
        diags.push(LintDiagnostic {
            layer_id: extra.id,
            message: "More than one layer is flagged as the background image.".to_string(),
            severity: LintSeverity::Warning,
            rule: "multiple-backgrounds",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GradientStop, LayerPatch, LayerType};

    fn rules(doc: &Document) -> Vec<&'static str> {
        lint_document(doc).into_iter().map(|d| d.rule).collect()
    }

    #[test]
    fn clean_document_has_no_findings() {
        let mut doc = Document::default();
        doc.add_layer(LayerType::Rectangle, &LayerPatch::default());
        doc.add_layer(LayerType::Text, &LayerPatch::default());
        assert!(lint_document(&doc).is_empty());
    }

    #[test]
    fn reports_bad_color_and_off_canvas() {
        let mut doc = Document::default();
        doc.add_layer(
            LayerType::Rectangle,
            &LayerPatch {
                color: Some("pinkish".into()),
                ..LayerPatch::position(900.0, 900.0)
            },
        );
        assert_eq!(rules(&doc), vec!["bad-color", "off-canvas"]);
    }

    #[test]
    fn reports_gradient_problems() {
        let mut doc = Document::default();
        let id = doc.add_layer(LayerType::Circle, &LayerPatch::default());
        let layer = doc.layer_mut(id).unwrap();
        layer.style.is_gradient = true;
        layer.style.gradient_stops = vec![GradientStop::new(120.0, "#FFF", 1.0)];
        assert_eq!(rules(&doc), vec!["few-stops", "stop-range"]);
    }

    #[test]
    fn reports_unknown_image_size_and_duplicate_backgrounds() {
        let mut doc = Document::default();
        doc.import_background("a.png");
        let second = doc.add_layer(
            LayerType::Image,
            &LayerPatch {
                src: Some("b.png".into()),
                original_width: Some(10.0),
                original_height: Some(10.0),
                ..Default::default()
            },
        );
        if let LayerKind::Image(img) = &mut doc.layer_mut(second).unwrap().kind {
            img.is_background = true;
        }
        assert_eq!(rules(&doc), vec!["unknown-size", "multiple-backgrounds"]);
    }
}
