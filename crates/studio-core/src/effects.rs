//! Per-layer effect stack: drop shadows and layer blur.
//!
//! Effects keep their order and identity. Disabled entries stay in the list
//! but are skipped by every renderer-facing helper below.

use crate::id::EffectId;
use crate::model::{Color, fmt_num};
use crate::paint::resolve_color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectType {
    DropShadow,
    LayerBlur,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EffectKind {
    #[serde(rename_all = "camelCase")]
    DropShadow {
        offset_x: f32,
        offset_y: f32,
        blur: f32,
        spread: f32,
        color: String,
        opacity: f32,
    },
    LayerBlur {
        blur: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    #[serde(default = "EffectId::fresh")]
    pub id: EffectId,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: EffectKind,
}

fn enabled() -> bool {
    true
}

impl Effect {
    /// A new enabled effect with the documented defaults: shadows offset
    /// 4,4 with blur 10 in black at 25%, blurs at 5px.
    pub fn new(ty: EffectType) -> Self {
        let kind = match ty {
            EffectType::DropShadow => EffectKind::DropShadow {
                offset_x: 4.0,
                offset_y: 4.0,
                blur: 10.0,
                spread: 0.0,
                color: "#000000".to_string(),
                opacity: 0.25,
            },
            EffectType::LayerBlur => EffectKind::LayerBlur { blur: 5.0 },
        };
        Self {
            id: EffectId::fresh(),
            enabled: true,
            kind,
        }
    }

    pub fn effect_type(&self) -> EffectType {
        match self.kind {
            EffectKind::DropShadow { .. } => EffectType::DropShadow,
            EffectKind::LayerBlur { .. } => EffectType::LayerBlur,
        }
    }

    /// Merge `patch`; fields that do not exist on this kind are ignored.
    pub fn apply_patch(&mut self, patch: &EffectPatch) -> bool {
        let before = self.clone();
        if let Some(e) = patch.enabled {
            self.enabled = e;
        }
        let clean = |v: Option<f32>| v.filter(|v| v.is_finite());
        match &mut self.kind {
            EffectKind::DropShadow {
                offset_x,
                offset_y,
                blur,
                spread,
                color,
                opacity,
            } => {
                if let Some(v) = clean(patch.offset_x) {
                    *offset_x = v;
                }
                if let Some(v) = clean(patch.offset_y) {
                    *offset_y = v;
                }
                if let Some(v) = clean(patch.blur) {
                    *blur = v.max(0.0);
                }
                if let Some(v) = clean(patch.spread) {
                    *spread = v;
                }
                if let Some(v) = &patch.color {
                    *color = v.clone();
                }
                if let Some(v) = clean(patch.opacity) {
                    *opacity = v.clamp(0.0, 1.0);
                }
            }
            EffectKind::LayerBlur { blur } => {
                if let Some(v) = clean(patch.blur) {
                    *blur = v.max(0.0);
                }
            }
        }
        *self != before
    }
}

/// Partial update for one effect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectPatch {
    pub enabled: Option<bool>,
    pub offset_x: Option<f32>,
    pub offset_y: Option<f32>,
    pub blur: Option<f32>,
    pub spread: Option<f32>,
    pub color: Option<String>,
    pub opacity: Option<f32>,
}

// ─── Stack operations ────────────────────────────────────────────────────

pub fn add_effect(effects: &mut Vec<Effect>, ty: EffectType) -> EffectId {
    let effect = Effect::new(ty);
    let id = effect.id;
    effects.push(effect);
    id
}

pub fn toggle_effect(effects: &mut [Effect], id: EffectId) -> bool {
    match effects.iter_mut().find(|e| e.id == id) {
        Some(effect) => {
            effect.enabled = !effect.enabled;
            true
        }
        None => false,
    }
}

pub fn update_effect(effects: &mut [Effect], id: EffectId, patch: &EffectPatch) -> bool {
    effects
        .iter_mut()
        .find(|e| e.id == id)
        .is_some_and(|e| e.apply_patch(patch))
}

pub fn remove_effect(effects: &mut Vec<Effect>, id: EffectId) -> bool {
    let before = effects.len();
    effects.retain(|e| e.id != id);
    effects.len() != before
}

// ─── Resolved effects ────────────────────────────────────────────────────

/// One enabled drop shadow with its color and opacity resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSpec {
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
    pub spread: f32,
    pub color: Color,
}

/// Enabled shadows in list order (the first one is painted on top).
pub fn enabled_shadows(effects: &[Effect]) -> Vec<ShadowSpec> {
    effects
        .iter()
        .filter(|e| e.enabled)
        .filter_map(|e| match &e.kind {
            EffectKind::DropShadow {
                offset_x,
                offset_y,
                blur,
                spread,
                color,
                opacity,
            } => Some(ShadowSpec {
                offset_x: *offset_x,
                offset_y: *offset_y,
                blur: (*blur).max(0.0),
                spread: *spread,
                color: resolve_color(color, Color::BLACK).fade((*opacity).clamp(0.0, 1.0)),
            }),
            EffectKind::LayerBlur { .. } => None,
        })
        .collect()
}

/// Blur radius applied to the layer: the largest enabled blur. Blurs do
/// not accumulate.
pub fn effective_blur(effects: &[Effect]) -> Option<f32> {
    effects
        .iter()
        .filter(|e| e.enabled)
        .filter_map(|e| match e.kind {
            EffectKind::LayerBlur { blur } if blur > 0.0 => Some(blur),
            _ => None,
        })
        .reduce(f32::max)
}

/// Comma-joined `box-shadow` list, one descriptor per enabled shadow.
pub fn css_box_shadow(effects: &[Effect]) -> Option<String> {
    let parts: Vec<String> = enabled_shadows(effects)
        .iter()
        .map(|s| {
            format!(
                "{}px {}px {}px {}px {}",
                fmt_num(s.offset_x),
                fmt_num(s.offset_y),
                fmt_num(s.blur),
                fmt_num(s.spread),
                s.color.to_css_rgba()
            )
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// `text-shadow` list for text layers (CSS text shadows have no spread).
pub fn css_text_shadow(effects: &[Effect]) -> Option<String> {
    let parts: Vec<String> = enabled_shadows(effects)
        .iter()
        .map(|s| {
            format!(
                "{}px {}px {}px {}",
                fmt_num(s.offset_x),
                fmt_num(s.offset_y),
                fmt_num(s.blur),
                s.color.to_css_rgba()
            )
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// `filter` value for the effective blur.
pub fn css_filter(effects: &[Effect]) -> Option<String> {
    effective_blur(effects).map(|b| format!("blur({}px)", fmt_num(b)))
}
