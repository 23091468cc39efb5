//! Font lookup for the raster renderer.
//!
//! Faces are resolved through a fontdb database from a CSS `font-family`
//! list and weight, then parsed into rusttype fonts and cached. An empty
//! book (no system fonts) is valid: text then renders as placeholder boxes.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use rusttype::Font;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Eq, PartialEq, Hash)]
struct FontKey {
    family: String,
    weight: u16,
}

pub struct FontBook {
    db: Database,
    cache: Mutex<HashMap<FontKey, Option<Arc<Font<'static>>>>>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.db.len())
            .finish()
    }
}

impl FontBook {
    /// A book over the fonts installed on this machine.
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("loaded {} system font faces", db.len());
        Self::from_database(db)
    }

    /// A book with no faces at all.
    pub fn empty() -> Self {
        Self::from_database(Database::new())
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            db,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Add a font file's bytes (TTF/OTF/TTC) to the book.
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Best face for a CSS family list at `weight`, or `None` when nothing
    /// matches (not even the sans-serif fallback).
    pub fn font(&self, family: &str, weight: u16) -> Option<Arc<Font<'static>>> {
        let key = FontKey {
            family: family.to_string(),
            weight,
        };
        if let Some(hit) = self.cache.lock().unwrap_or_else(|p| p.into_inner()).get(&key) {
            return hit.clone();
        }

        let loaded = self.load(family, weight).map(Arc::new);
        if loaded.is_none() {
            log::warn!("no font face for {family:?} at weight {weight}");
        }
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key, loaded.clone());
        loaded
    }

    fn load(&self, family: &str, weight: u16) -> Option<Font<'static>> {
        let names = parse_family_list(family);
        let mut families: Vec<Family<'_>> = names.iter().map(|n| to_family(n)).collect();
        families.push(Family::SansSerif);

        let query = Query {
            families: &families,
            weight: Weight(weight),
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                Font::try_from_vec_and_index(data.to_vec(), index)
            })
            .flatten()
    }
}

/// Split a CSS `font-family` value into unquoted names.
pub fn parse_family_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|n| n.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_family(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "sans-serif" | "system-ui" => Family::SansSerif,
        "serif" => Family::Serif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_list_parsing() {
        assert_eq!(
            parse_family_list(r#""Playfair Display", Georgia, serif"#),
            vec!["Playfair Display", "Georgia", "serif"]
        );
        assert!(parse_family_list(" , ").is_empty());
        assert!(matches!(to_family("Sans-Serif"), Family::SansSerif));
        assert!(matches!(to_family("Inter"), Family::Name("Inter")));
    }

    #[test]
    fn empty_book_resolves_nothing_and_caches() {
        let book = FontBook::empty();
        assert!(book.is_empty());
        assert!(book.font("Inter, sans-serif", 700).is_none());
        assert!(book.font("Inter, sans-serif", 700).is_none());
        assert_eq!(book.cache.lock().unwrap().len(), 1);
    }
}
