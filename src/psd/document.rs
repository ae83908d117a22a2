//! In-memory layer model of a PSD/PSB document

/// File format variant, from the header version field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsdVersion {
    /// Photoshop document (version 1)
    Psd,
    /// Large document format (version 2)
    Psb,
}

impl PsdVersion {
    /// Map a header version number to a format variant
    pub fn from_header(version: u16) -> Option<Self> {
        match version {
            1 => Some(PsdVersion::Psd),
            2 => Some(PsdVersion::Psb),
            _ => None,
        }
    }

    /// True when section and channel lengths are stored as 64-bit values
    pub fn is_large(self) -> bool {
        self == PsdVersion::Psb
    }
}

/// One run of uniformly styled characters in a text layer
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRun {
    /// Number of characters covered by the run
    pub length: u32,
    /// Font name used by the run
    pub font: String,
}

/// Text content of a type layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayer {
    /// Style runs in character order
    pub runs: Vec<StyleRun>,
}

/// What a layer holds
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// Raster, shape, adjustment or any other non-text, non-group layer
    Pixel,
    /// Layer group with its children, bottom-most first
    Group(Vec<Layer>),
    /// Type layer
    Text(TextLayer),
}

/// A single node of the layer tree
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
}

impl Layer {
    pub fn pixel(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: LayerKind::Pixel }
    }

    pub fn group(name: impl Into<String>, children: Vec<Layer>) -> Self {
        Self { name: name.into(), kind: LayerKind::Group(children) }
    }

    /// Build a text layer where each entry of `fonts` becomes a one-character run
    pub fn text<S: Into<String>>(name: impl Into<String>, fonts: impl IntoIterator<Item = S>) -> Self {
        let runs = fonts
            .into_iter()
            .map(|font| StyleRun { length: 1, font: font.into() })
            .collect();
        Self { name: name.into(), kind: LayerKind::Text(TextLayer { runs }) }
    }

    /// Children of a group layer; empty for everything else
    pub fn children(&self) -> &[Layer] {
        match &self.kind {
            LayerKind::Group(children) => children.as_slice(),
            _ => &[],
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, LayerKind::Text(_))
    }
}

/// A parsed PSD/PSB document
#[derive(Debug, Clone, PartialEq)]
pub struct PsdDocument {
    pub version: PsdVersion,
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Top-level layers, bottom-most first
    pub layers: Vec<Layer>,
}

impl PsdDocument {
    /// Iterate every layer of the tree in pre-order
    ///
    /// A group is yielded before its children; siblings keep their stored
    /// (bottom-to-top) order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: self.layers.iter().rev().collect() }
    }

    /// Font names referenced by text layers, one entry per style run
    pub fn fonts(&self) -> impl Iterator<Item = &str> + '_ {
        self.descendants()
            .filter_map(|layer| match &layer.kind {
                LayerKind::Text(text) => Some(text.runs.iter().map(|run| run.font.as_str())),
                _ => None,
            })
            .flatten()
    }
}

/// Pre-order iterator over a layer tree, see [`PsdDocument::descendants`]
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Layer>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Layer;

    fn next(&mut self) -> Option<&'a Layer> {
        let layer = self.stack.pop()?;
        self.stack.extend(layer.children().iter().rev());
        Some(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PsdDocument {
        PsdDocument {
            version: PsdVersion::Psd,
            width: 10,
            height: 10,
            layers: vec![
                Layer::pixel("Background"),
                Layer::group(
                    "Titles",
                    vec![
                        Layer::text("Heading", ["Arial", "Arial-Bold"]),
                        Layer::group("Inner", vec![Layer::text("Caption", ["Helvetica"])]),
                    ],
                ),
                Layer::text("Footer", ["Arial"]),
            ],
        }
    }

    #[test]
    fn test_version_from_header() {
        assert_eq!(PsdVersion::from_header(1), Some(PsdVersion::Psd));
        assert_eq!(PsdVersion::from_header(2), Some(PsdVersion::Psb));
        assert_eq!(PsdVersion::from_header(3), None);
        assert!(PsdVersion::Psb.is_large());
        assert!(!PsdVersion::Psd.is_large());
    }

    #[test]
    fn test_descendants_pre_order() {
        let doc = sample();
        let names: Vec<&str> = doc.descendants().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Background", "Titles", "Heading", "Inner", "Caption", "Footer"]
        );
    }

    #[test]
    fn test_fonts_include_nested_groups_and_every_run() {
        let doc = sample();
        let fonts: Vec<&str> = doc.fonts().collect();
        assert_eq!(fonts, vec!["Arial", "Arial-Bold", "Helvetica", "Arial"]);
    }

    #[test]
    fn test_empty_document_has_no_fonts() {
        let doc = PsdDocument { version: PsdVersion::Psb, width: 1, height: 1, layers: vec![] };
        assert_eq!(doc.descendants().count(), 0);
        assert_eq!(doc.fonts().count(), 0);
    }
}
