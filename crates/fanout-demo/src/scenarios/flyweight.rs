#![forbid(unsafe_code)]

//! RGBA colours shared through an explicit cache.

use std::sync::Arc;

use fanout_core::FlyweightCache;

use super::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Rgba {
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

/// Colour palette handing out one shared [`Rgba`] per component tuple.
#[derive(Debug, Default)]
pub struct Palette {
    store: FlyweightCache<(u8, u8, u8, u8), Rgba>,
}

impl Palette {
    pub fn rgba(&self, red: u8, green: u8, blue: u8, alpha: u8) -> Arc<Rgba> {
        self.store.intern((red, green, blue, alpha), || {
            Rgba::new(red, green, blue, alpha)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[must_use]
pub fn run() -> Vec<String> {
    let transcript = Transcript::default();

    let color = Arc::new(Rgba::new(255, 0, 0, 255));
    let color2 = Arc::new(Rgba::new(255, 0, 0, 255));
    transcript.line(format!(
        "separately built reds equal: {}, shared: {}",
        color == color2,
        Arc::ptr_eq(&color, &color2)
    ));

    let palette = Palette::default();
    let fly = palette.rgba(255, 0, 0, 255);
    let fly2 = palette.rgba(255, 0, 0, 255);
    transcript.line(format!("palette reds shared: {}", Arc::ptr_eq(&fly, &fly2)));

    let blue = palette.rgba(0, 0, 255, 255);
    transcript.line(format!(
        "palette blue shared with red: {}",
        Arc::ptr_eq(&fly, &blue)
    ));
    transcript.line(format!("palette holds {} colours", palette.len()));
    transcript.lines()
}
