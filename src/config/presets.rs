/// A selectable font preset: display name plus CSS-like family stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontPreset {
    pub name: &'static str,
    pub family: &'static str,
}

pub const FONTS: &[FontPreset] = &[
    FontPreset {
        name: "Inter",
        family: "\"Inter\", sans-serif",
    },
    FontPreset {
        name: "Bebas Neue",
        family: "\"Bebas Neue\", sans-serif",
    },
    FontPreset {
        name: "Anton",
        family: "\"Anton\", sans-serif",
    },
    FontPreset {
        name: "Lobster",
        family: "\"Lobster\", cursive",
    },
    FontPreset {
        name: "Montserrat",
        family: "\"Montserrat\", sans-serif",
    },
    FontPreset {
        name: "Playfair Display",
        family: "\"Playfair Display\", serif",
    },
    FontPreset {
        name: "Roboto Mono",
        family: "\"Roboto Mono\", monospace",
    },
];

/// Look up a preset by display name (case-insensitive).
pub fn font_by_name(name: &str) -> Option<&'static FontPreset> {
    FONTS.iter().find(|f| f.name.eq_ignore_ascii_case(name.trim()))
}

/// Resolve a user-supplied font: a preset name maps to its stack, anything else is used verbatim.
pub fn resolve_font_family(input: &str) -> String {
    match font_by_name(input) {
        Some(preset) => preset.family.to_owned(),
        None => input.trim().to_owned(),
    }
}
