use serde::Serialize;

/// Decor styles the image model knows a recipe for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Style {
    #[default]
    Modern,
    Minimalist,
    Scandinavian,
    Rustic,
    Industrial,
    Boho,
}

const PRESERVATION_RULES: &str = "\
Preserve the original room layout, proportions, and architectural structure exactly as in the input image.
Do NOT move, remove, resize, or relocate walls, ceiling, window positions and sizes, door position and size, or camera angle.
The door and windows must remain clearly visible in their original locations.

Refine and enhance the existing room to look clean, organized, and aesthetically pleasing,
while remaining realistic, achievable, and faithful to the original space.
Improve organization, material quality, color harmony, furniture alignment, and visual balance.
Do not redesign the room or invent new architectural elements.

The door must remain in the same position and size, but its design, color, and finish may be updated to match the selected style.
The floor layout must remain unchanged, but the floor material, texture, and color may be upgraded to match the selected style.

Use natural, realistic daylight consistent with the window positions.
Avoid dramatic or cinematic lighting.";

impl Style {
    pub const ALL: [Style; 6] = [
        Style::Modern,
        Style::Minimalist,
        Style::Scandinavian,
        Style::Rustic,
        Style::Industrial,
        Style::Boho,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Modern => "Modern",
            Style::Minimalist => "Minimalist",
            Style::Scandinavian => "Scandinavian",
            Style::Rustic => "Rustic",
            Style::Industrial => "Industrial",
            Style::Boho => "Boho",
        }
    }

    /// Exact (trimmed, case-sensitive) name match; anything else is `Modern`.
    pub fn normalize(input: Option<&str>) -> Self {
        let name = input.map(str::trim).unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == name)
            .unwrap_or_default()
    }

    pub fn recipe(&self) -> &'static str {
        match self {
            Style::Modern => {
                "- Materials: smooth matte walls, microcement or wide-plank oak floor, black metal accents.
- Palette: neutral (white/gray/black) with 1 subtle accent color.
- Furniture: clean lines, low-profile sofa, minimal decor.
- Lighting: recessed/track lights, modern pendant, crisp contrast."
            }
            Style::Minimalist => {
                "- Materials: very plain surfaces, light oak or pale microcement floor, NO clutter.
- Palette: soft whites, warm beige, very low contrast.
- Furniture: fewer pieces, ultra-simple shapes, hidden storage, empty surfaces.
- Lighting: soft, even, natural, minimal fixtures."
            }
            Style::Scandinavian => {
                "- Materials: light oak floor, white walls, cozy textiles (wool/linen), natural wood.
- Palette: bright whites + light gray + warm wood.
- Furniture: airy, functional, rounded edges, hygge feel.
- Lighting: warm natural light, simple pendant lamps."
            }
            Style::Rustic => {
                "- Materials: rustic wood planks floor, textured plaster walls, reclaimed wood, wrought iron.
- Palette: warm earthy tones (brown/cream/terracotta).
- Furniture: chunkier wood furniture, handcrafted feel, natural textures.
- Lighting: warm, cozy, slightly dimmer, vintage lamps."
            }
            Style::Industrial => {
                "- Materials: polished concrete floor OR dark wood, brick/concrete wall texture, exposed metal.
- Palette: charcoal/gray/black with warm wood accents.
- Furniture: metal frames, leather details, utilitarian shelves.
- Lighting: exposed bulbs, track lighting, strong shadows (but still realistic)."
            }
            Style::Boho => {
                "- Materials: warm wood floor, layered rugs, woven textures, rattan, macrame.
- Palette: warm neutrals + earthy accents (sage/terracotta).
- Furniture: eclectic pieces, plants, cozy layered styling.
- Lighting: warm ambient, lanterns, natural materials."
            }
        }
    }

    /// Full instruction text sent to the image model.
    pub fn prompt(&self) -> String {
        format!(
            "{PRESERVATION_RULES}\n\nInterior design style: {}\n\nStyle recipe:\n{}",
            self.as_str(),
            self.recipe()
        )
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
