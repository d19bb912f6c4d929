/// Scene light; immutable once added
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Shines from `position` toward the origin
    Directional {
        color: [f32; 3],
        intensity: f32,
        position: [f32; 3],
    },
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
}

impl Light {
    pub fn directional(color: [f32; 3], intensity: f32, position: [f32; 3]) -> Self {
        Light::Directional {
            color,
            intensity,
            position,
        }
    }

    pub fn ambient(color: [f32; 3], intensity: f32) -> Self {
        Light::Ambient { color, intensity }
    }

    /// Color premultiplied by intensity
    pub fn radiance(&self) -> [f32; 3] {
        let (color, intensity) = match *self {
            Light::Directional {
                color, intensity, ..
            } => (color, intensity),
            Light::Ambient { color, intensity } => (color, intensity),
        };
        color.map(|c| c * intensity)
    }
}
