//! Viewer configuration

use meshscope_core::Row3;
use serde::{Deserialize, Serialize};

/// Window and render options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window title, applied when the window opens
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub background: Row3,
    /// Draw the xyz axes at the origin (toggle: `a`)
    pub draw_axes: bool,
    /// Toggle: `w`
    pub wireframe: bool,
    /// Toggle: `c`
    pub cull_face: bool,
    /// Redraw only on input (`true`) or continuously (`false`)
    pub loop_wait_events: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "meshscope".to_string(),
            width: 1000,
            height: 600,
            background: [1.0, 1.0, 1.0],
            draw_axes: true,
            wireframe: false,
            cull_face: true,
            loop_wait_events: true,
        }
    }
}

/// Point light shared by every mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lighting {
    /// Position in view space, so the light follows the camera
    pub position: Row3,
    pub ambient: Row3,
    pub diffuse: Row3,
    pub specular: Row3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            position: [12.0, 10.0, 20.0],
            ambient: [0.2, 0.2, 0.2],
            diffuse: [1.0, 1.0, 1.0],
            specular: [1.0, 1.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.title, "meshscope");
        assert_eq!((config.width, config.height), (1000, 600));
        assert!(config.draw_axes && config.cull_face && !config.wireframe);
        assert_eq!(Lighting::default().ambient, [0.2; 3]);
    }
}
