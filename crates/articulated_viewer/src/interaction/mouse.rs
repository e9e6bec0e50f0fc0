//! Pointer state
//!
//! Tracks the pointer in window pixels, converts it to Normalized Device
//! Coordinates for ray casting and applies the movement threshold that keeps
//! sub-pixel jitter from triggering new hover raycasts.

/// Pointer state for one viewport
#[derive(Debug, Clone)]
pub struct MouseState {
    /// Current screen-space X position (pixels from left)
    pub screen_x: f64,
    /// Current screen-space Y position (pixels from top)
    pub screen_y: f64,
    /// Viewport width in pixels
    pub window_width: u32,
    /// Viewport height in pixels
    pub window_height: u32,
    /// Whether the primary button is held
    pub button_down: bool,
    /// Position where the button went down
    pub drag_start: Option<(f64, f64)>,
    last_sample: Option<(f64, f64)>,
}

impl MouseState {
    /// Create a pointer state for a viewport of the given size
    pub fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            screen_x: 0.0,
            screen_y: 0.0,
            window_width,
            window_height,
            button_down: false,
            drag_start: None,
            last_sample: None,
        }
    }

    /// Convert the pointer position to Normalized Device Coordinates
    ///
    /// X runs from -1 (left) to +1 (right); Y from -1 (bottom) to +1 (top),
    /// matching the projection used by [`super::Camera`]. A zero-sized
    /// viewport maps to the centre.
    pub fn screen_to_ndc(&self) -> (f32, f32) {
        if self.window_width == 0 || self.window_height == 0 {
            return (0.0, 0.0);
        }
        let ndc_x = (self.screen_x / f64::from(self.window_width)) as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - (self.screen_y / f64::from(self.window_height)) as f32 * 2.0;
        (ndc_x, ndc_y)
    }

    /// Update the pointer position
    pub fn update_position(&mut self, x: f64, y: f64) {
        self.screen_x = x;
        self.screen_y = y;
    }

    /// Update the viewport size
    pub fn update_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    /// Whether the pointer moved at least `threshold` pixels since the last sample
    ///
    /// The first position after a reset always counts as movement.
    pub fn moved_beyond(&self, threshold: f64) -> bool {
        self.last_sample.map_or(true, |(x, y)| {
            let dx = self.screen_x - x;
            let dy = self.screen_y - y;
            (dx * dx + dy * dy).sqrt() >= threshold
        })
    }

    /// Remember the current position as the last sampled one
    pub fn mark_sampled(&mut self) {
        self.last_sample = Some((self.screen_x, self.screen_y));
    }

    /// Forget the last sample (pointer left the viewport)
    pub fn reset_sample(&mut self) {
        self.last_sample = None;
    }

    /// Record a button press at the current position
    pub fn start_drag(&mut self) {
        self.drag_start = Some((self.screen_x, self.screen_y));
        self.button_down = true;
    }

    /// Record a button release
    pub fn end_drag(&mut self) {
        self.drag_start = None;
        self.button_down = false;
    }
}

impl Default for MouseState {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}
