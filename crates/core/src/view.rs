use std::collections::HashMap;

use crate::render::{DisplayOp, Surface};

/// Host-provided display surfaces. Write-only from the core's point of view.
pub trait ViewAdapter {
    fn clear(&mut self, surface: Surface);
    fn append_line(&mut self, surface: Surface, text: &str);
    fn set_status_text(&mut self, surface: Surface, text: &str);

    fn apply(&mut self, ops: &[DisplayOp]) {
        for op in ops {
            match op {
                DisplayOp::Clear(surface) => self.clear(*surface),
                DisplayOp::AppendLine(surface, text) => self.append_line(*surface, text),
                DisplayOp::SetStatus(surface, text) => self.set_status_text(*surface, text),
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceBuffer {
    pub lines: Vec<String>,
    pub status: String,
}

/// In-memory surfaces, used by headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct BufferView {
    surfaces: HashMap<Surface, SurfaceBuffer>,
}

impl BufferView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self, surface: Surface) -> &[String] {
        self.surfaces
            .get(&surface)
            .map(|buffer| buffer.lines.as_slice())
            .unwrap_or_default()
    }

    pub fn status(&self, surface: Surface) -> &str {
        self.surfaces
            .get(&surface)
            .map(|buffer| buffer.status.as_str())
            .unwrap_or_default()
    }

    fn buffer_mut(&mut self, surface: Surface) -> &mut SurfaceBuffer {
        self.surfaces.entry(surface).or_default()
    }
}

impl ViewAdapter for BufferView {
    fn clear(&mut self, surface: Surface) {
        self.buffer_mut(surface).lines.clear();
    }

    fn append_line(&mut self, surface: Surface, text: &str) {
        self.buffer_mut(surface).lines.push(text.to_string());
    }

    fn set_status_text(&mut self, surface: Surface, text: &str) {
        self.buffer_mut(surface).status = text.to_string();
    }
}
