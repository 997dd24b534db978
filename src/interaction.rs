// Pointer interaction: turns down/move/up events into rectangle geometry.
// Visual: whatever this module stores is what the render loop outlines on
// top of the next camera frame.

use crate::types::{Point, Rect, RectId};

/// Pointer input in surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
}

/// Which interaction a pointer-down starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    /// Press on a rectangle to move it, on its corner handle to resize it.
    /// Draws a new one only while nothing exists yet.
    #[default]
    Edit,
    /// Every press starts a new rectangle.
    Draw,
}

/// Observable state of the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Drawing,
    Moving,
    Resizing,
}

/// One rectangle in the collection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shape {
    pub id: RectId,
    pub rect: Rect,
}

/// In-progress gesture between pointer-down and pointer-up.
#[derive(Clone, Copy, Debug)]
enum Session {
    Drawing {
        id: RectId,
    },
    Moving {
        id: RectId,
        /// Pointer position minus rectangle origin at press time.
        offset: Point,
    },
    Resizing {
        id: RectId,
        start_width: f32,
        start_height: f32,
        down: Point,
    },
}

impl Session {
    fn id(&self) -> RectId {
        match *self {
            Session::Drawing { id } | Session::Moving { id, .. } | Session::Resizing { id, .. } => id,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InteractionConfig {
    /// Side of the square resize zone at each rectangle's bottom-right corner.
    pub handle_size: f32,
    /// How many rectangles may exist at once (oldest is dropped when full).
    pub max_rects: usize,
    pub tool: Tool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self { handle_size: 10.0, max_rects: 1, tool: Tool::Edit }
    }
}

/// Sole writer of rectangle geometry.
#[derive(Debug)]
pub struct Interaction {
    shapes: Vec<Shape>, // z-order: last = topmost
    session: Option<Session>,
    next_id: RectId,
    config: InteractionConfig,
}

impl Interaction {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            shapes: Vec::new(),
            session: None,
            next_id: 1,
            config: InteractionConfig { max_rects: config.max_rects.max(1), ..config },
        }
    }

    pub fn handle(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down(p) => self.pointer_down(p),
            PointerEvent::Move(p) => self.pointer_move(p),
            PointerEvent::Up => self.pointer_up(),
        }
    }

    pub fn pointer_down(&mut self, p: Point) {
        if self.session.is_some() {
            // single pointer: the previous press is still held
            log::debug!("pointer down at {p:?} ignored, a gesture is already active");
            return;
        }

        if self.shapes.is_empty() || self.config.tool == Tool::Draw {
            self.begin_draw(p);
            return;
        }

        let handle_size = self.config.handle_size;
        let hit = self.shapes.iter().rev().find_map(|s| {
            if s.rect.handle(handle_size).contains(p) {
                Some(Session::Resizing {
                    id: s.id,
                    start_width: s.rect.width,
                    start_height: s.rect.height,
                    down: p,
                })
            } else if s.rect.contains(p) {
                Some(Session::Moving { id: s.id, offset: p - s.rect.origin() })
            } else {
                None
            }
        });

        if let Some(session) = hit {
            log::debug!("pointer down at {p:?}: {session:?}");
        }
        self.session = hit;
    }

    pub fn pointer_move(&mut self, p: Point) {
        let Some(session) = self.session else { return };
        let Some(rect) = self.rect_mut(session.id()) else { return };

        match session {
            Session::Drawing { .. } => {
                rect.width = p.x - rect.x;
                rect.height = p.y - rect.y;
            }
            Session::Moving { offset, .. } => {
                let origin = p - offset;
                rect.x = origin.x;
                rect.y = origin.y;
            }
            Session::Resizing { start_width, start_height, down, .. } => {
                let delta = p - down;
                rect.width = start_width + delta.x;
                rect.height = start_height + delta.y;
            }
        }
    }

    pub fn pointer_up(&mut self) {
        let Some(session) = self.session.take() else { return };
        if let Some(rect) = self.rect_mut(session.id()) {
            *rect = rect.normalized();
            log::debug!("gesture finished, rectangle {} is now {rect:?}", session.id());
        }
    }

    fn begin_draw(&mut self, p: Point) {
        while self.shapes.len() >= self.config.max_rects {
            self.shapes.remove(0);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.shapes.push(Shape { id, rect: Rect::at(p) });
        self.session = Some(Session::Drawing { id });
        log::debug!("drawing rectangle {id} from {p:?}");
    }

    fn rect_mut(&mut self, id: RectId) -> Option<&mut Rect> {
        self.shapes.iter_mut().find(|s| s.id == id).map(|s| &mut s.rect)
    }

    pub fn mode(&self) -> Mode {
        match self.session {
            None => Mode::Idle,
            Some(Session::Drawing { .. }) => Mode::Drawing,
            Some(Session::Moving { .. }) => Mode::Moving,
            Some(Session::Resizing { .. }) => Mode::Resizing,
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// The topmost rectangle, if any.
    #[cfg(test)]
    pub fn current(&self) -> Option<Rect> {
        self.shapes.last().map(|s| s.rect)
    }

    #[cfg(test)]
    pub fn rect(&self, id: RectId) -> Option<Rect> {
        self.shapes.iter().find(|s| s.id == id).map(|s| s.rect)
    }

    pub fn tool(&self) -> Tool {
        self.config.tool
    }

    #[cfg(test)]
    pub fn set_tool(&mut self, tool: Tool) {
        self.config.tool = tool;
    }

    pub fn toggle_tool(&mut self) -> Tool {
        let next = match self.config.tool {
            Tool::Edit => Tool::Draw,
            Tool::Draw => Tool::Edit,
        };
        self.config.tool = next;
        next
    }

    /// Drop every rectangle and any gesture in progress.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.session = None;
    }
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}
