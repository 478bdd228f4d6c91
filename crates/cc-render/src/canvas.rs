use cc_core::face::{FaceDetection, Point};
use cc_core::frame::FrameBuffer;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};

const BOX_COLOR: Color = Color::Cyan;
const LANDMARK_COLOR: Color = Color::LightGreen;
const LABEL_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Cyan);

/// Which overlay layers to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayOptions {
    pub boxes: bool,
    pub landmarks: bool,
}

/// Maps display-surface pixels onto the cells of a canvas area.
///
/// The surface is stretched over the whole area, as the video is.
///
/// # Example
/// ```
/// use cc_render::canvas::CellMapper;
/// use cc_core::face::Point;
/// use ratatui::layout::Rect;
/// let map = CellMapper::new(Rect::new(0, 0, 64, 18), (640, 360));
/// assert_eq!(map.cell(Point::new(320.0, 180.0)), Some((32, 9)));
/// assert_eq!(map.cell(Point::new(700.0, 10.0)), None);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CellMapper {
    area: Rect,
    surface: (u32, u32),
}

impl CellMapper {
    #[must_use]
    pub fn new(area: Rect, surface: (u32, u32)) -> Self {
        Self { area, surface }
    }

    /// Cell covering `p`, `None` if it falls outside the area.
    #[must_use]
    pub fn cell(&self, p: Point) -> Option<(u16, u16)> {
        let (fx, fy) = self.fraction(p)?;
        if !(0.0..1.0).contains(&fx) || !(0.0..1.0).contains(&fy) {
            return None;
        }
        Some(self.to_cell(fx, fy))
    }

    /// Like [`CellMapper::cell`] but pinned to the area border.
    #[must_use]
    pub fn cell_clamped(&self, p: Point) -> Option<(u16, u16)> {
        let (fx, fy) = self.fraction(p)?;
        let max = 1.0 - f32::EPSILON;
        Some(self.to_cell(fx.clamp(0.0, max), fy.clamp(0.0, max)))
    }

    fn fraction(&self, p: Point) -> Option<(f32, f32)> {
        if self.surface.0 == 0 || self.surface.1 == 0 || self.area.is_empty() {
            return None;
        }
        if !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        Some((p.x / self.surface.0 as f32, p.y / self.surface.1 as f32))
    }

    fn to_cell(&self, fx: f32, fy: f32) -> (u16, u16) {
        let cx = (fx * f32::from(self.area.width)) as u16;
        let cy = (fy * f32::from(self.area.height)) as u16;
        (
            self.area.x + cx.min(self.area.width - 1),
            self.area.y + cy.min(self.area.height - 1),
        )
    }
}

/// Écrit la frame en demi-blocs (▄) directement dans le buffer.
///
/// Each cell covers two vertical pixels: the top one goes to the
/// background, the bottom one to the foreground. Frames without pixel
/// data are skipped.
pub fn render_video(buf: &mut Buffer, area: Rect, frame: &FrameBuffer) {
    if !frame.is_ready() || area.is_empty() {
        return;
    }
    let pixel_w = u32::from(area.width);
    let pixel_h = u32::from(area.height) * 2;
    let max_x = frame.width - 1;
    let max_y = frame.height - 1;

    for cy in 0..area.height {
        let py_top = (u32::from(cy) * 2 * frame.height / pixel_h).min(max_y);
        let py_bot = ((u32::from(cy) * 2 + 1) * frame.height / pixel_h).min(max_y);
        for cx in 0..area.width {
            let px = (u32::from(cx) * frame.width / pixel_w).min(max_x);
            let (tr, tg, tb, _) = frame.pixel(px, py_top);
            let (br, bg, bb, _) = frame.pixel(px, py_bot);
            if let Some(cell) = buf.cell_mut((area.x + cx, area.y + cy)) {
                cell.set_char('▄')
                    .set_fg(Color::Rgb(br, bg, bb))
                    .set_bg(Color::Rgb(tr, tg, tb));
            }
        }
    }
}

/// Draw detection boxes, landmarks and labels over the video.
///
/// `surface` is the size of the coordinate space the faces are in.
pub fn draw_overlay(
    buf: &mut Buffer,
    area: Rect,
    faces: &[FaceDetection],
    surface: (u32, u32),
    options: OverlayOptions,
) {
    let map = CellMapper::new(area, surface);
    for face in faces {
        if options.landmarks {
            for p in &face.landmarks {
                if let Some(pos) = map.cell(*p) {
                    put(buf, pos, '•', LANDMARK_COLOR);
                }
            }
        }
        if options.boxes {
            draw_box(buf, area, &map, face);
        }
    }
}

fn draw_box(buf: &mut Buffer, area: Rect, map: &CellMapper, face: &FaceDetection) {
    let b = &face.bbox;
    let (Some((x0, y0)), Some((x1, y1))) = (
        map.cell_clamped(Point::new(b.x, b.y)),
        map.cell_clamped(Point::new(b.x + b.width, b.y + b.height)),
    ) else {
        return;
    };

    for x in x0..=x1 {
        put(buf, (x, y0), '─', BOX_COLOR);
        put(buf, (x, y1), '─', BOX_COLOR);
    }
    for y in y0..=y1 {
        put(buf, (x0, y), '│', BOX_COLOR);
        put(buf, (x1, y), '│', BOX_COLOR);
    }
    put(buf, (x0, y0), '┌', BOX_COLOR);
    put(buf, (x1, y0), '┐', BOX_COLOR);
    put(buf, (x0, y1), '└', BOX_COLOR);
    put(buf, (x1, y1), '┘', BOX_COLOR);

    let room = usize::from(area.right().saturating_sub(x0));
    // Âge/genre au-dessus de la boîte, expression en dessous
    if let Some(caption) = face.caption() {
        let y = if y0 > area.y { y0 - 1 } else { y0 };
        buf.set_stringn(x0, y, format!(" {caption} "), room, LABEL_STYLE);
    }
    if let Some((expr, conf)) = face.expressions.dominant() {
        let y = if y1 + 1 < area.bottom() { y1 + 1 } else { y1 };
        buf.set_stringn(x0, y, format!(" {expr} ({conf:.2}) "), room, LABEL_STYLE);
    }
}

fn put(buf: &mut Buffer, pos: (u16, u16), ch: char, color: Color) {
    if let Some(cell) = buf.cell_mut(pos) {
        cell.set_char(ch).set_fg(color);
    }
}
