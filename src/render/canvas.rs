use crate::pose::{Frame, Pose};
use crate::render::skeleton::{visible_joints, visible_segments, SkeletonStyle, JOINT_FILL_COLOR};

/// 0x00RRGGBB のピクセルバッファ
#[derive(Debug, Clone)]
pub struct Canvas {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

/// dst と src を alpha (0.0〜1.0) で合成
pub fn blend(dst: u32, src: u32, alpha: f32) -> u32 {
    let alpha = alpha.clamp(0.0, 1.0);
    let mix = |shift: u32| {
        let d = ((dst >> shift) & 0xFF) as f32;
        let s = ((src >> shift) & 0xFF) as f32;
        ((s * alpha + d * (1.0 - alpha)).round() as u32) << shift
    };
    mix(16) | mix(8) | mix(0)
}

/// Liang–Barsky で線分を矩形 `(xmin, ymin, xmax, ymax)` に切り詰める。
/// 矩形と交わらなければ None
pub fn clip_segment(
    from: (f32, f32),
    to: (f32, f32),
    (xmin, ymin, xmax, ymax): (f32, f32, f32, f32),
) -> Option<((f32, f32), (f32, f32))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    if ![from.0, from.1, dx, dy].iter().all(|v| v.is_finite()) {
        return None;
    }
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    for (p, q) in [
        (-dx, from.0 - xmin),
        (dx, xmax - from.0),
        (-dy, from.1 - ymin),
        (dy, ymax - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        (from.0 + t0 * dx, from.1 + t0 * dy),
        (from.0 + t1 * dx, from.1 + t1 * dy),
    ))
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: vec![0u32; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buffer[y * self.width + x])
    }

    pub fn clear(&mut self, color: u32) {
        self.buffer.fill(color);
    }

    /// フレームを左上からコピー。はみ出す部分は切り捨て
    pub fn draw_frame(&mut self, frame: &Frame) {
        let image = frame.image();
        let w = self.width.min(frame.width() as usize);
        let h = self.height.min(frame.height() as usize);
        for y in 0..h {
            for x in 0..w {
                let [r, g, b] = image.get_pixel(x as u32, y as u32).0;
                self.buffer[y * self.width + x] = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
            }
        }
    }

    /// 骨格を描画。opacity < 1.0 なら背景と合成
    pub fn draw_skeleton(&mut self, pose: &Pose, style: &SkeletonStyle, opacity: f32) {
        for (start, end, color) in visible_segments(pose, style) {
            self.draw_thick_line((start.x, start.y), (end.x, end.y), style.line_width, color, opacity);
        }
        for kp in visible_joints(pose, style) {
            let (cx, cy) = (kp.x.round() as i32, kp.y.round() as i32);
            self.draw_circle(cx, cy, style.point_radius, style.color, opacity);
            self.draw_circle(cx, cy, (style.point_radius - 2).max(1), JOINT_FILL_COLOR, opacity);
        }
    }

    /// 塗りつぶし矩形
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32, opacity: f32) {
        for py in y..y + h {
            for px in x..x + w {
                self.blend_pixel(px, py, color, opacity);
            }
        }
    }

    /// 左右反転 (鏡像表示)
    pub fn flip_horizontal(&mut self) {
        for row in self.buffer.chunks_mut(self.width.max(1)) {
            row.reverse();
        }
    }

    /// Bresenhamのアルゴリズムで線を描画。太さは線に沿って円を置いて出す
    ///
    /// 先にキャンバス (+ 線の半径) に切り詰めるので、画面外に大きくはみ出した
    /// 線でも歩く距離は画面の大きさで抑えられる。
    fn draw_thick_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        width: i32,
        color: u32,
        opacity: f32,
    ) {
        let radius = (width / 2).max(0);
        let bounds = (
            -radius as f32,
            -radius as f32,
            (self.width as i32 - 1 + radius) as f32,
            (self.height as i32 - 1 + radius) as f32,
        );
        let Some(((x0, y0), (x1, y1))) = clip_segment(from, to, bounds) else {
            return;
        };
        let (x0, y0) = (x0.round() as i32, y0.round() as i32);
        let (x1, y1) = (x1.round() as i32, y1.round() as i32);

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;
        // 半透明で重ね塗りすると濃くなるので、1 本の線は 1 回だけ塗る
        let mut covered = std::collections::HashSet::new();

        loop {
            for oy in -radius..=radius {
                for ox in -radius..=radius {
                    if ox * ox + oy * oy <= radius * radius && covered.insert((x + ox, y + oy)) {
                        self.blend_pixel(x + ox, y + oy, color, opacity);
                    }
                }
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 円を描画（塗りつぶし）
    fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32, opacity: f32) {
        if cx.saturating_add(radius) < 0
            || cy.saturating_add(radius) < 0
            || cx.saturating_sub(radius) >= self.width as i32
            || cy.saturating_sub(radius) >= self.height as i32
        {
            return;
        }
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.blend_pixel(cx + dx, cy + dy, color, opacity);
                }
            }
        }
    }

    /// ピクセルを合成（境界チェック付き）
    fn blend_pixel(&mut self, x: i32, y: i32, color: u32, opacity: f32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            let i = y as usize * self.width + x as usize;
            self.buffer[i] = if opacity >= 1.0 {
                color
            } else {
                blend(self.buffer[i], color, opacity)
            };
        }
    }
}
