use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::ghost::GhostSettings;
use crate::pose::Frame;
use crate::render::canvas::Canvas;
use crate::render::skeleton::{parse_hex_color, SkeletonStyle};
use crate::session::RenderFrame;

const SCORE_BAR_HEIGHT: i32 = 8;
const BANNER_HEIGHT: i32 = 48;
const BANNER_COLOR: u32 = 0x10B981;
const BAR_BACKGROUND: u32 = 0x202020;

/// スコアに応じたバーの色 (赤 → 黄 → 緑)
pub fn score_color(score: u8) -> u32 {
    match score {
        90..=u8::MAX => 0x10B981,
        60..=89 => 0xF59E0B,
        _ => 0xEF4444,
    }
}

/// minifbを使用したレンダラー
pub struct MinifbRenderer {
    window: Window,
    canvas: Canvas,
    title: String,
}

impl MinifbRenderer {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize, refresh_hz: u32) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;
        window.set_target_fps(refresh_hz.max(1) as usize);

        Ok(Self {
            window,
            canvas: Canvas::new(width, height),
            title: title.to_string(),
        })
    }

    /// ウィンドウが開いているか
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// 前回の update 以降に押されたキー
    pub fn pressed_keys(&self) -> Vec<Key> {
        self.window.get_keys_pressed(KeyRepeat::No)
    }

    /// カメラ画像・ユーザー骨格・ゴースト・スコアを描いて表示する。
    /// 姿勢はカメラ座標のまま描き、最後に全体を左右反転する。
    pub fn draw(&mut self, camera: Option<&Frame>, frame: &RenderFrame, ghost: &GhostSettings) -> Result<()> {
        self.canvas.clear(0);
        if let Some(camera) = camera {
            self.canvas.draw_frame(camera);
        }

        if let Some(user) = &frame.user {
            self.canvas.draw_skeleton(user, &SkeletonStyle::user(), 1.0);
        }
        if let Some(fitted) = &frame.ghost {
            let color = parse_hex_color(&ghost.color).unwrap_or(BANNER_COLOR);
            self.canvas
                .draw_skeleton(fitted, &SkeletonStyle::ghost(color), ghost.opacity);
        }
        self.canvas.flip_horizontal();

        self.draw_score_bar(frame.result.score);
        if frame.celebrating {
            let width = self.canvas.width() as i32;
            let top = self.canvas.height() as i32 / 3;
            self.canvas
                .fill_rect(0, top, width, BANNER_HEIGHT, BANNER_COLOR, 0.7);
        }

        let title = if frame.celebrating {
            format!("{} - {}% - Great!", self.title, frame.result.score)
        } else {
            format!("{} - {}%", self.title, frame.result.score)
        };
        self.window.set_title(&title);
        self.window
            .update_with_buffer(self.canvas.buffer(), self.canvas.width(), self.canvas.height())?;
        Ok(())
    }

    fn draw_score_bar(&mut self, score: u8) {
        let width = self.canvas.width() as i32;
        let y = self.canvas.height() as i32 - SCORE_BAR_HEIGHT;
        self.canvas
            .fill_rect(0, y, width, SCORE_BAR_HEIGHT, BAR_BACKGROUND, 1.0);
        let filled = width * score as i32 / 100;
        self.canvas
            .fill_rect(0, y, filled, SCORE_BAR_HEIGHT, score_color(score), 1.0);
    }
}
