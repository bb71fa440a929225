//! A self-contained drop scene for running the pipeline end to end.
//!
//! Balls spawn at the top, bounce off a few rows of pegs on the way down and
//! land in one of two buckets. Pegs play the `default` collision sound, the
//! buckets play `A` and `B`. When the run time is up the fuller bucket wins.

use dropreel_core::{ClockState, FrameBuffer, PixelFormat, VideoConfig};
use dropreel_session::{Outcome, Scene, SceneStatus, SoundTrigger};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GRAVITY: f32 = 2400.0;
const SPAWN_CHANCE: f64 = 0.12;
const PEG_ROWS: u32 = 6;
const BALL_SIZE: u32 = 24;

const BACKGROUND: [u8; 3] = [18, 18, 32];
const PEG_COLOR: [u8; 3] = [90, 90, 120];
const BALL_COLOR: [u8; 3] = [250, 210, 60];
const SIDE_COLORS: [[u8; 3]; 2] = [[220, 60, 70], [60, 110, 230]];

#[derive(Debug, Clone)]
struct Ball {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    next_peg_row: u32,
}

pub struct DropScene {
    rng: StdRng,
    width: u32,
    height: u32,
    format: PixelFormat,
    run_duration_secs: f64,
    dt: f32,
    balls: Vec<Ball>,
    counts: [u32; 2],
}

impl DropScene {
    pub fn new(video: &VideoConfig, run_duration_secs: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            width: video.width,
            height: video.height,
            format: video.pixel_format,
            run_duration_secs,
            dt: 1.0 / video.fps.max(1) as f32,
            balls: Vec::new(),
            counts: [0, 0],
        }
    }

    pub fn counts(&self) -> [u32; 2] {
        self.counts
    }

    fn bucket_top(&self) -> f32 {
        self.height as f32 * 0.8
    }

    fn peg_row_y(&self, row: u32) -> f32 {
        self.bucket_top() * (row + 1) as f32 / (PEG_ROWS + 1) as f32
    }
}

impl Scene for DropScene {
    fn step(&mut self, clock: &ClockState, triggers: &SoundTrigger) -> SceneStatus {
        if clock.physics_seconds >= self.run_duration_secs {
            return SceneStatus::Settled(Outcome::from_counts(self.counts[0], self.counts[1]));
        }

        if self.rng.random_bool(SPAWN_CHANCE) {
            let x = self.rng.random_range(0.1f32..0.9) * self.width as f32;
            self.balls.push(Ball {
                x,
                y: 0.0,
                vx: 0.0,
                vy: 0.0,
                next_peg_row: 0,
            });
        }

        let dt = self.dt;
        let width = self.width as f32;
        let bucket_top = self.bucket_top();
        let mut landed = Vec::new();
        for i in 0..self.balls.len() {
            let peg_y = self.peg_row_y(self.balls[i].next_peg_row);
            let kick = self.rng.random_range(-260.0f32..260.0);
            let ball = &mut self.balls[i];
            ball.vy += GRAVITY * dt;
            ball.x = (ball.x + ball.vx * dt).clamp(0.0, width - 1.0);
            ball.y += ball.vy * dt;

            if ball.next_peg_row < PEG_ROWS && ball.y >= peg_y {
                ball.next_peg_row += 1;
                ball.vy *= 0.45;
                ball.vx = kick;
                triggers.fire("default");
            }
            if ball.y >= bucket_top {
                landed.push(i);
            }
        }

        for i in landed.into_iter().rev() {
            let ball = self.balls.swap_remove(i);
            let side = usize::from(ball.x >= width / 2.0);
            self.counts[side] += 1;
            triggers.fire(if side == 0 { "A" } else { "B" });
        }

        SceneStatus::Running
    }

    /// Empty board and buckets; the RNG carries on so the next attempt differs.
    fn reset(&mut self) {
        self.balls.clear();
        self.counts = [0, 0];
    }

    fn render(&mut self, _clock: &ClockState) -> FrameBuffer {
        let mut frame = FrameBuffer::new(self.width, self.height, self.format);
        frame.fill(BACKGROUND);

        let half = self.width / 2;
        let bucket_top = self.bucket_top() as u32;
        let bucket_height = self.height.saturating_sub(bucket_top);
        for (side, color) in SIDE_COLORS.iter().enumerate() {
            let x = side as u32 * half;
            frame.fill_rect(x, bucket_top, half, bucket_height, *color);
            // Fill level grows with the bucket's count.
            let level = (self.counts[side] * 8).min(bucket_height);
            frame.fill_rect(x + 8, self.height - level, half.saturating_sub(16), level, BALL_COLOR);
        }

        for row in 0..PEG_ROWS {
            let y = self.peg_row_y(row) as u32;
            let offset = if row % 2 == 0 { 0 } else { self.width / 16 };
            let mut x = offset;
            while x < self.width {
                frame.fill_rect(x, y, 10, 10, PEG_COLOR);
                x += self.width / 8;
            }
        }

        for ball in &self.balls {
            frame.fill_rect(
                (ball.x as u32).saturating_sub(BALL_SIZE / 2),
                ball.y as u32,
                BALL_SIZE,
                BALL_SIZE,
                BALL_COLOR,
            );
        }
        frame
    }
}
