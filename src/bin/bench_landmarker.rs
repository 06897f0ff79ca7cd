use anyhow::{Context, Result};
use std::time::Instant;
use trace_ghost::config::Config;
use trace_ghost::pose::{BlazePoseLandmarker, Frame, PoseModel};

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image> [iterations] [config.toml]", args[0]);
        std::process::exit(1);
    }
    let iterations: u32 = match args.get(2) {
        Some(n) => n.parse().context("iterations must be a number")?,
        None => 100,
    };
    let config = Config::load_or_default(args.get(3).map(String::as_str).unwrap_or("config.toml"));

    let image = image::open(&args[1])
        .with_context(|| format!("failed to open {}", args[1]))?
        .to_rgb8();
    let frame = Frame::new(image);
    let mut landmarker = BlazePoseLandmarker::new(&config.model)?;

    // ウォームアップ
    let found = landmarker.infer(&frame)?.is_some();

    let start = Instant::now();
    for _ in 0..iterations.max(1) {
        let _ = landmarker.infer(&frame)?;
    }
    let elapsed = start.elapsed();

    let avg_ms = elapsed.as_secs_f64() * 1000.0 / iterations.max(1) as f64;
    let max_rate = 1000.0 / avg_ms;

    println!(
        "Landmarker {}x{}: {:.2}ms/frame = {:.1} detections/s (person found: {})",
        frame.width(),
        frame.height(),
        avg_ms,
        max_rate,
        found
    );
    // 2 ストリームで分け合うので実効レートは半分
    println!("Max detection rate per stream: {:.1} Hz", max_rate / 2.0);

    Ok(())
}
