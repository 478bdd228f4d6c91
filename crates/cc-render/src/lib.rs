/// Terminal rendering for camcoach.
///
/// Half-block video canvas with detection overlay, coaching panel,
/// spectral history chart and FPS tracking.
pub mod canvas;
pub mod fps;
pub mod ui;
