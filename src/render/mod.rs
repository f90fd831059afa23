pub mod canvas;
pub mod sequencer;
pub mod theme;
pub mod visualizer;
