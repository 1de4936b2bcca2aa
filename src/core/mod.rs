pub mod audio;
pub mod classifier;
pub mod detector;
pub mod dsp;
pub mod engine;
pub mod features;
pub mod filter;
pub mod segmenter;
pub mod separator;
pub mod verdict;
