pub mod audio_engine;
pub mod band;
pub mod channel_buffer;
pub mod compressor_band;
pub mod constants;
pub mod crossover;
pub mod fft_engine;
pub mod meter;
pub mod ring_buffer;
pub mod sample_buffer;
pub mod spectrum;
pub mod window_functions;
