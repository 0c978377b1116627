/// Badge pipeline module
///
/// This module handles:
/// - Generating short volunteer codes
/// - Rendering codes into styled, scannable badge images
/// - Reading codes back out of badge photos and screenshots

pub mod code;
pub mod decode;
pub mod synthesize;
