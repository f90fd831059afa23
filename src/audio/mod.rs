pub mod analysis;
pub mod decode;
pub mod extractor;
pub mod features;
pub mod processor;
pub mod spectral;
