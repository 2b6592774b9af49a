pub mod gemini;
#[cfg(test)]
pub mod testing;
pub mod traits;

pub use traits::ModelClient;
