pub mod embedding;
pub mod model;
pub mod onnx;

pub use embedding::Embedding;
pub use onnx::OnnxEncoder;

/// Outcomes of turning raw image bytes into an embedding.
///
/// Zero faces and more than one face are distinct failures: the kiosk only
/// accepts single-face captures for registration and approval.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("no face detected in the image")]
    NoFace,
    #[error("multiple faces detected ({0})")]
    MultipleFaces(usize),
    #[error("face encoder inference failed: {0}")]
    Inference(String),
}

/// A face encoder: image bytes in, fixed-length embedding out.
///
/// Implementations must be side-effect free from the caller's point of view.
/// The concrete model is a swappable capability; the engine only depends on
/// this trait.
pub trait FaceEncoder: Send + Sync {
    fn encode(&self, image: &[u8]) -> Result<Embedding, EncodeError>;
}
