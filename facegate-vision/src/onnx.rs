use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::{Embedding, EncodeError, FaceEncoder};

/// Detector input is a fixed square canvas; images are letterboxed into it.
const DETECT_SIZE: u32 = 640;
/// Recognizer input size (SFace-style models take 112x112 crops).
const RECOG_SIZE: u32 = 112;

/// One detected face in original-image pixel coordinates.
#[derive(Debug, Clone)]
struct DetectedFace {
    bbox: [f32; 4], // x, y, w, h
    score: f32,
}

/// ONNX-backed face encoder: detector + recognizer session pair.
///
/// The detector model is expected to emit post-processed detections as rows
/// of 15 floats (x, y, w, h, 5 landmark pairs, score) in canvas pixel
/// coordinates. Sessions need `&mut` to run, so each sits behind a mutex;
/// encoding is otherwise stateless.
pub struct OnnxEncoder {
    detector: Mutex<Session>,
    recognizer: Mutex<Session>,
    score_threshold: f32,
}

impl OnnxEncoder {
    pub fn load(detector: &Path, recognizer: &Path, score_threshold: f32) -> Result<Self> {
        Ok(Self {
            detector: Mutex::new(crate::model::session_from_file(detector)?),
            recognizer: Mutex::new(crate::model::session_from_file(recognizer)?),
            score_threshold,
        })
    }

    fn detect(&self, img: &DynamicImage) -> Result<Vec<DetectedFace>> {
        let (orig_width, orig_height) = img.dimensions();

        // Letterbox into the square canvas to avoid distortion.
        let max_dim = orig_width.max(orig_height);
        let scale = DETECT_SIZE as f32 / max_dim as f32;
        let new_width = (orig_width as f32 * scale) as u32;
        let new_height = (orig_height as f32 * scale) as u32;

        let resized =
            img.resize_exact(new_width, new_height, image::imageops::FilterType::Triangle);
        let mut canvas = DynamicImage::new_rgb8(DETECT_SIZE, DETECT_SIZE);
        let offset_x = (DETECT_SIZE - new_width) / 2;
        let offset_y = (DETECT_SIZE - new_height) / 2;
        image::imageops::overlay(&mut canvas, &resized, offset_x as i64, offset_y as i64);

        let input = bgr_chw_tensor(&canvas, DETECT_SIZE)?;
        let input_tensor = Value::from_array(input)?;

        let mut session = self
            .detector
            .lock()
            .map_err(|_| anyhow::anyhow!("detector session poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

        // Accept [N, 15] or [1, N, 15].
        if shape.len() < 2 {
            anyhow::bail!("unexpected detector output rank {}", shape.len());
        }
        let cols = shape[shape.len() - 1] as usize;
        if cols != 15 {
            anyhow::bail!("unexpected detector output width {cols}, expected 15");
        }

        let mut faces = Vec::new();
        for row in data.chunks_exact(cols) {
            let score = row[14];
            if score < self.score_threshold {
                continue;
            }
            // Map canvas pixels back through the letterbox transform.
            let x = (row[0] - offset_x as f32) / scale;
            let y = (row[1] - offset_y as f32) / scale;
            let w = row[2] / scale;
            let h = row[3] / scale;
            faces.push(DetectedFace {
                bbox: [x, y, w, h],
                score,
            });
        }
        Ok(faces)
    }

    fn embed(&self, face: &DynamicImage) -> Result<Vec<f32>> {
        let resized =
            face.resize_exact(RECOG_SIZE, RECOG_SIZE, image::imageops::FilterType::Triangle);
        let input = bgr_chw_tensor(&resized, RECOG_SIZE)?;
        let input_tensor = Value::from_array(input)?;

        let mut session = self
            .recognizer
            .lock()
            .map_err(|_| anyhow::anyhow!("recognizer session poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

        // Expecting [1, D].
        let dim = if shape.len() == 2 {
            shape[1] as usize
        } else {
            data.len()
        };
        Ok(data[0..dim].to_vec())
    }
}

impl FaceEncoder for OnnxEncoder {
    fn encode(&self, image: &[u8]) -> Result<Embedding, EncodeError> {
        let img = image::load_from_memory(image).map_err(|e| EncodeError::Decode(e.to_string()))?;

        let faces = self
            .detect(&img)
            .map_err(|e| EncodeError::Inference(e.to_string()))?;
        let face = match faces.len() {
            0 => return Err(EncodeError::NoFace),
            1 => &faces[0],
            n => return Err(EncodeError::MultipleFaces(n)),
        };
        log::debug!("face detected with score {:.3}", face.score);

        let crop = crop_face(&img, &face.bbox);
        let raw = self
            .embed(&crop)
            .map_err(|e| EncodeError::Inference(e.to_string()))?;
        Ok(Embedding::from_raw(raw))
    }
}

/// Crop the detection box with a small margin, clamped to the image bounds.
fn crop_face(img: &DynamicImage, bbox: &[f32; 4]) -> DynamicImage {
    let (img_w, img_h) = img.dimensions();
    let margin_x = bbox[2] * 0.1;
    let margin_y = bbox[3] * 0.1;

    let x0 = (bbox[0] - margin_x).max(0.0) as u32;
    let y0 = (bbox[1] - margin_y).max(0.0) as u32;
    let x1 = ((bbox[0] + bbox[2] + margin_x) as u32).min(img_w);
    let y1 = ((bbox[1] + bbox[3] + margin_y) as u32).min(img_h);

    let w = x1.saturating_sub(x0).max(1);
    let h = y1.saturating_sub(y0).max(1);
    img.crop_imm(x0, y0, w, h)
}

/// Convert an image to a [1, 3, size, size] BGR CHW tensor with values in
/// [0, 255], the input layout both models expect.
fn bgr_chw_tensor(img: &DynamicImage, size: u32) -> Result<Array4<f32>> {
    let rgb = img.to_rgb8();
    let pixel_count = (size * size) as usize;
    let mut input_data = vec![0.0f32; 3 * pixel_count];

    let (b_channel, rest) = input_data.split_at_mut(pixel_count);
    let (g_channel, r_channel) = rest.split_at_mut(pixel_count);

    let pixels = rgb.as_raw();
    for i in 0..pixel_count {
        let idx = i * 3;
        r_channel[i] = pixels[idx] as f32;
        g_channel[i] = pixels[idx + 1] as f32;
        b_channel[i] = pixels[idx + 2] as f32;
    }

    Ok(Array4::from_shape_vec(
        (1, 3, size as usize, size as usize),
        input_data,
    )?)
}
