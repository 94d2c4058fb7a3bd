//! Image decoding and tensor preparation for the feature network

use crate::config::{PixelPreprocessing, TensorLayout};
use crate::error::{PredictError, PredictResult};
use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};

/// Side length the network expects
pub const INPUT_SIZE: u32 = 224;

/// Number of color channels fed to the network
pub const CHANNELS: usize = 3;

/// ImageNet per-channel means in BGR order, 0..255 scale
const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

const TORCH_MEAN_RGB: [f32; 3] = [0.485, 0.456, 0.406];
const TORCH_STD_RGB: [f32; 3] = [0.229, 0.224, 0.225];

/// Network-ready input tensor for a single image
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    data: Vec<f32>,
    layout: TensorLayout,
}

impl PreparedImage {
    /// Tensor shape including the batch dimension
    pub fn shape(&self) -> [i64; 4] {
        let side = i64::from(INPUT_SIZE);
        match self.layout {
            TensorLayout::Nhwc => [1, side, side, CHANNELS as i64],
            TensorLayout::Nchw => [1, CHANNELS as i64, side, side],
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }
}

/// Decodes uploads and converts them to the network's input tensor
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor {
    layout: TensorLayout,
    preprocessing: PixelPreprocessing,
}

impl ImagePreprocessor {
    pub fn new(layout: TensorLayout, preprocessing: PixelPreprocessing) -> Self {
        Self {
            layout,
            preprocessing,
        }
    }

    /// Decode, resize and convert raw image bytes
    pub fn prepare(&self, bytes: &[u8]) -> PredictResult<PreparedImage> {
        let rgb = decode_rgb(bytes)?;
        Ok(self.prepare_rgb(&rgb))
    }

    /// Resize an already decoded RGB image and convert it to a tensor
    pub fn prepare_rgb(&self, rgb: &RgbImage) -> PreparedImage {
        let resized = if rgb.dimensions() == (INPUT_SIZE, INPUT_SIZE) {
            rgb.clone()
        } else {
            image::imageops::resize(rgb, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom)
        };

        let pixels = (INPUT_SIZE * INPUT_SIZE) as usize;
        let mut data = vec![0.0f32; pixels * CHANNELS];

        for (i, pixel) in resized.pixels().enumerate() {
            let values = self.pixel_values(pixel.0);
            for (c, value) in values.into_iter().enumerate() {
                let offset = match self.layout {
                    TensorLayout::Nhwc => i * CHANNELS + c,
                    TensorLayout::Nchw => c * pixels + i,
                };
                data[offset] = value;
            }
        }

        PreparedImage {
            data,
            layout: self.layout,
        }
    }

    fn pixel_values(&self, [r, g, b]: [u8; 3]) -> [f32; 3] {
        match self.preprocessing {
            PixelPreprocessing::Caffe => [
                f32::from(b) - CAFFE_MEAN_BGR[0],
                f32::from(g) - CAFFE_MEAN_BGR[1],
                f32::from(r) - CAFFE_MEAN_BGR[2],
            ],
            PixelPreprocessing::Torch => {
                let rgb = [r, g, b];
                std::array::from_fn(|c| {
                    (f32::from(rgb[c]) / 255.0 - TORCH_MEAN_RGB[c]) / TORCH_STD_RGB[c]
                })
            }
        }
    }
}

/// Decode arbitrary image bytes into an RGB bitmap.
///
/// The container format is sniffed first so unknown data is reported as an
/// unsupported format instead of an ambiguous decode failure.
pub fn decode_rgb(bytes: &[u8]) -> PredictResult<RgbImage> {
    if bytes.is_empty() {
        return Err(PredictError::MissingImage);
    }

    let format = image::guess_format(bytes).map_err(|_| {
        PredictError::UnsupportedImageFormat("unrecognized file signature".to_string())
    })?;
    if !format.reading_enabled() {
        return Err(PredictError::UnsupportedImageFormat(format_name(format)));
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PredictError::MalformedImage(e.to_string()))?;
    Ok(decoded.to_rgb8())
}

fn format_name(format: ImageFormat) -> String {
    format
        .extensions_str()
        .first()
        .map(|ext| ext.to_uppercase())
        .unwrap_or_else(|| format!("{:?}", format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb};
    use std::io::Cursor;

    fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut buf, format)
            .unwrap();
        buf.into_inner()
    }

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn test_png_decoded_and_resized() {
        let bytes = encode(&solid(40, 30, [10, 20, 30]), ImageFormat::Png);
        let prepared = ImagePreprocessor::default().prepare(&bytes).unwrap();

        assert_eq!(prepared.shape(), [1, 224, 224, 3]);
        assert_eq!(prepared.data().len(), 224 * 224 * 3);
    }

    #[test]
    fn test_caffe_preprocessing_is_bgr_mean_subtracted() {
        let prepared = ImagePreprocessor::default().prepare_rgb(&solid(224, 224, [200, 100, 50]));
        let first = &prepared.data()[..3];

        assert!((first[0] - (50.0 - 103.939)).abs() < 1e-4);
        assert!((first[1] - (100.0 - 116.779)).abs() < 1e-4);
        assert!((first[2] - (200.0 - 123.68)).abs() < 1e-4);
    }

    #[test]
    fn test_nchw_layout_is_channel_planar() {
        let preprocessor = ImagePreprocessor::new(TensorLayout::Nchw, PixelPreprocessing::Torch);
        let prepared = preprocessor.prepare_rgb(&solid(224, 224, [255, 0, 0]));
        let plane = 224 * 224;

        assert_eq!(prepared.shape(), [1, 3, 224, 224]);
        let red = (1.0 - 0.485) / 0.229;
        assert!((prepared.data()[0] - red).abs() < 1e-4);
        assert!((prepared.data()[plane - 1] - red).abs() < 1e-4);
        assert!((prepared.data()[plane] - (-0.456 / 0.224)).abs() < 1e-4);
    }

    #[test]
    fn test_same_bytes_same_tensor() {
        let mut img = solid(64, 48, [0, 0, 0]);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8]);
        }
        let bytes = encode(&img, ImageFormat::Png);
        let preprocessor = ImagePreprocessor::default();

        assert_eq!(
            preprocessor.prepare(&bytes).unwrap(),
            preprocessor.prepare(&bytes).unwrap()
        );
    }

    #[test]
    fn test_grayscale_and_alpha_converted_to_rgb() {
        let gray = DynamicImage::new_luma8(16, 16);
        let mut buf = Cursor::new(Vec::new());
        gray.write_to(&mut buf, ImageFormat::Png).unwrap();
        assert_eq!(decode_rgb(buf.get_ref()).unwrap().dimensions(), (16, 16));

        let rgba = DynamicImage::new_rgba8(8, 8);
        let mut buf = Cursor::new(Vec::new());
        rgba.write_to(&mut buf, ImageFormat::Png).unwrap();
        assert!(decode_rgb(buf.get_ref()).is_ok());
    }

    #[test]
    fn test_unknown_bytes_rejected_as_unsupported() {
        let err = decode_rgb(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PredictError::UnsupportedImageFormat(_)));
    }

    #[test]
    fn test_truncated_image_rejected_as_malformed() {
        let bytes = encode(&solid(32, 32, [1, 2, 3]), ImageFormat::Png);
        let err = decode_rgb(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, PredictError::MalformedImage(_)));
    }

    #[test]
    fn test_empty_upload_is_missing_image() {
        assert!(matches!(
            decode_rgb(&[]).unwrap_err(),
            PredictError::MissingImage
        ));
    }
}
